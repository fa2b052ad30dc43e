// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Consumer handing samples to a bounded `crossbeam` channel.
//!
//! Bridges a push connection into an application thread: the OutPort's
//! publisher delivers into the channel, the application drains the
//! [`Receiver`].
//!
//! - channel full: `SendFull`
//! - receiver dropped: `ConnectionLost`

use super::InPortConsumer;
use crate::properties::Properties;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};

pub struct ChannelConsumer<T> {
    tx: Sender<Sample<T>>,
}

impl<T: PortData> ChannelConsumer<T> {
    /// Consumer backed by a channel of `capacity` samples.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Sample<T>>) {
        let (tx, rx) = channel::bounded(capacity);
        (Self { tx }, rx)
    }

    /// Consumer writing into an existing sender.
    pub fn from_sender(tx: Sender<Sample<T>>) -> Self {
        Self { tx }
    }
}

impl<T: PortData> InPortConsumer<T> for ChannelConsumer<T> {
    fn subscribe_interface(&self, _props: &Properties) -> bool {
        true
    }

    fn unsubscribe_interface(&self, _props: &Properties) {}

    fn put(&self, sample: &Sample<T>) -> PortStatus {
        match self.tx.try_send(sample.clone()) {
            Ok(()) => PortStatus::Ok,
            Err(TrySendError::Full(_)) => PortStatus::SendFull,
            Err(TrySendError::Disconnected(_)) => PortStatus::ConnectionLost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_then_disconnected() {
        let (consumer, rx) = ChannelConsumer::bounded(1);
        assert_eq!(consumer.put(&Sample::new(1u8)), PortStatus::Ok);
        assert_eq!(consumer.put(&Sample::new(2u8)), PortStatus::SendFull);
        assert_eq!(rx.recv().map(Sample::into_payload), Ok(1));
        drop(rx);
        assert_eq!(consumer.put(&Sample::new(3u8)), PortStatus::ConnectionLost);
    }
}

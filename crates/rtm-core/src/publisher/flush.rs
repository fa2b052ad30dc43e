// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronous publisher: `write` delivers on the caller's thread.

use super::Publisher;
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::InPortConsumer;
use crate::listener::{ConnectorDataListenerType as D, ConnectorInfo, ConnectorListeners, Notifier};
use crate::properties::Properties;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct PublisherFlush<T> {
    consumer: RwLock<Option<Arc<dyn InPortConsumer<T>>>>,
    notifier: RwLock<Notifier<T>>,
    retcode: Mutex<PortStatus>,
    active: AtomicBool,
}

impl<T: PortData> PublisherFlush<T> {
    pub fn new() -> Self {
        Self {
            consumer: RwLock::new(None),
            notifier: RwLock::new(Notifier::none()),
            retcode: Mutex::new(PortStatus::Ok),
            active: AtomicBool::new(false),
        }
    }
}

impl<T: PortData> Default for PublisherFlush<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PortData> Publisher<T> for PublisherFlush<T> {
    fn init(&self, _props: &Properties) -> Result<()> {
        log::trace!("[PublisherFlush::init]");
        Ok(())
    }

    fn set_consumer(&self, consumer: Arc<dyn InPortConsumer<T>>) {
        *self.consumer.write() = Some(consumer);
    }

    fn set_buffer(&self, _buffer: SharedBuffer<T>) {}

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) {
        *self.notifier.write() = Notifier::new(info, listeners);
    }

    fn write(&self, sample: &Sample<T>, _timeout: Option<Duration>) -> PortStatus {
        let Some(consumer) = self.consumer.read().clone() else {
            return PortStatus::PreconditionNotMet;
        };
        // Held across the put so concurrent writers deliver one at a time.
        let mut retcode = self.retcode.lock();
        if *retcode == PortStatus::ConnectionLost {
            log::debug!("[PublisherFlush::write] connection lost");
            return *retcode;
        }
        let notifier = self.notifier.read().clone();

        notifier.data(D::OnSend, sample);
        let ret = catch_unwind(AssertUnwindSafe(|| consumer.put(sample)))
            .unwrap_or(PortStatus::ConnectionLost);
        *retcode = ret;
        match ret {
            PortStatus::Ok => notifier.data(D::OnReceived, sample),
            PortStatus::SendFull => notifier.data(D::OnReceiverFull, sample),
            PortStatus::SendTimeout => notifier.data(D::OnReceiverTimeout, sample),
            _ => notifier.data(D::OnReceiverError, sample),
        }
        ret
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn activate(&self) -> PortStatus {
        self.active.store(true, Ordering::Release);
        PortStatus::Ok
    }

    fn deactivate(&self) -> PortStatus {
        self.active.store(false, Ordering::Release);
        PortStatus::Ok
    }

    fn finalize(&self) {
        self.active.store(false, Ordering::Release);
        *self.consumer.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ChannelConsumer;

    struct Unreachable;

    impl InPortConsumer<u32> for Unreachable {
        fn subscribe_interface(&self, _props: &Properties) -> bool {
            true
        }
        fn unsubscribe_interface(&self, _props: &Properties) {}
        fn put(&self, _sample: &Sample<u32>) -> PortStatus {
            panic!("transport failure")
        }
    }

    #[test]
    fn test_delivers_on_caller_thread() {
        let publisher = PublisherFlush::new();
        let (consumer, rx) = ChannelConsumer::bounded(4);
        publisher.set_consumer(Arc::new(consumer));
        assert_eq!(publisher.write(&Sample::new(3u32), None), PortStatus::Ok);
        assert_eq!(rx.try_recv().map(Sample::into_payload), Ok(3));
    }

    #[test]
    fn test_no_consumer() {
        let publisher: PublisherFlush<u32> = PublisherFlush::new();
        assert_eq!(
            publisher.write(&Sample::new(1), None),
            PortStatus::PreconditionNotMet
        );
    }

    #[test]
    fn test_panicking_transport_is_connection_lost() {
        let publisher = PublisherFlush::new();
        publisher.set_consumer(Arc::new(Unreachable));
        assert_eq!(publisher.write(&Sample::new(1), None), PortStatus::ConnectionLost);
        // cached: no further attempts
        assert_eq!(publisher.write(&Sample::new(2), None), PortStatus::ConnectionLost);
    }
}

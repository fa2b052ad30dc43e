// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InPort side of a pull connection: every `read` fetches one sample from
//! the peer through the `OutPortConsumer`.

use super::{Connector, ConnectorBase, ConnectorState, InPortConnector};
use crate::buffer::SharedBuffer;
use crate::interface::OutPortConsumer;
use crate::listener::{
    ConnectorDataListenerType as D, ConnectorInfo, ConnectorListenerType as C, ConnectorListeners,
};
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

pub struct InPortPullConnector<T: PortData> {
    base: ConnectorBase<T>,
    consumer: RwLock<Option<Arc<dyn OutPortConsumer<T>>>>,
}

impl<T: PortData> InPortPullConnector<T> {
    /// `consumer` must already be subscribed to its provider.
    pub fn new(
        info: ConnectorInfo,
        consumer: Arc<dyn OutPortConsumer<T>>,
        listeners: Arc<ConnectorListeners<T>>,
    ) -> Self {
        let connector = Self {
            base: ConnectorBase::new(Arc::new(info), listeners),
            consumer: RwLock::new(Some(consumer)),
        };
        connector.base.on_connect();
        connector
    }
}

impl<T: PortData> Connector<T> for InPortPullConnector<T> {
    fn info(&self) -> &Arc<ConnectorInfo> {
        self.base.info()
    }

    fn state(&self) -> ConnectorState {
        self.base.state()
    }

    fn buffer(&self) -> Option<SharedBuffer<T>> {
        None
    }

    fn disconnect(&self) -> PortStatus {
        if !self.base.begin_disconnect() {
            return PortStatus::PreconditionNotMet;
        }
        if let Some(consumer) = self.consumer.write().take() {
            consumer.unsubscribe_interface(&self.base.info().properties);
        }
        self.base.finish_disconnect();
        PortStatus::Ok
    }
}

impl<T: PortData> InPortConnector<T> for InPortPullConnector<T> {
    /// Pull one sample. The timeout is the provider's concern.
    fn read(&self, _timeout: Option<Duration>) -> std::result::Result<Sample<T>, PortStatus> {
        let Some(consumer) = self.consumer.read().clone() else {
            return Err(PortStatus::PreconditionNotMet);
        };
        let notifier = self.base.notifier();
        match consumer.get() {
            Ok(sample) => {
                notifier.data(D::OnReceived, &sample);
                Ok(sample)
            }
            Err(status) => {
                match status {
                    PortStatus::BufferEmpty => notifier.event(C::OnSenderEmpty),
                    PortStatus::BufferTimeout => notifier.event(C::OnSenderTimeout),
                    _ => notifier.event(C::OnSenderError),
                }
                log::trace!("[InPortPullConnector::read] {}", status.as_str());
                Err(status)
            }
        }
    }
}

impl<T: PortData> Drop for InPortPullConnector<T> {
    fn drop(&mut self) {
        if self.base.state() == ConnectorState::Connected {
            self.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::connector::testing::record_all;
    use crate::interface::{InProcOutPortConsumer, InProcOutPortProvider, OutPortProvider};
    use crate::properties::Properties;
    use crate::registry::Registry;

    #[test]
    fn test_pull_sequence_and_connection_lost() {
        let registry: Registry<u32> = Registry::with_defaults();
        let provider = InProcOutPortProvider::create(registry.endpoints());
        let buffer: SharedBuffer<u32> = Arc::new(Buffer::new(4));
        provider.set_buffer(Some(Arc::clone(&buffer)));
        let mut props = Properties::new();
        provider.publish_interface_profile(&mut props);
        let consumer = InProcOutPortConsumer::new(registry.endpoints());
        assert!(consumer.subscribe_interface(&props));

        let listeners = ConnectorListeners::shared();
        let log = record_all(&listeners);
        let connector = InPortPullConnector::new(
            ConnectorInfo::new("pull", "1").with_properties(props),
            Arc::new(consumer),
            listeners,
        );

        assert_eq!(connector.read(None).err(), Some(PortStatus::BufferEmpty));
        buffer.write(Sample::new(6), None);
        assert_eq!(connector.read(None).map(Sample::into_payload), Ok(6));
        drop(provider);
        assert_eq!(connector.read(None).err(), Some(PortStatus::ConnectionLost));
        assert_eq!(
            *log.lock(),
            vec!["ON_CONNECT", "ON_SENDER_EMPTY", "ON_RECEIVED", "ON_SENDER_ERROR"]
        );
        assert_eq!(connector.disconnect(), PortStatus::Ok);
        assert_eq!(connector.read(None).err(), Some(PortStatus::PreconditionNotMet));
    }
}

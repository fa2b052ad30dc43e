// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OutPort side of a push connection.

use super::{Connector, ConnectorBase, ConnectorState, OutPortConnector};
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::{DirectSink, InPortConsumer};
use crate::listener::{ConnectorDataListenerType as D, ConnectorInfo, ConnectorListeners};
use crate::publisher::Publisher;
use crate::registry::Registry;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

enum Route<T> {
    /// Buffer, publisher and transport consumer.
    Published {
        publisher: Arc<dyn Publisher<T>>,
        consumer: Arc<dyn InPortConsumer<T>>,
    },
    /// Same-process hand-off into the peer InPort.
    Direct(Weak<dyn DirectSink<T>>),
}

/// Pushes written samples through a publisher to an `InPortConsumer`, or
/// straight into a peer InPort in direct mode.
pub struct OutPortPushConnector<T: PortData> {
    base: ConnectorBase<T>,
    route: RwLock<Option<Route<T>>>,
}

impl<T: PortData> OutPortPushConnector<T> {
    /// Build a published connection.
    ///
    /// The publisher comes from `publisher_type` and the buffer from
    /// `buffer_type` unless `buffer` is supplied. `consumer` must already be
    /// subscribed to its provider.
    pub fn new(
        info: ConnectorInfo,
        consumer: Arc<dyn InPortConsumer<T>>,
        listeners: Arc<ConnectorListeners<T>>,
        registry: &Registry<T>,
        buffer: Option<SharedBuffer<T>>,
    ) -> Result<Self> {
        let info = Arc::new(info);
        let base = ConnectorBase::with_buffer(
            Arc::clone(&info),
            Arc::clone(&listeners),
            registry,
            buffer,
        )?;

        let publisher = registry.create_publisher(&info.properties)?;
        publisher.init(&info.properties)?;
        publisher.set_consumer(Arc::clone(&consumer));
        if let Some(buffer) = base.buffer() {
            publisher.set_buffer(buffer);
        }
        publisher.set_listener(Arc::clone(&info), listeners);

        let connector = Self {
            base,
            route: RwLock::new(Some(Route::Published {
                publisher,
                consumer,
            })),
        };
        connector.base.on_connect();
        Ok(connector)
    }

    /// Build a direct-mode connection writing into `sink`.
    pub fn direct(
        info: ConnectorInfo,
        sink: Weak<dyn DirectSink<T>>,
        listeners: Arc<ConnectorListeners<T>>,
    ) -> Self {
        let connector = Self {
            base: ConnectorBase::new(Arc::new(info), listeners),
            route: RwLock::new(Some(Route::Direct(sink))),
        };
        connector.base.on_connect();
        connector
    }

    pub fn is_direct(&self) -> bool {
        matches!(*self.route.read(), Some(Route::Direct(_)))
    }

    pub fn owns_buffer(&self) -> bool {
        self.base.owns_buffer()
    }

    pub fn listeners(&self) -> &Arc<ConnectorListeners<T>> {
        self.base.listeners()
    }
}

impl<T: PortData> Connector<T> for OutPortPushConnector<T> {
    fn info(&self) -> &Arc<ConnectorInfo> {
        self.base.info()
    }

    fn state(&self) -> ConnectorState {
        self.base.state()
    }

    fn buffer(&self) -> Option<SharedBuffer<T>> {
        self.base.buffer()
    }

    fn activate(&self) {
        if let Some(Route::Published { publisher, .. }) = &*self.route.read() {
            publisher.activate();
        }
    }

    fn deactivate(&self) {
        if let Some(Route::Published { publisher, .. }) = &*self.route.read() {
            publisher.deactivate();
        }
    }

    fn disconnect(&self) -> PortStatus {
        if !self.base.begin_disconnect() {
            return PortStatus::PreconditionNotMet;
        }
        if let Some(Route::Published {
            publisher,
            consumer,
        }) = self.route.write().take()
        {
            publisher.finalize();
            consumer.unsubscribe_interface(&self.base.info().properties);
        }
        self.base.finish_disconnect();
        PortStatus::Ok
    }
}

impl<T: PortData> OutPortConnector<T> for OutPortPushConnector<T> {
    fn write(&self, sample: &Sample<T>) -> PortStatus {
        if !self.base.is_connected() {
            return PortStatus::PreconditionNotMet;
        }
        let route = self.route.read();
        match &*route {
            Some(Route::Published { publisher, .. }) => publisher.write(sample, None),
            Some(Route::Direct(sink)) => {
                let Some(sink) = sink.upgrade() else {
                    log::debug!("[OutPortPushConnector::write] direct peer gone");
                    return PortStatus::ConnectionLost;
                };
                let notifier = self.base.notifier();
                notifier.data(D::OnBufferWrite, sample);
                notifier.data(D::OnSend, sample);
                sink.write_direct(self.base.info(), sample);
                PortStatus::Ok
            }
            None => PortStatus::PreconditionNotMet,
        }
    }
}

impl<T: PortData> Drop for OutPortPushConnector<T> {
    fn drop(&mut self) {
        if self.base.state() == ConnectorState::Connected {
            self.disconnect();
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InPort side of a push connection.

use super::{Connector, ConnectorBase, ConnectorState, InPortConnector};
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::InPortProvider;
use crate::listener::{
    ConnectorDataListenerType as D, ConnectorInfo, ConnectorListenerType as C, ConnectorListeners,
};
use crate::registry::Registry;
use crate::sample::{PortData, Sample};
use crate::status::{BufferStatus, PortStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Buffers samples delivered to its `InPortProvider` until the port reads
/// them.
pub struct InPortPushConnector<T: PortData> {
    base: ConnectorBase<T>,
    provider: RwLock<Option<Arc<dyn InPortProvider<T>>>>,
}

impl<T: PortData> InPortPushConnector<T> {
    /// Wire `provider` to a buffer (built from `buffer_type` unless
    /// supplied) and to the port listeners.
    pub fn new(
        info: ConnectorInfo,
        provider: Arc<dyn InPortProvider<T>>,
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
        provider.set_buffer(base.buffer());
        provider.set_listener(info, listeners);

        let connector = Self {
            base,
            provider: RwLock::new(Some(provider)),
        };
        connector.base.on_connect();
        Ok(connector)
    }

    pub fn owns_buffer(&self) -> bool {
        self.base.owns_buffer()
    }
}

impl<T: PortData> Connector<T> for InPortPushConnector<T> {
    fn info(&self) -> &Arc<ConnectorInfo> {
        self.base.info()
    }

    fn state(&self) -> ConnectorState {
        self.base.state()
    }

    fn buffer(&self) -> Option<SharedBuffer<T>> {
        self.base.buffer()
    }

    fn disconnect(&self) -> PortStatus {
        if !self.base.begin_disconnect() {
            return PortStatus::PreconditionNotMet;
        }
        if let Some(provider) = self.provider.write().take() {
            provider.set_buffer(None);
        }
        self.base.finish_disconnect();
        PortStatus::Ok
    }
}

impl<T: PortData> InPortConnector<T> for InPortPushConnector<T> {
    fn read(&self, timeout: Option<Duration>) -> std::result::Result<Sample<T>, PortStatus> {
        let Some(buffer) = self.base.buffer() else {
            return Err(PortStatus::PreconditionNotMet);
        };
        let notifier = self.base.notifier();
        match buffer.read(timeout) {
            Ok(sample) => {
                notifier.data(D::OnBufferRead, &sample);
                Ok(sample)
            }
            Err(BufferStatus::Empty) => {
                notifier.event(C::OnBufferEmpty);
                Err(PortStatus::BufferEmpty)
            }
            Err(BufferStatus::Timeout) => {
                notifier.event(C::OnBufferReadTimeout);
                Err(PortStatus::BufferTimeout)
            }
            Err(BufferStatus::PreconditionNotMet) => Err(PortStatus::PreconditionNotMet),
            Err(_) => Err(PortStatus::Error),
        }
    }
}

impl<T: PortData> Drop for InPortPushConnector<T> {
    fn drop(&mut self) {
        if self.base.state() == ConnectorState::Connected {
            self.disconnect();
        }
    }
}

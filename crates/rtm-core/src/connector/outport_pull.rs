// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OutPort side of a pull connection: written samples wait in the buffer
//! until the peer fetches them through the `OutPortProvider`.

use super::{Connector, ConnectorBase, ConnectorState, OutPortConnector};
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::OutPortProvider;
use crate::listener::{ConnectorInfo, ConnectorListeners};
use crate::publisher::policy::{convert_write, write_buffer};
use crate::registry::Registry;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::RwLock;
use std::sync::Arc;

pub struct OutPortPullConnector<T: PortData> {
    base: ConnectorBase<T>,
    provider: RwLock<Option<Arc<dyn OutPortProvider<T>>>>,
}

impl<T: PortData> OutPortPullConnector<T> {
    pub fn new(
        info: ConnectorInfo,
        provider: Arc<dyn OutPortProvider<T>>,
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
}

impl<T: PortData> Connector<T> for OutPortPullConnector<T> {
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

impl<T: PortData> OutPortConnector<T> for OutPortPullConnector<T> {
    fn write(&self, sample: &Sample<T>) -> PortStatus {
        let Some(buffer) = self.base.buffer() else {
            return PortStatus::PreconditionNotMet;
        };
        let notifier = self.base.notifier();
        let status = write_buffer(&buffer, sample, None, &notifier);
        convert_write(status, sample, &notifier)
    }
}

impl<T: PortData> Drop for OutPortPullConnector<T> {
    fn drop(&mut self) {
        if self.base.state() == ConnectorState::Connected {
            self.disconnect();
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connectors: one live data channel between two ports.
//!
//! A connector owns the buffer and the transport-facing object of its side
//! and fires the port's listeners around every operation.
//!
//! | Connector | Holds | Operation |
//! |---|---|---|
//! | [`OutPortPushConnector`] | buffer, publisher, `InPortConsumer` | `write` |
//! | [`InPortPushConnector`] | buffer, `InPortProvider` | `read` |
//! | [`OutPortPullConnector`] | buffer, `OutPortProvider` | `write` |
//! | [`InPortPullConnector`] | `OutPortConsumer` | `read` |
//!
//! Construction fires `OnConnect`; [`Connector::disconnect`] fires
//! `OnDisconnect` and releases everything. Any operation after disconnect
//! returns `PreconditionNotMet`. `disconnect` must not race with
//! `read`/`write` on the same connector.

pub mod inport_pull;
pub mod inport_push;
pub mod outport_pull;
pub mod outport_push;

pub use inport_pull::InPortPullConnector;
pub use inport_push::InPortPushConnector;
pub use outport_pull::OutPortPullConnector;
pub use outport_push::OutPortPushConnector;

use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::listener::{ConnectorInfo, ConnectorListenerType as C, ConnectorListeners, Notifier};
use crate::registry::Registry;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Constructing,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Operations shared by every connector.
pub trait Connector<T>: Send + Sync {
    fn info(&self) -> &Arc<ConnectorInfo>;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    fn state(&self) -> ConnectorState;

    /// Buffer of this side, if it has one and is still connected.
    fn buffer(&self) -> Option<SharedBuffer<T>>;

    fn activate(&self) {}
    fn deactivate(&self) {}

    /// Tear the connection down. A second call returns `PreconditionNotMet`.
    fn disconnect(&self) -> PortStatus;
}

/// Writing side of a connection.
pub trait OutPortConnector<T>: Connector<T> {
    fn write(&self, sample: &Sample<T>) -> PortStatus;
}

/// Reading side of a connection.
pub trait InPortConnector<T>: Connector<T> {
    /// Take one sample. `timeout` overrides the buffer's read deadline.
    fn read(&self, timeout: Option<Duration>) -> std::result::Result<Sample<T>, PortStatus>;
}

/// State, profile, listeners and buffer ownership common to all connectors.
pub(crate) struct ConnectorBase<T> {
    info: Arc<ConnectorInfo>,
    listeners: Arc<ConnectorListeners<T>>,
    state: Mutex<ConnectorState>,
    buffer: RwLock<Option<SharedBuffer<T>>>,
    delete_buffer: bool,
}

impl<T: PortData> ConnectorBase<T> {
    /// Base for a connector without a buffer.
    pub(crate) fn new(info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) -> Self {
        Self {
            info,
            listeners,
            state: Mutex::new(ConnectorState::Constructing),
            buffer: RwLock::new(None),
            delete_buffer: false,
        }
    }

    /// Base holding `supplied`, or a buffer built from the connector
    /// properties (and then owned by the connector).
    pub(crate) fn with_buffer(
        info: Arc<ConnectorInfo>,
        listeners: Arc<ConnectorListeners<T>>,
        registry: &Registry<T>,
        supplied: Option<SharedBuffer<T>>,
    ) -> Result<Self> {
        let (buffer, delete_buffer) = match supplied {
            Some(buffer) => (buffer, false),
            None => (registry.create_buffer(&info.properties)?, true),
        };
        Ok(Self {
            info,
            listeners,
            state: Mutex::new(ConnectorState::Constructing),
            buffer: RwLock::new(Some(buffer)),
            delete_buffer,
        })
    }

    pub(crate) fn info(&self) -> &Arc<ConnectorInfo> {
        &self.info
    }

    pub(crate) fn listeners(&self) -> &Arc<ConnectorListeners<T>> {
        &self.listeners
    }

    pub(crate) fn notifier(&self) -> Notifier<T> {
        Notifier::new(Arc::clone(&self.info), Arc::clone(&self.listeners))
    }

    pub(crate) fn state(&self) -> ConnectorState {
        *self.state.lock()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state() == ConnectorState::Connected
    }

    pub(crate) fn buffer(&self) -> Option<SharedBuffer<T>> {
        self.buffer.read().clone()
    }

    /// True when the buffer was created by this connector.
    pub(crate) fn owns_buffer(&self) -> bool {
        self.delete_buffer
    }

    /// Enter `Connected` and fire `OnConnect`.
    pub(crate) fn on_connect(&self) {
        *self.state.lock() = ConnectorState::Connected;
        self.listeners.notify(C::OnConnect, &self.info);
        log::debug!("[Connector] {} ({}) connected", self.info.name, self.info.id);
    }

    /// Enter `Disconnecting` and fire `OnDisconnect`. False when the
    /// connector is not connected.
    pub(crate) fn begin_disconnect(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state != ConnectorState::Connected {
                return false;
            }
            *state = ConnectorState::Disconnecting;
        }
        self.listeners.notify(C::OnDisconnect, &self.info);
        true
    }

    /// Release the buffer and enter `Disconnected`.
    pub(crate) fn finish_disconnect(&self) {
        if let Some(buffer) = self.buffer.write().take() {
            if self.delete_buffer {
                buffer.reset();
                log::trace!("[Connector] {} released its buffer", self.info.id);
            } else {
                log::trace!("[Connector] {} returned a shared buffer", self.info.id);
            }
        }
        *self.state.lock() = ConnectorState::Disconnected;
        log::debug!("[Connector] {} ({}) disconnected", self.info.name, self.info.id);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::listener::{
        ConnectorDataListenerType, ConnectorInfo, ConnectorListenerType, ConnectorListeners,
        DataFn, EventFn,
    };
    use crate::sample::Sample;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records the name of every listener event fired on a listener set.
    pub(crate) fn record_all(listeners: &ConnectorListeners<u32>) -> Arc<Mutex<Vec<&'static str>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in ConnectorDataListenerType::ALL {
            let log = Arc::clone(&log);
            listeners.add_data_listener(
                kind,
                Arc::new(DataFn::new(move |_: &ConnectorInfo, _: &Sample<u32>| {
                    log.lock().push(kind.as_str())
                })),
                true,
            );
        }
        for kind in ConnectorListenerType::ALL {
            let log = Arc::clone(&log);
            listeners.add_listener(
                kind,
                Arc::new(EventFn(move |_: &ConnectorInfo| log.lock().push(kind.as_str()))),
                true,
            );
        }
        log
    }
}

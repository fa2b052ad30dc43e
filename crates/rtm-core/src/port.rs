// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data ports and connection assembly.
//!
//! An [`OutPort`] fans each written sample out to all of its connectors; an
//! [`InPort`] reads from its connectors in connection order, or from the
//! value a direct-mode peer stored in it. [`connect`] negotiates both sides
//! of a connection from one property set:
//!
//! | Property | Values |
//! |---|---|
//! | `dataport.dataflow_type` | `push` (default), `pull` |
//! | `dataport.interface_type` | `inproc` (default), `direct`, any registered transport |
//! | `buffer_type`, `buffer.*` | see [`crate::buffer`] |
//! | `publisher_type`, `publisher.*` | see [`crate::publisher`] |
//!
//! # Example
//!
//! ```rust
//! use rtm_core::port::{connect, InPort, OutPort};
//! use rtm_core::{Properties, Registry};
//! use std::sync::Arc;
//!
//! let registry = Registry::<i32>::with_defaults();
//! let outport = OutPort::new("out");
//! let inport = Arc::new(InPort::new("in"));
//!
//! let props = Properties::from_pairs([("publisher_type", "flush")]);
//! let id = connect(&registry, &outport, &inport, "out_in", props).unwrap();
//!
//! outport.write(7);
//! assert_eq!(inport.read().map(|s| s.payload), Ok(7));
//! rtm_core::port::disconnect(&outport, &inport, &id);
//! ```

use crate::connector::{
    InPortConnector, InPortPullConnector, InPortPushConnector, OutPortConnector,
    OutPortPullConnector, OutPortPushConnector,
};
use crate::error::{Error, Result};
use crate::interface::DirectSink;
use crate::listener::{ConnectorDataListenerType as D, ConnectorInfo, ConnectorListeners};
use crate::properties::Properties;
use crate::registry::{dataflow_type, interface_type, Registry};
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// Interface type selecting same-process direct hand-off.
pub const DIRECT_INTERFACE: &str = "direct";

// ============================================================================
// OutPort
// ============================================================================

pub struct OutPort<T> {
    name: String,
    listeners: Arc<ConnectorListeners<T>>,
    connectors: RwLock<Vec<Arc<dyn OutPortConnector<T>>>>,
}

impl<T: PortData> OutPort<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: ConnectorListeners::shared(),
            connectors: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Listener set shared by every connector of this port.
    pub fn listeners(&self) -> &Arc<ConnectorListeners<T>> {
        &self.listeners
    }

    /// Timestamp `value` now and write it to every connector.
    pub fn write(&self, value: T) -> PortStatus {
        self.write_sample(&Sample::new(value))
    }

    /// Write to every connector. Connectors reporting `ConnectionLost` are
    /// disconnected and removed. Returns `Ok` when all succeeded, otherwise
    /// the last failure.
    pub fn write_sample(&self, sample: &Sample<T>) -> PortStatus {
        let connectors = self.connectors.read().clone();
        let mut result = PortStatus::Ok;
        let mut lost = Vec::new();
        for connector in &connectors {
            let status = connector.write(sample);
            if status == PortStatus::ConnectionLost {
                lost.push(connector.id().to_string());
            }
            if !status.is_ok() {
                log::debug!(
                    "[OutPort::write] {} -> {}: {}",
                    self.name,
                    connector.id(),
                    status.as_str()
                );
                result = status;
            }
        }
        for id in lost {
            log::warn!("[OutPort::write] {}: dropping lost connector {}", self.name, id);
            self.remove_connector(&id);
        }
        result
    }

    pub fn add_connector(&self, connector: Arc<dyn OutPortConnector<T>>) {
        self.connectors.write().push(connector);
    }

    /// Disconnect and remove the connector with `id`.
    pub fn remove_connector(&self, id: &str) -> Option<Arc<dyn OutPortConnector<T>>> {
        let removed = {
            let mut connectors = self.connectors.write();
            let pos = connectors.iter().position(|c| c.id() == id)?;
            connectors.remove(pos)
        };
        removed.disconnect();
        Some(removed)
    }

    pub fn connector_ids(&self) -> Vec<String> {
        self.connectors.read().iter().map(|c| c.id().to_string()).collect()
    }

    pub fn connectors(&self) -> Vec<Arc<dyn OutPortConnector<T>>> {
        self.connectors.read().clone()
    }

    /// Activate every connector (starts periodic publishers).
    pub fn activate_interfaces(&self) {
        self.connectors.read().iter().for_each(|c| c.activate());
    }

    pub fn deactivate_interfaces(&self) {
        self.connectors.read().iter().for_each(|c| c.deactivate());
    }

    pub fn disconnect_all(&self) {
        let connectors: Vec<_> = self.connectors.write().drain(..).collect();
        for connector in connectors {
            connector.disconnect();
        }
    }
}

impl<T> Drop for OutPort<T> {
    fn drop(&mut self) {
        for connector in self.connectors.get_mut().drain(..) {
            connector.disconnect();
        }
    }
}

// ============================================================================
// InPort
// ============================================================================

struct DirectValue<T> {
    value: Option<Sample<T>>,
    is_new: bool,
}

pub struct InPort<T> {
    name: String,
    listeners: Arc<ConnectorListeners<T>>,
    connectors: RwLock<Vec<Arc<dyn InPortConnector<T>>>>,
    direct: Mutex<DirectValue<T>>,
}

impl<T: PortData> InPort<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: ConnectorListeners::shared(),
            connectors: RwLock::new(Vec::new()),
            direct: Mutex::new(DirectValue {
                value: None,
                is_new: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listeners(&self) -> &Arc<ConnectorListeners<T>> {
        &self.listeners
    }

    /// Read one sample.
    ///
    /// An unread direct-mode value takes precedence. Otherwise connectors
    /// are tried in connection order; the first sample wins. Without any
    /// connector or direct value the result is `PreconditionNotMet`.
    pub fn read(&self) -> std::result::Result<Sample<T>, PortStatus> {
        {
            let mut direct = self.direct.lock();
            if direct.is_new {
                direct.is_new = false;
                if let Some(sample) = &direct.value {
                    return Ok(sample.clone());
                }
            }
        }
        let connectors = self.connectors.read().clone();
        let mut last = PortStatus::PreconditionNotMet;
        for connector in &connectors {
            match connector.read(None) {
                Ok(sample) => return Ok(sample),
                Err(PortStatus::ConnectionLost) => {
                    log::warn!(
                        "[InPort::read] {}: dropping lost connector {}",
                        self.name,
                        connector.id()
                    );
                    self.remove_connector(connector.id());
                    last = PortStatus::ConnectionLost;
                }
                Err(status) => last = status,
            }
        }
        Err(last)
    }

    /// Last direct-mode value, read or not.
    pub fn direct_value(&self) -> Option<Sample<T>> {
        self.direct.lock().value.clone()
    }

    /// True when an unread sample is waiting in a direct value or a
    /// connector buffer.
    pub fn is_new(&self) -> bool {
        if self.direct.lock().is_new {
            return true;
        }
        self.connectors
            .read()
            .iter()
            .filter_map(|c| c.buffer())
            .any(|b| b.readable() > 0)
    }

    pub fn add_connector(&self, connector: Arc<dyn InPortConnector<T>>) {
        self.connectors.write().push(connector);
    }

    pub fn remove_connector(&self, id: &str) -> Option<Arc<dyn InPortConnector<T>>> {
        let removed = {
            let mut connectors = self.connectors.write();
            let pos = connectors.iter().position(|c| c.id() == id)?;
            connectors.remove(pos)
        };
        removed.disconnect();
        Some(removed)
    }

    pub fn connector_ids(&self) -> Vec<String> {
        self.connectors.read().iter().map(|c| c.id().to_string()).collect()
    }

    pub fn disconnect_all(&self) {
        let connectors: Vec<_> = self.connectors.write().drain(..).collect();
        for connector in connectors {
            connector.disconnect();
        }
    }
}

impl<T: PortData> DirectSink<T> for InPort<T> {
    fn write_direct(&self, info: &ConnectorInfo, sample: &Sample<T>) {
        self.listeners.notify_data(D::OnReceived, info, sample);
        self.listeners.notify_data(D::OnBufferWrite, info, sample);
        let mut direct = self.direct.lock();
        direct.value = Some(sample.clone());
        direct.is_new = true;
    }
}

impl<T> Drop for InPort<T> {
    fn drop(&mut self) {
        for connector in self.connectors.get_mut().drain(..) {
            connector.disconnect();
        }
    }
}

// ============================================================================
// Connection assembly
// ============================================================================

/// Connect `outport` to `inport` and return the connector id.
///
/// `props` become the connector profile; `id` is taken from the `id`
/// property when present, otherwise generated by the registry.
pub fn connect<T: PortData>(
    registry: &Registry<T>,
    outport: &OutPort<T>,
    inport: &Arc<InPort<T>>,
    name: &str,
    mut props: Properties,
) -> Result<String> {
    let id = match props.get("id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => registry.next_connector_id(),
    };
    let dataflow = dataflow_type(&props).to_string();
    let interface = interface_type(&props).to_string();
    log::debug!(
        "[connect] {} -> {} ({}, {}, {})",
        outport.name(),
        inport.name(),
        dataflow,
        interface,
        id
    );

    match (dataflow.as_str(), interface.as_str()) {
        ("push", DIRECT_INTERFACE) => {
            let info = ConnectorInfo::new(name, id.clone())
                .with_ports([outport.name(), inport.name()])
                .with_properties(props);
            let peer: Arc<dyn DirectSink<T>> = Arc::clone(inport) as Arc<dyn DirectSink<T>>;
            let sink: Weak<dyn DirectSink<T>> = Arc::downgrade(&peer);
            let connector =
                OutPortPushConnector::direct(info, sink, Arc::clone(outport.listeners()));
            outport.add_connector(Arc::new(connector));
        }
        ("push", _) => {
            let provider = registry.create_inport_provider(&props)?;
            provider.init(&props)?;
            provider.publish_interface_profile(&mut props);
            let consumer = registry.create_inport_consumer(&props)?;
            consumer.init(&props)?;
            if !consumer.subscribe_interface(&props) {
                return Err(Error::SubscriptionFailed(format!(
                    "{} -> {}",
                    outport.name(),
                    inport.name()
                )));
            }
            let info = ConnectorInfo::new(name, id.clone())
                .with_ports([outport.name(), inport.name()])
                .with_properties(props);
            let in_connector = InPortPushConnector::new(
                info.clone(),
                provider,
                Arc::clone(inport.listeners()),
                registry,
                None,
            )?;
            let out_connector = OutPortPushConnector::new(
                info,
                consumer,
                Arc::clone(outport.listeners()),
                registry,
                None,
            )?;
            inport.add_connector(Arc::new(in_connector));
            outport.add_connector(Arc::new(out_connector));
        }
        ("pull", DIRECT_INTERFACE) => {
            return Err(Error::InvalidArgs(
                "direct interface requires push dataflow".into(),
            ));
        }
        ("pull", _) => {
            let provider = registry.create_outport_provider(&props)?;
            provider.init(&props)?;
            provider.publish_interface_profile(&mut props);
            let consumer = registry.create_outport_consumer(&props)?;
            consumer.init(&props)?;
            if !consumer.subscribe_interface(&props) {
                return Err(Error::SubscriptionFailed(format!(
                    "{} <- {}",
                    inport.name(),
                    outport.name()
                )));
            }
            let info = ConnectorInfo::new(name, id.clone())
                .with_ports([outport.name(), inport.name()])
                .with_properties(props);
            let out_connector = OutPortPullConnector::new(
                info.clone(),
                provider,
                Arc::clone(outport.listeners()),
                registry,
                None,
            )?;
            let in_connector =
                InPortPullConnector::new(info, consumer, Arc::clone(inport.listeners()));
            outport.add_connector(Arc::new(out_connector));
            inport.add_connector(Arc::new(in_connector));
        }
        (other, _) => {
            return Err(Error::InvalidArgs(format!("unknown dataflow_type '{}'", other)));
        }
    }
    Ok(id)
}

/// Tear down both sides of connection `id`. Returns false when neither
/// port knew it.
pub fn disconnect<T: PortData>(outport: &OutPort<T>, inport: &InPort<T>, id: &str) -> bool {
    let out = outport.remove_connector(id).is_some();
    let inp = inport.remove_connector(id).is_some();
    out || inp
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport-facing roles of a connection.
//!
//! A data connection has a receive side (provider) and a send side
//! (consumer). The push model puts the provider on the InPort and the
//! consumer on the OutPort; the pull model mirrors that. Every transport
//! (CORBA, shared memory, sockets, ...) implements these narrow traits; the
//! engine never sees anything else.
//!
//! Bundled implementations:
//! - [`inproc`]: provider/consumer pairs resolved through an in-process
//!   endpoint table
//! - [`ChannelConsumer`]: pushes samples into a bounded `crossbeam` channel

pub mod channel;
pub mod inproc;

pub use channel::ChannelConsumer;
pub use inproc::{
    EndpointTable, InProcInPortConsumer, InProcInPortProvider, InProcOutPortConsumer,
    InProcOutPortProvider, ENDPOINT_KEY,
};

use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::listener::{ConnectorInfo, ConnectorListeners};
use crate::properties::Properties;
use crate::sample::Sample;
use crate::status::PortStatus;
use std::sync::Arc;

/// Receive side of a push connection (lives on the InPort).
pub trait InPortProvider<T>: Send + Sync {
    /// Apply connector properties.
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    /// Buffer incoming samples are written to.
    fn set_buffer(&self, buffer: Option<SharedBuffer<T>>);

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>);

    /// Advertise how consumers can reach this provider.
    fn publish_interface_profile(&self, props: &mut Properties);

    /// Entry point invoked by the remote consumer.
    fn put(&self, sample: &Sample<T>) -> PortStatus;
}

/// Send side of a push connection (lives on the OutPort).
pub trait InPortConsumer<T>: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    /// Bind to the provider advertised in `props`.
    fn subscribe_interface(&self, props: &Properties) -> bool;

    fn unsubscribe_interface(&self, props: &Properties);

    /// Deliver one sample to the remote side.
    fn put(&self, sample: &Sample<T>) -> PortStatus;
}

/// Send side of a pull connection (lives on the OutPort).
pub trait OutPortProvider<T>: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    /// Buffer samples are served from.
    fn set_buffer(&self, buffer: Option<SharedBuffer<T>>);

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>);

    fn publish_interface_profile(&self, props: &mut Properties);

    /// Entry point invoked by the remote consumer.
    fn get(&self) -> std::result::Result<Sample<T>, PortStatus>;
}

/// Receive side of a pull connection (lives on the InPort).
pub trait OutPortConsumer<T>: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    fn subscribe_interface(&self, props: &Properties) -> bool;

    fn unsubscribe_interface(&self, props: &Properties);

    /// Fetch one sample from the remote side.
    fn get(&self) -> std::result::Result<Sample<T>, PortStatus>;
}

/// Same-process InPort reachable without a transport (direct mode).
pub trait DirectSink<T>: Send + Sync {
    /// Store `sample` as the InPort's current value. The listener set is
    /// the receiving port's, fired by the sink itself.
    fn write_direct(&self, info: &ConnectorInfo, sample: &Sample<T>);
}

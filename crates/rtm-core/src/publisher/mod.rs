// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publishers: decide which written samples reach the consumer, and when.
//!
//! | `publisher_type` | Delivery |
//! |---|---|
//! | `flush` | synchronously, on the writer's thread; no buffer |
//! | `new` | buffered, pushed by a worker thread woken on every write |
//! | `periodic` | buffered, pushed by a worker thread at `publisher.push_rate` Hz |
//!
//! The buffered variants apply a [`PushPolicy`] on each wake.
//!
//! # Failure caching
//!
//! A push that returns `ConnectionLost` (or panics inside the transport) is
//! cached: every later `write` returns `ConnectionLost` without touching the
//! buffer. A `SendFull` push makes the next `write` report `BufferFull`; the
//! next successful push clears it.

pub mod flush;
pub mod new;
pub mod periodic;
pub mod policy;

pub use flush::PublisherFlush;
pub use new::PublisherNew;
pub use periodic::PublisherPeriodic;
pub use policy::{PushConfig, PushPolicy};

use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::InPortConsumer;
use crate::listener::{ConnectorInfo, ConnectorListeners};
use crate::properties::Properties;
use crate::sample::Sample;
use crate::status::PortStatus;
use std::sync::Arc;
use std::time::Duration;

/// Push-side delivery engine of an OutPort connector.
pub trait Publisher<T>: Send + Sync {
    /// Apply connector properties (`publisher.*`).
    fn init(&self, props: &Properties) -> Result<()>;

    fn set_consumer(&self, consumer: Arc<dyn InPortConsumer<T>>);

    /// Buffer to stage samples in. Ignored by publishers that do not buffer.
    fn set_buffer(&self, buffer: SharedBuffer<T>);

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>);

    /// Hand one sample to the publisher. `timeout` overrides the buffer's
    /// configured write deadline for this call.
    fn write(&self, sample: &Sample<T>, timeout: Option<Duration>) -> PortStatus;

    fn is_active(&self) -> bool;
    fn activate(&self) -> PortStatus;
    fn deactivate(&self) -> PortStatus;

    /// Stop background work and release the consumer. Idempotent.
    fn finalize(&self);
}

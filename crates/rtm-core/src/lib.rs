// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rtm-core - RT-Component execution and data-port engine
//!
//! Transport-agnostic core of an RT-Middleware runtime: execution contexts
//! that drive component lifecycles, and the data-port machinery (buffers,
//! publishers, connectors, listeners) that moves samples between ports.
//!
//! ## Quick Start
//!
//! ```rust
//! use rtm_core::port::{connect, InPort, OutPort};
//! use rtm_core::{Properties, Registry};
//! use std::sync::Arc;
//!
//! let registry = Registry::<f64>::with_defaults();
//! let outport = OutPort::new("temperature");
//! let inport = Arc::new(InPort::new("temperature_in"));
//!
//! let props = Properties::from_pairs([
//!     ("publisher_type", "flush"),
//!     ("buffer.length", "8"),
//! ]);
//! connect(&registry, &outport, &inport, "temp", props)?;
//!
//! outport.write(21.5);
//! assert_eq!(inport.read().map(|s| s.payload), Ok(21.5));
//! # Ok::<(), rtm_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  ExecutionContext (Periodic | Simulator)                            |
//! |    RtObjectStateMachine -> StateMachine<LifeCycleState>             |
//! +---------------------------------------------------------------------+
//! |  OutPort ----> OutPortConnector ----> Publisher ----> InPortConsumer |
//! |                                                         |  transport |
//! |  InPort  <---- InPortConnector  <---- Buffer <---- InPortProvider    |
//! +---------------------------------------------------------------------+
//! |  RingBuffer + policies | ConnectorListeners | Registry | Properties |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Factories for buffers, publishers and interfaces |
//! | [`port::OutPort`] / [`port::InPort`] | Data ports owning connectors |
//! | [`buffer::Buffer`] | Ring buffer with full/empty policies |
//! | [`publisher::Publisher`] | Flush, New (async) and Periodic delivery |
//! | [`listener::ConnectorListeners`] | Per-event callback registries |
//! | [`state_machine::StateMachine`] | Deferred-transition state machine |
//! | [`execution_context::ExecutionContext`] | Component driver surface |
//!
//! ## Features
//!
//! - `yaml`: load [`Properties`] from YAML documents

/// Ring buffer and full/empty policies.
pub mod buffer;
/// RT-Component callbacks and lifecycle wiring.
pub mod component;
/// Connectors binding a port to a buffer, publisher and interface.
pub mod connector;
/// Setup-time error type.
pub mod error;
/// Periodic and simulator execution contexts.
pub mod execution_context;
/// Provider / consumer interface traits and in-process transports.
pub mod interface;
/// Connector listener types, holders and notification.
pub mod listener;
/// Data ports and connection assembly.
pub mod port;
/// Flat dotted-key configuration.
pub mod properties;
/// Publishers (Flush, New, Periodic) and push policies.
pub mod publisher;
/// Factory registry.
pub mod registry;
/// Timestamped samples.
pub mod sample;
/// Generic state machine with one-tick deferred transitions.
pub mod state_machine;
/// Status and return codes.
pub mod status;
/// Worker thread with suspend/resume/signal control.
pub mod task;

pub use error::{Error, Result};
pub use properties::Properties;
pub use registry::Registry;
pub use sample::{PortData, Sample, Timestamp};
pub use status::{BufferStatus, PortStatus, ReturnCode};

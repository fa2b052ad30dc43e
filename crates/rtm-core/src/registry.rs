// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Factory registry for buffers, publishers, providers and consumers.
//!
//! One `Registry<T>` per sample type is built at startup and shared by `Arc`
//! with whatever assembles connections. Identifiers are the values of the
//! connector properties:
//!
//! | Family | Property | Built-in identifiers |
//! |---|---|---|
//! | buffer | `buffer_type` | `ring_buffer` |
//! | publisher | `publisher_type` (or `dataport.subscription_type`) | `flush`, `new`, `periodic` |
//! | provider / consumer | `dataport.interface_type` | `inproc` |
//!
//! Registering an identifier twice replaces the previous factory.

use crate::buffer::{Buffer, SharedBuffer, DEFAULT_LENGTH};
use crate::error::{Error, Result};
use crate::interface::{
    EndpointTable, InPortConsumer, InPortProvider, InProcInPortConsumer, InProcInPortProvider,
    InProcOutPortConsumer, InProcOutPortProvider, OutPortConsumer, OutPortProvider,
};
use crate::properties::Properties;
use crate::publisher::{Publisher, PublisherFlush, PublisherNew, PublisherPeriodic};
use crate::sample::PortData;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_BUFFER_TYPE: &str = "ring_buffer";
pub const DEFAULT_PUBLISHER_TYPE: &str = "new";
pub const DEFAULT_INTERFACE_TYPE: &str = "inproc";

pub type BufferFactory<T> = Arc<dyn Fn() -> SharedBuffer<T> + Send + Sync>;
pub type PublisherFactory<T> = Arc<dyn Fn() -> Arc<dyn Publisher<T>> + Send + Sync>;
pub type InPortProviderFactory<T> = Arc<dyn Fn() -> Arc<dyn InPortProvider<T>> + Send + Sync>;
pub type InPortConsumerFactory<T> = Arc<dyn Fn() -> Arc<dyn InPortConsumer<T>> + Send + Sync>;
pub type OutPortProviderFactory<T> = Arc<dyn Fn() -> Arc<dyn OutPortProvider<T>> + Send + Sync>;
pub type OutPortConsumerFactory<T> = Arc<dyn Fn() -> Arc<dyn OutPortConsumer<T>> + Send + Sync>;

/// `dataport.interface_type`, falling back to a bare `interface_type`.
pub fn interface_type(props: &Properties) -> &str {
    props
        .get("dataport.interface_type")
        .filter(|v| !v.is_empty())
        .or_else(|| props.get("interface_type"))
        .unwrap_or(DEFAULT_INTERFACE_TYPE)
}

/// `dataport.dataflow_type`, falling back to a bare `dataflow_type`.
pub fn dataflow_type(props: &Properties) -> &str {
    props
        .get("dataport.dataflow_type")
        .filter(|v| !v.is_empty())
        .or_else(|| props.get("dataflow_type"))
        .unwrap_or("push")
}

/// `publisher_type`, falling back to `dataport.subscription_type`.
pub fn publisher_type(props: &Properties) -> &str {
    props
        .get("publisher_type")
        .filter(|v| !v.is_empty())
        .or_else(|| props.get("dataport.subscription_type"))
        .unwrap_or(DEFAULT_PUBLISHER_TYPE)
}

pub struct Registry<T> {
    buffers: DashMap<String, BufferFactory<T>>,
    publishers: DashMap<String, PublisherFactory<T>>,
    inport_providers: DashMap<String, InPortProviderFactory<T>>,
    inport_consumers: DashMap<String, InPortConsumerFactory<T>>,
    outport_providers: DashMap<String, OutPortProviderFactory<T>>,
    outport_consumers: DashMap<String, OutPortConsumerFactory<T>>,
    endpoints: Arc<EndpointTable<T>>,
    next_connector_id: AtomicU64,
}

impl<T: PortData> Registry<T> {
    /// Registry with no factories.
    pub fn empty() -> Self {
        Self {
            buffers: DashMap::new(),
            publishers: DashMap::new(),
            inport_providers: DashMap::new(),
            inport_consumers: DashMap::new(),
            outport_providers: DashMap::new(),
            outport_consumers: DashMap::new(),
            endpoints: Arc::new(EndpointTable::new()),
            next_connector_id: AtomicU64::new(1),
        }
    }

    /// Registry preloaded with the built-in buffer, publishers and the
    /// `inproc` transport.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.register_buffer(DEFAULT_BUFFER_TYPE, || {
            Arc::new(Buffer::new(DEFAULT_LENGTH)) as SharedBuffer<T>
        });
        registry.register_publisher("flush", || Arc::new(PublisherFlush::new()) as Arc<dyn Publisher<T>>);
        registry.register_publisher("new", || Arc::new(PublisherNew::new()) as Arc<dyn Publisher<T>>);
        registry.register_publisher("periodic", || {
            Arc::new(PublisherPeriodic::new()) as Arc<dyn Publisher<T>>
        });

        let table = Arc::clone(&registry.endpoints);
        registry.register_inport_provider(DEFAULT_INTERFACE_TYPE, move || {
            InProcInPortProvider::create(&table) as Arc<dyn InPortProvider<T>>
        });
        let table = Arc::clone(&registry.endpoints);
        registry.register_inport_consumer(DEFAULT_INTERFACE_TYPE, move || {
            Arc::new(InProcInPortConsumer::new(&table)) as Arc<dyn InPortConsumer<T>>
        });
        let table = Arc::clone(&registry.endpoints);
        registry.register_outport_provider(DEFAULT_INTERFACE_TYPE, move || {
            InProcOutPortProvider::create(&table) as Arc<dyn OutPortProvider<T>>
        });
        let table = Arc::clone(&registry.endpoints);
        registry.register_outport_consumer(DEFAULT_INTERFACE_TYPE, move || {
            Arc::new(InProcOutPortConsumer::new(&table)) as Arc<dyn OutPortConsumer<T>>
        });
        registry
    }

    /// Endpoint table backing the `inproc` transport.
    pub fn endpoints(&self) -> &Arc<EndpointTable<T>> {
        &self.endpoints
    }

    /// Fresh connector identifier, unique within this registry.
    pub fn next_connector_id(&self) -> String {
        format!("conn-{}", self.next_connector_id.fetch_add(1, Ordering::Relaxed))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn register_buffer<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> SharedBuffer<T> + Send + Sync + 'static,
    {
        self.buffers.insert(id.to_string(), Arc::new(factory));
    }

    pub fn register_publisher<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Publisher<T>> + Send + Sync + 'static,
    {
        self.publishers.insert(id.to_string(), Arc::new(factory));
    }

    pub fn register_inport_provider<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn InPortProvider<T>> + Send + Sync + 'static,
    {
        self.inport_providers.insert(id.to_string(), Arc::new(factory));
    }

    pub fn register_inport_consumer<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn InPortConsumer<T>> + Send + Sync + 'static,
    {
        self.inport_consumers.insert(id.to_string(), Arc::new(factory));
    }

    pub fn register_outport_provider<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn OutPortProvider<T>> + Send + Sync + 'static,
    {
        self.outport_providers.insert(id.to_string(), Arc::new(factory));
    }

    pub fn register_outport_consumer<F>(&self, id: &str, factory: F)
    where
        F: Fn() -> Arc<dyn OutPortConsumer<T>> + Send + Sync + 'static,
    {
        self.outport_consumers.insert(id.to_string(), Arc::new(factory));
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Buffer named by `buffer_type`, initialized from the `buffer` node.
    pub fn create_buffer(&self, props: &Properties) -> Result<SharedBuffer<T>> {
        let id = props.get_or("buffer_type", DEFAULT_BUFFER_TYPE);
        let factory = lookup(&self.buffers, "buffer", id)?;
        let buffer = factory();
        buffer.init(&props.node("buffer"));
        Ok(buffer)
    }

    /// Publisher named by `publisher_type`. Not yet initialized.
    pub fn create_publisher(&self, props: &Properties) -> Result<Arc<dyn Publisher<T>>> {
        lookup(&self.publishers, "publisher", publisher_type(props)).map(|f| f())
    }

    pub fn create_inport_provider(&self, props: &Properties) -> Result<Arc<dyn InPortProvider<T>>> {
        lookup(&self.inport_providers, "provider", interface_type(props)).map(|f| f())
    }

    pub fn create_inport_consumer(&self, props: &Properties) -> Result<Arc<dyn InPortConsumer<T>>> {
        lookup(&self.inport_consumers, "consumer", interface_type(props)).map(|f| f())
    }

    pub fn create_outport_provider(
        &self,
        props: &Properties,
    ) -> Result<Arc<dyn OutPortProvider<T>>> {
        lookup(&self.outport_providers, "provider", interface_type(props)).map(|f| f())
    }

    pub fn create_outport_consumer(
        &self,
        props: &Properties,
    ) -> Result<Arc<dyn OutPortConsumer<T>>> {
        lookup(&self.outport_consumers, "consumer", interface_type(props)).map(|f| f())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn buffer_types(&self) -> Vec<String> {
        sorted_keys(&self.buffers)
    }

    pub fn publisher_types(&self) -> Vec<String> {
        sorted_keys(&self.publishers)
    }

    /// Interface types with both an InPort provider and consumer.
    pub fn push_interface_types(&self) -> Vec<String> {
        sorted_keys(&self.inport_providers)
            .into_iter()
            .filter(|id| self.inport_consumers.contains_key(id))
            .collect()
    }

    /// Interface types with both an OutPort provider and consumer.
    pub fn pull_interface_types(&self) -> Vec<String> {
        sorted_keys(&self.outport_providers)
            .into_iter()
            .filter(|id| self.outport_consumers.contains_key(id))
            .collect()
    }
}

impl<T: PortData> Default for Registry<T> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn lookup<F: Clone>(map: &DashMap<String, F>, kind: &'static str, id: &str) -> Result<F> {
    match map.get(id) {
        Some(entry) => Ok(entry.value().clone()),
        None => {
            log::error!("[Registry] no {} factory for '{}'", kind, id);
            Err(Error::UnknownFactory {
                kind,
                id: id.to_string(),
            })
        }
    }
}

fn sorted_keys<F>(map: &DashMap<String, F>) -> Vec<String> {
    let mut keys: Vec<String> = map.iter().map(|e| e.key().clone()).collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_listed() {
        let registry: Registry<u8> = Registry::with_defaults();
        assert_eq!(registry.buffer_types(), vec!["ring_buffer"]);
        assert_eq!(registry.publisher_types(), vec!["flush", "new", "periodic"]);
        assert_eq!(registry.push_interface_types(), vec!["inproc"]);
        assert_eq!(registry.pull_interface_types(), vec!["inproc"]);
    }

    #[test]
    fn test_unknown_buffer_type() {
        let registry: Registry<u8> = Registry::with_defaults();
        let props = Properties::from_pairs([("buffer_type", "tape")]);
        match registry.create_buffer(&props) {
            Err(Error::UnknownFactory { kind, id }) => {
                assert_eq!(kind, "buffer");
                assert_eq!(id, "tape");
            }
            other => panic!("unexpected: {:?}", other.map(|b| b.length())),
        }
    }

    #[test]
    fn test_buffer_initialized_from_node() {
        let registry: Registry<u8> = Registry::with_defaults();
        let props = Properties::from_pairs([
            ("buffer.length", "3"),
            ("buffer.write.full_policy", "do_nothing"),
        ]);
        let buffer = registry.create_buffer(&props).unwrap();
        assert_eq!(buffer.length(), 3);
        assert_eq!(buffer.policy().full, crate::buffer::FullPolicy::DoNothing);
    }

    #[test]
    fn test_custom_publisher_registration() {
        let registry: Registry<u8> = Registry::empty();
        assert!(registry
            .create_publisher(&Properties::from_pairs([("publisher_type", "flush")]))
            .is_err());
        registry.register_publisher("flush", || Arc::new(PublisherFlush::new()) as Arc<dyn Publisher<u8>>);
        assert!(registry
            .create_publisher(&Properties::from_pairs([("publisher_type", "flush")]))
            .is_ok());
    }

    #[test]
    fn test_interface_type_fallbacks() {
        assert_eq!(interface_type(&Properties::new()), "inproc");
        let bare = Properties::from_pairs([("interface_type", "direct")]);
        assert_eq!(interface_type(&bare), "direct");
        let full = Properties::from_pairs([
            ("dataport.interface_type", "shm"),
            ("interface_type", "direct"),
        ]);
        assert_eq!(interface_type(&full), "shm");
    }

    #[test]
    fn test_subscription_type_selects_publisher() {
        assert_eq!(publisher_type(&Properties::new()), "new");
        let legacy = Properties::from_pairs([("dataport.subscription_type", "flush")]);
        assert_eq!(publisher_type(&legacy), "flush");
        let both = Properties::from_pairs([
            ("publisher_type", "periodic"),
            ("dataport.subscription_type", "flush"),
        ]);
        assert_eq!(publisher_type(&both), "periodic");
    }

    #[test]
    fn test_connector_ids_unique() {
        let registry: Registry<u8> = Registry::empty();
        assert_ne!(registry.next_connector_id(), registry.next_connector_id());
    }
}

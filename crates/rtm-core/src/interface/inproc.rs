// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport.
//!
//! Providers register themselves in an [`EndpointTable`] under a generated
//! endpoint name and advertise it through `dataport.inproc.endpoint`;
//! consumers resolve that name in `subscribe_interface`. The table and the
//! consumers hold weak references only, so dropping the provider side of a
//! connection makes the consumer report `ConnectionLost`.

use super::{InPortConsumer, InPortProvider, OutPortConsumer, OutPortProvider};
use crate::buffer::SharedBuffer;
use crate::listener::{
    ConnectorDataListenerType as D, ConnectorInfo, ConnectorListenerType as C,
    ConnectorListeners, Notifier,
};
use crate::properties::Properties;
use crate::sample::{PortData, Sample};
use crate::status::{BufferStatus, PortStatus};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Property carrying the endpoint name of an inproc provider.
pub const ENDPOINT_KEY: &str = "dataport.inproc.endpoint";

/// Name → provider table shared by every inproc provider and consumer of a
/// registry.
pub struct EndpointTable<T> {
    inport: DashMap<String, Weak<dyn InPortProvider<T>>>,
    outport: DashMap<String, Weak<dyn OutPortProvider<T>>>,
    next_id: AtomicU64,
}

impl<T: PortData> EndpointTable<T> {
    pub fn new() -> Self {
        Self {
            inport: DashMap::new(),
            outport: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn lookup_inport(&self, endpoint: &str) -> Option<Arc<dyn InPortProvider<T>>> {
        self.inport.get(endpoint).and_then(|w| w.upgrade())
    }

    pub fn lookup_outport(&self, endpoint: &str) -> Option<Arc<dyn OutPortProvider<T>>> {
        self.outport.get(endpoint).and_then(|w| w.upgrade())
    }

    /// Number of live registered endpoints.
    pub fn len(&self) -> usize {
        self.inport.len() + self.outport.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: PortData> Default for EndpointTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Push: InPort provider / OutPort consumer
// ============================================================================

/// Receive side of an inproc push connection.
pub struct InProcInPortProvider<T: PortData> {
    endpoint: String,
    table: Arc<EndpointTable<T>>,
    buffer: RwLock<Option<SharedBuffer<T>>>,
    notifier: RwLock<Notifier<T>>,
}

impl<T: PortData> InProcInPortProvider<T> {
    /// Create a provider and register it in `table`.
    pub fn create(table: &Arc<EndpointTable<T>>) -> Arc<Self> {
        let endpoint = table.allocate("inport");
        let provider = Arc::new(Self {
            endpoint: endpoint.clone(),
            table: Arc::clone(table),
            buffer: RwLock::new(None),
            notifier: RwLock::new(Notifier::none()),
        });
        let erased: Arc<dyn InPortProvider<T>> = provider.clone();
        table.inport.insert(endpoint, Arc::downgrade(&erased));
        provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn convert(&self, status: BufferStatus, sample: &Sample<T>, notifier: &Notifier<T>) -> PortStatus {
        match status {
            BufferStatus::Ok => {
                notifier.data(D::OnBufferWrite, sample);
                PortStatus::Ok
            }
            BufferStatus::Full => {
                notifier.data(D::OnBufferFull, sample);
                notifier.data(D::OnReceiverFull, sample);
                PortStatus::BufferFull
            }
            BufferStatus::Timeout => {
                notifier.data(D::OnBufferWriteTimeout, sample);
                notifier.data(D::OnReceiverTimeout, sample);
                PortStatus::BufferTimeout
            }
            BufferStatus::Empty => PortStatus::BufferEmpty,
            BufferStatus::PreconditionNotMet | BufferStatus::Error => {
                notifier.data(D::OnReceiverError, sample);
                PortStatus::Error
            }
        }
    }
}

impl<T: PortData> InPortProvider<T> for InProcInPortProvider<T> {
    fn set_buffer(&self, buffer: Option<SharedBuffer<T>>) {
        *self.buffer.write() = buffer;
    }

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) {
        *self.notifier.write() = Notifier::new(info, listeners);
    }

    fn publish_interface_profile(&self, props: &mut Properties) {
        props.set(ENDPOINT_KEY, self.endpoint.clone());
    }

    fn put(&self, sample: &Sample<T>) -> PortStatus {
        let notifier = self.notifier.read().clone();
        let buffer = match self.buffer.read().clone() {
            Some(b) => b,
            None => {
                notifier.data(D::OnReceiverError, sample);
                return PortStatus::Error;
            }
        };
        notifier.data(D::OnReceived, sample);
        let (status, overwrote) = buffer.write_tracked(sample.clone(), None);
        if overwrote {
            notifier.data(D::OnBufferOverwrite, sample);
        }
        self.convert(status, sample, &notifier)
    }
}

impl<T: PortData> Drop for InProcInPortProvider<T> {
    fn drop(&mut self) {
        self.table.inport.remove(&self.endpoint);
        log::trace!("[InProcInPortProvider] released {}", self.endpoint);
    }
}

/// Send side of an inproc push connection.
pub struct InProcInPortConsumer<T: PortData> {
    table: Arc<EndpointTable<T>>,
    provider: RwLock<Option<Weak<dyn InPortProvider<T>>>>,
}

impl<T: PortData> InProcInPortConsumer<T> {
    pub fn new(table: &Arc<EndpointTable<T>>) -> Self {
        Self {
            table: Arc::clone(table),
            provider: RwLock::new(None),
        }
    }
}

impl<T: PortData> InPortConsumer<T> for InProcInPortConsumer<T> {
    fn subscribe_interface(&self, props: &Properties) -> bool {
        let Some(endpoint) = props.get(ENDPOINT_KEY) else {
            log::error!("[InProcInPortConsumer] {} missing", ENDPOINT_KEY);
            return false;
        };
        match self.table.lookup_inport(endpoint) {
            Some(provider) => {
                *self.provider.write() = Some(Arc::downgrade(&provider));
                log::debug!("[InProcInPortConsumer] subscribed to {}", endpoint);
                true
            }
            None => {
                log::error!("[InProcInPortConsumer] unknown endpoint {}", endpoint);
                false
            }
        }
    }

    fn unsubscribe_interface(&self, _props: &Properties) {
        *self.provider.write() = None;
    }

    fn put(&self, sample: &Sample<T>) -> PortStatus {
        let provider = self.provider.read().as_ref().and_then(Weak::upgrade);
        let Some(provider) = provider else {
            return PortStatus::ConnectionLost;
        };
        match provider.put(sample) {
            PortStatus::BufferFull => PortStatus::SendFull,
            PortStatus::BufferTimeout => PortStatus::SendTimeout,
            other => other,
        }
    }
}

// ============================================================================
// Pull: OutPort provider / InPort consumer
// ============================================================================

/// Serving side of an inproc pull connection.
pub struct InProcOutPortProvider<T: PortData> {
    endpoint: String,
    table: Arc<EndpointTable<T>>,
    buffer: RwLock<Option<SharedBuffer<T>>>,
    notifier: RwLock<Notifier<T>>,
}

impl<T: PortData> InProcOutPortProvider<T> {
    pub fn create(table: &Arc<EndpointTable<T>>) -> Arc<Self> {
        let endpoint = table.allocate("outport");
        let provider = Arc::new(Self {
            endpoint: endpoint.clone(),
            table: Arc::clone(table),
            buffer: RwLock::new(None),
            notifier: RwLock::new(Notifier::none()),
        });
        let erased: Arc<dyn OutPortProvider<T>> = provider.clone();
        table.outport.insert(endpoint, Arc::downgrade(&erased));
        provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<T: PortData> OutPortProvider<T> for InProcOutPortProvider<T> {
    fn set_buffer(&self, buffer: Option<SharedBuffer<T>>) {
        *self.buffer.write() = buffer;
    }

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) {
        *self.notifier.write() = Notifier::new(info, listeners);
    }

    fn publish_interface_profile(&self, props: &mut Properties) {
        props.set(ENDPOINT_KEY, self.endpoint.clone());
    }

    fn get(&self) -> Result<Sample<T>, PortStatus> {
        let notifier = self.notifier.read().clone();
        let Some(buffer) = self.buffer.read().clone() else {
            notifier.event(C::OnSenderError);
            return Err(PortStatus::UnknownError);
        };
        match buffer.read(None) {
            Ok(sample) => {
                notifier.data(D::OnBufferRead, &sample);
                notifier.data(D::OnSend, &sample);
                Ok(sample)
            }
            Err(BufferStatus::Empty) => {
                notifier.event(C::OnBufferEmpty);
                notifier.event(C::OnSenderEmpty);
                Err(PortStatus::BufferEmpty)
            }
            Err(BufferStatus::Timeout) => {
                notifier.event(C::OnBufferReadTimeout);
                notifier.event(C::OnSenderTimeout);
                Err(PortStatus::BufferTimeout)
            }
            Err(_) => {
                notifier.event(C::OnSenderError);
                Err(PortStatus::Error)
            }
        }
    }
}

impl<T: PortData> Drop for InProcOutPortProvider<T> {
    fn drop(&mut self) {
        self.table.outport.remove(&self.endpoint);
        log::trace!("[InProcOutPortProvider] released {}", self.endpoint);
    }
}

/// Fetching side of an inproc pull connection.
pub struct InProcOutPortConsumer<T: PortData> {
    table: Arc<EndpointTable<T>>,
    provider: RwLock<Option<Weak<dyn OutPortProvider<T>>>>,
}

impl<T: PortData> InProcOutPortConsumer<T> {
    pub fn new(table: &Arc<EndpointTable<T>>) -> Self {
        Self {
            table: Arc::clone(table),
            provider: RwLock::new(None),
        }
    }
}

impl<T: PortData> OutPortConsumer<T> for InProcOutPortConsumer<T> {
    fn subscribe_interface(&self, props: &Properties) -> bool {
        let Some(endpoint) = props.get(ENDPOINT_KEY) else {
            log::error!("[InProcOutPortConsumer] {} missing", ENDPOINT_KEY);
            return false;
        };
        match self.table.lookup_outport(endpoint) {
            Some(provider) => {
                *self.provider.write() = Some(Arc::downgrade(&provider));
                true
            }
            None => {
                log::error!("[InProcOutPortConsumer] unknown endpoint {}", endpoint);
                false
            }
        }
    }

    fn unsubscribe_interface(&self, _props: &Properties) {
        *self.provider.write() = None;
    }

    fn get(&self) -> Result<Sample<T>, PortStatus> {
        let provider = self.provider.read().as_ref().and_then(Weak::upgrade);
        match provider {
            Some(p) => p.get(),
            None => Err(PortStatus::ConnectionLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::listener::DataFn;
    use parking_lot::Mutex;

    fn shared_buffer(pairs: &[(&str, &str)]) -> SharedBuffer<u32> {
        Arc::new(Buffer::from_properties(&Properties::from_pairs(
            pairs.iter().copied(),
        )))
    }

    fn subscribed_pair(
        table: &Arc<EndpointTable<u32>>,
    ) -> (Arc<InProcInPortProvider<u32>>, InProcInPortConsumer<u32>) {
        let provider = InProcInPortProvider::create(table);
        let consumer = InProcInPortConsumer::new(table);
        let mut props = Properties::new();
        provider.publish_interface_profile(&mut props);
        assert!(consumer.subscribe_interface(&props));
        (provider, consumer)
    }

    #[test]
    fn test_push_reaches_provider_buffer() {
        let table = Arc::new(EndpointTable::new());
        let (provider, consumer) = subscribed_pair(&table);
        let buffer = shared_buffer(&[]);
        provider.set_buffer(Some(Arc::clone(&buffer)));

        assert_eq!(consumer.put(&Sample::new(5)), PortStatus::Ok);
        assert_eq!(buffer.read(None).map(Sample::into_payload), Ok(5));
    }

    #[test]
    fn test_full_provider_maps_to_send_full() {
        let table = Arc::new(EndpointTable::new());
        let (provider, consumer) = subscribed_pair(&table);
        provider.set_buffer(Some(shared_buffer(&[
            ("length", "1"),
            ("write.full_policy", "do_nothing"),
        ])));
        let listeners = ConnectorListeners::shared();
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [D::OnReceived, D::OnBufferWrite, D::OnBufferFull, D::OnReceiverFull] {
            let log = Arc::clone(&log);
            listeners.add_data_listener(
                kind,
                Arc::new(DataFn::new(move |_: &ConnectorInfo, _: &Sample<u32>| {
                    log.lock().push(kind)
                })),
                true,
            );
        }
        provider.set_listener(Arc::new(ConnectorInfo::new("c", "1")), listeners);

        assert_eq!(consumer.put(&Sample::new(1)), PortStatus::Ok);
        assert_eq!(consumer.put(&Sample::new(2)), PortStatus::SendFull);
        assert_eq!(
            *log.lock(),
            vec![
                D::OnReceived,
                D::OnBufferWrite,
                D::OnReceived,
                D::OnBufferFull,
                D::OnReceiverFull
            ]
        );
    }

    #[test]
    fn test_overwrite_event_only_when_sample_discarded() {
        let table = Arc::new(EndpointTable::new());
        let (provider, consumer) = subscribed_pair(&table);
        let buffer = shared_buffer(&[("length", "2")]);
        provider.set_buffer(Some(Arc::clone(&buffer)));
        let listeners = ConnectorListeners::shared();
        let dropped = Arc::new(Mutex::new(Vec::new()));
        {
            let dropped = Arc::clone(&dropped);
            listeners.add_data_listener(
                D::OnBufferOverwrite,
                Arc::new(DataFn::new(move |_: &ConnectorInfo, s: &Sample<u32>| {
                    dropped.lock().push(s.payload)
                })),
                true,
            );
        }
        provider.set_listener(Arc::new(ConnectorInfo::new("c", "1")), listeners);

        for v in 1..=3 {
            assert_eq!(consumer.put(&Sample::new(v)), PortStatus::Ok);
        }
        assert_eq!(*dropped.lock(), vec![3]);
        assert_eq!(buffer.read(None).map(Sample::into_payload), Ok(2));
        assert_eq!(consumer.put(&Sample::new(4)), PortStatus::Ok);
        assert_eq!(*dropped.lock(), vec![3]);
    }

    #[test]
    fn test_dropped_provider_is_connection_lost() {
        let table = Arc::new(EndpointTable::new());
        let (provider, consumer) = subscribed_pair(&table);
        assert_eq!(table.len(), 1);
        drop(provider);
        assert!(table.is_empty());
        assert_eq!(consumer.put(&Sample::new(1)), PortStatus::ConnectionLost);
    }

    #[test]
    fn test_subscribe_unknown_endpoint_fails() {
        let table: Arc<EndpointTable<u32>> = Arc::new(EndpointTable::new());
        let consumer = InProcInPortConsumer::new(&table);
        assert!(!consumer.subscribe_interface(&Properties::new()));
        let props = Properties::from_pairs([(ENDPOINT_KEY, "inport-404")]);
        assert!(!consumer.subscribe_interface(&props));
    }

    #[test]
    fn test_pull_roundtrip_and_empty() {
        let table = Arc::new(EndpointTable::new());
        let provider = InProcOutPortProvider::create(&table);
        let buffer = shared_buffer(&[]);
        provider.set_buffer(Some(Arc::clone(&buffer)));
        let consumer = InProcOutPortConsumer::new(&table);
        let mut props = Properties::new();
        provider.publish_interface_profile(&mut props);
        assert!(consumer.subscribe_interface(&props));

        assert_eq!(consumer.get().err(), Some(PortStatus::BufferEmpty));
        buffer.write(Sample::new(11), None);
        assert_eq!(consumer.get().map(Sample::into_payload), Ok(11));
    }
}

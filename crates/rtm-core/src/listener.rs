// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector listener framework.
//!
//! Typed callback registry observing port activity. Every listener type has
//! its own ordered [`ListenerHolder`]; callbacks run synchronously on the
//! thread performing the I/O, in registration order.
//!
//! Two families exist:
//! - [`ConnectorDataListener`]: receives the connector profile and the sample
//!   involved (`OnBufferWrite`, `OnReceived`, ...)
//! - [`ConnectorListener`]: receives the connector profile only
//!   (`OnBufferEmpty`, `OnConnect`, ...)
//!
//! # Usage
//!
//! ```rust
//! use rtm_core::listener::{ConnectorDataListenerType, ConnectorInfo, ConnectorListeners, DataFn};
//! use rtm_core::Sample;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let listeners = ConnectorListeners::<i32>::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//!
//! listeners.add_data_listener(
//!     ConnectorDataListenerType::OnBufferWrite,
//!     Arc::new(DataFn::new(move |_info: &ConnectorInfo, _s: &Sample<i32>| {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     })),
//!     true,
//! );
//!
//! let info = ConnectorInfo::new("c0", "id0");
//! listeners.notify_data(ConnectorDataListenerType::OnBufferWrite, &info, &Sample::new(1));
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//! ```
//!
//! # Thread Safety
//!
//! `notify` holds the holder mutex while callbacks run. A callback must not
//! add or remove listeners of the type it is being notified for.

use crate::properties::Properties;
use crate::sample::Sample;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Data-carrying listener events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorDataListenerType {
    OnBufferWrite,
    OnBufferFull,
    OnBufferWriteTimeout,
    OnBufferOverwrite,
    OnBufferRead,
    OnSend,
    OnReceived,
    OnReceiverFull,
    OnReceiverTimeout,
    OnReceiverError,
}

impl ConnectorDataListenerType {
    pub const COUNT: usize = 10;

    pub const ALL: [ConnectorDataListenerType; Self::COUNT] = [
        Self::OnBufferWrite,
        Self::OnBufferFull,
        Self::OnBufferWriteTimeout,
        Self::OnBufferOverwrite,
        Self::OnBufferRead,
        Self::OnSend,
        Self::OnReceived,
        Self::OnReceiverFull,
        Self::OnReceiverTimeout,
        Self::OnReceiverError,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferWrite => "ON_BUFFER_WRITE",
            Self::OnBufferFull => "ON_BUFFER_FULL",
            Self::OnBufferWriteTimeout => "ON_BUFFER_WRITE_TIMEOUT",
            Self::OnBufferOverwrite => "ON_BUFFER_OVERWRITE",
            Self::OnBufferRead => "ON_BUFFER_READ",
            Self::OnSend => "ON_SEND",
            Self::OnReceived => "ON_RECEIVED",
            Self::OnReceiverFull => "ON_RECEIVER_FULL",
            Self::OnReceiverTimeout => "ON_RECEIVER_TIMEOUT",
            Self::OnReceiverError => "ON_RECEIVER_ERROR",
        }
    }
}

impl fmt::Display for ConnectorDataListenerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection-level listener events (no sample attached).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorListenerType {
    OnBufferEmpty,
    OnBufferReadTimeout,
    OnSenderEmpty,
    OnSenderTimeout,
    OnSenderError,
    OnConnect,
    OnDisconnect,
}

impl ConnectorListenerType {
    pub const COUNT: usize = 7;

    pub const ALL: [ConnectorListenerType; Self::COUNT] = [
        Self::OnBufferEmpty,
        Self::OnBufferReadTimeout,
        Self::OnSenderEmpty,
        Self::OnSenderTimeout,
        Self::OnSenderError,
        Self::OnConnect,
        Self::OnDisconnect,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferEmpty => "ON_BUFFER_EMPTY",
            Self::OnBufferReadTimeout => "ON_BUFFER_READ_TIMEOUT",
            Self::OnSenderEmpty => "ON_SENDER_EMPTY",
            Self::OnSenderTimeout => "ON_SENDER_TIMEOUT",
            Self::OnSenderError => "ON_SENDER_ERROR",
            Self::OnConnect => "ON_CONNECT",
            Self::OnDisconnect => "ON_DISCONNECT",
        }
    }
}

impl fmt::Display for ConnectorListenerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one connection, shared with providers,
/// consumers and listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorInfo {
    pub name: String,
    pub id: String,
    /// Port names (endpoints) taking part in the connection.
    pub ports: Vec<String>,
    /// Full connector profile properties.
    pub properties: Properties,
}

impl ConnectorInfo {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ports: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_ports<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ports = ports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

/// Callback receiving the connector profile and a sample.
pub trait ConnectorDataListener<T>: Send + Sync {
    fn on_data(&self, info: &ConnectorInfo, sample: &Sample<T>);
}

/// Callback receiving the connector profile only.
pub trait ConnectorListener: Send + Sync {
    fn on_event(&self, info: &ConnectorInfo);
}

/// Closure adapter for [`ConnectorDataListener`].
pub struct DataFn<T, F> {
    callback: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F: Fn(&ConnectorInfo, &Sample<T>) + Send + Sync> DataFn<T, F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _phantom: PhantomData,
        }
    }
}

impl<T, F: Fn(&ConnectorInfo, &Sample<T>) + Send + Sync> ConnectorDataListener<T>
    for DataFn<T, F>
{
    fn on_data(&self, info: &ConnectorInfo, sample: &Sample<T>) {
        (self.callback)(info, sample);
    }
}

/// Closure adapter for [`ConnectorListener`].
pub struct EventFn<F>(pub F);

impl<F: Fn(&ConnectorInfo) + Send + Sync> ConnectorListener for EventFn<F> {
    fn on_event(&self, info: &ConnectorInfo) {
        (self.0)(info);
    }
}

/// Ordered list of `(listener, autoclean)` entries for one listener type.
///
/// `autoclean = true` entries belong to the holder and are released by
/// [`clear`](Self::clear) or drop. Caller-owned entries (`autoclean = false`)
/// survive `clear` and can be collected with
/// [`take_caller_owned`](Self::take_caller_owned).
pub struct ListenerHolder<L: ?Sized> {
    entries: Mutex<Vec<(Arc<L>, bool)>>,
}

impl<L: ?Sized> ListenerHolder<L> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append `listener`.
    pub fn add(&self, listener: Arc<L>, autoclean: bool) {
        self.entries.lock().push((listener, autoclean));
    }

    /// Remove the first entry that is the same object as `listener`.
    ///
    /// Returns the removed handle, `None` if it was not registered.
    pub fn remove(&self, listener: &Arc<L>) -> Option<Arc<L>> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|(l, _)| Arc::ptr_eq(l, listener))?;
        Some(entries.remove(pos).0)
    }

    /// Release every holder-owned entry; caller-owned entries stay.
    pub fn clear(&self) {
        self.entries.lock().retain(|(_, autoclean)| !*autoclean);
    }

    /// Detach and return every caller-owned entry.
    pub fn take_caller_owned(&self) -> Vec<Arc<L>> {
        let mut entries = self.entries.lock();
        let mut taken = Vec::new();
        entries.retain(|(l, autoclean)| {
            if *autoclean {
                true
            } else {
                taken.push(Arc::clone(l));
                false
            }
        });
        taken
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Run `f` on every entry in registration order, under the holder lock.
    pub fn for_each(&self, mut f: impl FnMut(&L)) {
        let entries = self.entries.lock();
        for (listener, _) in entries.iter() {
            f(listener);
        }
    }
}

impl<L: ?Sized> Default for ListenerHolder<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListenerHolder<dyn ConnectorDataListener<T>> {
    pub fn notify(&self, info: &ConnectorInfo, sample: &Sample<T>) {
        self.for_each(|l| l.on_data(info, sample));
    }
}

impl ListenerHolder<dyn ConnectorListener> {
    pub fn notify(&self, info: &ConnectorInfo) {
        self.for_each(|l| l.on_event(info));
    }
}

/// Full listener set of one port: one holder per listener type.
pub struct ConnectorListeners<T> {
    data: [ListenerHolder<dyn ConnectorDataListener<T>>; ConnectorDataListenerType::COUNT],
    connector: [ListenerHolder<dyn ConnectorListener>; ConnectorListenerType::COUNT],
}

impl<T> ConnectorListeners<T> {
    pub fn new() -> Self {
        Self {
            data: std::array::from_fn(|_| ListenerHolder::new()),
            connector: std::array::from_fn(|_| ListenerHolder::new()),
        }
    }

    /// Shared, empty listener set.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn data(
        &self,
        kind: ConnectorDataListenerType,
    ) -> &ListenerHolder<dyn ConnectorDataListener<T>> {
        &self.data[kind.index()]
    }

    pub fn connector(&self, kind: ConnectorListenerType) -> &ListenerHolder<dyn ConnectorListener> {
        &self.connector[kind.index()]
    }

    pub fn add_data_listener(
        &self,
        kind: ConnectorDataListenerType,
        listener: Arc<dyn ConnectorDataListener<T>>,
        autoclean: bool,
    ) {
        log::trace!("[ConnectorListeners] add {}", kind);
        self.data(kind).add(listener, autoclean);
    }

    pub fn remove_data_listener(
        &self,
        kind: ConnectorDataListenerType,
        listener: &Arc<dyn ConnectorDataListener<T>>,
    ) -> Option<Arc<dyn ConnectorDataListener<T>>> {
        self.data(kind).remove(listener)
    }

    pub fn add_listener(
        &self,
        kind: ConnectorListenerType,
        listener: Arc<dyn ConnectorListener>,
        autoclean: bool,
    ) {
        log::trace!("[ConnectorListeners] add {}", kind);
        self.connector(kind).add(listener, autoclean);
    }

    pub fn remove_listener(
        &self,
        kind: ConnectorListenerType,
        listener: &Arc<dyn ConnectorListener>,
    ) -> Option<Arc<dyn ConnectorListener>> {
        self.connector(kind).remove(listener)
    }

    #[inline]
    pub fn notify_data(
        &self,
        kind: ConnectorDataListenerType,
        info: &ConnectorInfo,
        sample: &Sample<T>,
    ) {
        self.data[kind.index()].notify(info, sample);
    }

    #[inline]
    pub fn notify(&self, kind: ConnectorListenerType, info: &ConnectorInfo) {
        self.connector[kind.index()].notify(info);
    }

    /// Release every holder-owned entry of every type.
    pub fn clear(&self) {
        self.data.iter().for_each(ListenerHolder::clear);
        self.connector.iter().for_each(ListenerHolder::clear);
    }
}

impl<T> Default for ConnectorListeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A connector's view of its port listeners: profile plus listener set.
///
/// Cheap to clone. An unset notifier (before `set_listener`) fires nothing.
pub struct Notifier<T> {
    inner: Option<(Arc<ConnectorInfo>, Arc<ConnectorListeners<T>>)>,
}

impl<T> Notifier<T> {
    pub fn new(info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) -> Self {
        Self {
            inner: Some((info, listeners)),
        }
    }

    /// Notifier that fires nothing.
    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn is_set(&self) -> bool {
        self.inner.is_some()
    }

    pub fn info(&self) -> Option<&Arc<ConnectorInfo>> {
        self.inner.as_ref().map(|(info, _)| info)
    }

    #[inline]
    pub fn data(&self, kind: ConnectorDataListenerType, sample: &Sample<T>) {
        if let Some((info, listeners)) = &self.inner {
            listeners.notify_data(kind, info, sample);
        }
    }

    #[inline]
    pub fn event(&self, kind: ConnectorListenerType) {
        if let Some((info, listeners)) = &self.inner {
            listeners.notify(kind, info);
        }
    }
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    ) -> Arc<dyn ConnectorDataListener<u8>> {
        let log = Arc::clone(log);
        Arc::new(DataFn::new(move |_: &ConnectorInfo, _: &Sample<u8>| {
            log.lock().push(tag)
        }))
    }

    #[test]
    fn test_registration_order_is_stable() {
        let listeners = ConnectorListeners::<u8>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["A", "B", "C"] {
            listeners.add_data_listener(
                ConnectorDataListenerType::OnReceived,
                recorder(&log, tag),
                true,
            );
        }
        let info = ConnectorInfo::new("c", "1");
        for _ in 0..3 {
            listeners.notify_data(ConnectorDataListenerType::OnReceived, &info, &Sample::new(0));
        }
        assert_eq!(*log.lock(), vec!["A", "B", "C", "A", "B", "C", "A", "B", "C"]);
    }

    #[test]
    fn test_types_are_independent() {
        let listeners = ConnectorListeners::<u8>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        listeners.add_data_listener(ConnectorDataListenerType::OnSend, recorder(&log, "send"), true);
        let info = ConnectorInfo::new("c", "1");
        listeners.notify_data(ConnectorDataListenerType::OnBufferWrite, &info, &Sample::new(0));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_remove_by_identity() {
        let holder: ListenerHolder<dyn ConnectorListener> = ListenerHolder::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let a: Arc<dyn ConnectorListener> = Arc::new(EventFn(move |_: &ConnectorInfo| {
            h.fetch_add(1, Ordering::Relaxed);
        }));
        let b: Arc<dyn ConnectorListener> = Arc::new(EventFn(|_: &ConnectorInfo| {}));
        holder.add(Arc::clone(&a), false);
        holder.add(Arc::clone(&b), true);

        assert!(holder.remove(&a).is_some());
        assert!(holder.remove(&a).is_none());
        holder.notify(&ConnectorInfo::default());
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(holder.len(), 1);
    }

    #[test]
    fn test_clear_keeps_caller_owned() {
        let holder: ListenerHolder<dyn ConnectorListener> = ListenerHolder::new();
        let owned: Arc<dyn ConnectorListener> = Arc::new(EventFn(|_: &ConnectorInfo| {}));
        holder.add(Arc::new(EventFn(|_: &ConnectorInfo| {})), true);
        holder.add(Arc::clone(&owned), false);

        holder.clear();
        assert_eq!(holder.len(), 1);

        let taken = holder.take_caller_owned();
        assert_eq!(taken.len(), 1);
        assert!(Arc::ptr_eq(&taken[0], &owned));
        assert!(holder.is_empty());
    }

    #[test]
    fn test_panicking_listener_propagates() {
        let listeners = ConnectorListeners::<u8>::new();
        listeners.add_listener(
            ConnectorListenerType::OnConnect,
            Arc::new(EventFn(|_: &ConnectorInfo| panic!("listener failed"))),
            true,
        );
        let info = ConnectorInfo::new("c", "1");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            listeners.notify(ConnectorListenerType::OnConnect, &info);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ConnectorDataListenerType::OnBufferOverwrite.as_str(), "ON_BUFFER_OVERWRITE");
        assert_eq!(ConnectorListenerType::OnDisconnect.to_string(), "ON_DISCONNECT");
        assert_eq!(ConnectorDataListenerType::ALL.len(), ConnectorDataListenerType::COUNT);
    }
}

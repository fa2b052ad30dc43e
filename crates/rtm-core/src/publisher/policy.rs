// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Push policies and the buffer-draining core shared by the asynchronous
//! publishers.
//!
//! | Policy | One wake delivers |
//! |---|---|
//! | `fifo` | the oldest unread sample |
//! | `all` | every unread sample, oldest first |
//! | `new` | only the newest sample; older ones are dropped |
//! | `skip` | every (n+1)-th sample, remainder carried to the next wake |
//!
//! A failed delivery leaves the undelivered sample in the buffer (except
//! under `new`, where older samples are already dropped) and is reported
//! through the receiver listeners.

use crate::buffer::{EmptyPolicy, SharedBuffer};
use crate::interface::InPortConsumer;
use crate::listener::{ConnectorDataListenerType as D, ConnectorListenerType as C, Notifier};
use crate::properties::{normalize, Properties};
use crate::sample::{PortData, Sample};
use crate::status::{BufferStatus, PortStatus};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Which buffered samples a wake delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushPolicy {
    All,
    Fifo,
    /// Deliver every `skip_count + 1`-th sample.
    Skip,
    #[default]
    New,
}

impl PushPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            PushPolicy::All => "all",
            PushPolicy::Fifo => "fifo",
            PushPolicy::Skip => "skip",
            PushPolicy::New => "new",
        }
    }
}

/// Parsed `publisher.push_policy` / `publisher.skip_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushConfig {
    pub policy: PushPolicy,
    pub skip_count: usize,
}

impl PushConfig {
    pub fn from_properties(props: &Properties) -> Self {
        let word = normalize(props.get_or("publisher.push_policy", "new"));
        let policy = match word.as_str() {
            "all" => PushPolicy::All,
            "fifo" => PushPolicy::Fifo,
            "skip" => PushPolicy::Skip,
            "new" => PushPolicy::New,
            other => {
                log::error!("[PushConfig] invalid push_policy '{}', using 'new'", other);
                PushPolicy::New
            }
        };
        let skip_count = match props.get("publisher.skip_count") {
            None => 0,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n >= 0 => n as usize,
                _ => {
                    log::error!("[PushConfig] invalid skip_count '{}', using 0", raw);
                    0
                }
            },
        };
        Self { policy, skip_count }
    }
}

/// What a wake does when the buffer holds nothing unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnEmpty {
    /// Return quietly.
    Idle,
    /// Re-send the last sample under a `readback` buffer, otherwise fire
    /// `OnBufferEmpty` + `OnSenderEmpty`.
    Report,
}

/// State shared between a publisher's writer side and its push task.
pub(crate) struct PushCore<T> {
    name: &'static str,
    consumer: RwLock<Option<Arc<dyn InPortConsumer<T>>>>,
    buffer: RwLock<Option<SharedBuffer<T>>>,
    notifier: RwLock<Notifier<T>>,
    config: RwLock<PushConfig>,
    retcode: Mutex<PortStatus>,
    /// Serializes pushes; holds the skip remainder.
    leftskip: Mutex<usize>,
}

impl<T: PortData> PushCore<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            consumer: RwLock::new(None),
            buffer: RwLock::new(None),
            notifier: RwLock::new(Notifier::none()),
            config: RwLock::new(PushConfig::default()),
            retcode: Mutex::new(PortStatus::Ok),
            leftskip: Mutex::new(0),
        }
    }

    pub(crate) fn set_config(&self, config: PushConfig) {
        log::debug!(
            "[{}] push_policy={} skip_count={}",
            self.name,
            config.policy.as_str(),
            config.skip_count
        );
        *self.config.write() = config;
    }

    pub(crate) fn config(&self) -> PushConfig {
        *self.config.read()
    }

    pub(crate) fn set_consumer(&self, consumer: Option<Arc<dyn InPortConsumer<T>>>) {
        *self.consumer.write() = consumer;
    }

    pub(crate) fn set_buffer(&self, buffer: Option<SharedBuffer<T>>) {
        *self.buffer.write() = buffer;
    }

    pub(crate) fn set_notifier(&self, notifier: Notifier<T>) {
        *self.notifier.write() = notifier;
    }

    pub(crate) fn retcode(&self) -> PortStatus {
        *self.retcode.lock()
    }

    /// Buffer the sample for the push task.
    ///
    /// `wake` runs after the sample is buffered (the asynchronous publisher
    /// signals its task there).
    pub(crate) fn write(
        &self,
        sample: &Sample<T>,
        timeout: Option<Duration>,
        wake: impl FnOnce(),
    ) -> PortStatus {
        let buffer = self.buffer.read().clone();
        let (Some(buffer), true) = (buffer, self.consumer.read().is_some()) else {
            return PortStatus::PreconditionNotMet;
        };
        let notifier = self.notifier.read().clone();

        let cached = self.retcode();
        if cached == PortStatus::ConnectionLost {
            log::debug!("[{}] write: connection lost", self.name);
            return cached;
        }

        let status = write_buffer(&buffer, sample, timeout, &notifier);
        wake();

        if matches!(cached, PortStatus::SendFull | PortStatus::BufferFull) {
            log::debug!("[{}] write: receiver full", self.name);
            return PortStatus::BufferFull;
        }
        convert_write(status, sample, &notifier)
    }

    /// Run the configured push policy once and cache its outcome.
    ///
    /// `ConnectionLost` is terminal: no further pushes are attempted.
    pub(crate) fn push(&self, on_empty: OnEmpty) -> PortStatus {
        let mut leftskip = self.leftskip.lock();
        if self.retcode() == PortStatus::ConnectionLost {
            return PortStatus::ConnectionLost;
        }
        let consumer = self.consumer.read().clone();
        let buffer = self.buffer.read().clone();
        let (Some(consumer), Some(buffer)) = (consumer, buffer) else {
            return PortStatus::PreconditionNotMet;
        };
        let notifier = self.notifier.read().clone();
        let ctx = PushContext {
            consumer: consumer.as_ref(),
            buffer: &buffer,
            notifier: &notifier,
        };

        let ret = if buffer.empty() {
            match on_empty {
                OnEmpty::Idle => return self.retcode(),
                OnEmpty::Report => ctx.on_empty(),
            }
        } else {
            let config = self.config();
            match config.policy {
                PushPolicy::All => ctx.push_all(),
                PushPolicy::Fifo => ctx.push_fifo(),
                PushPolicy::Skip => ctx.push_skip(config.skip_count, &mut leftskip),
                PushPolicy::New => ctx.push_new(),
            }
        };
        *self.retcode.lock() = ret;
        ret
    }
}

struct PushContext<'a, T> {
    consumer: &'a dyn InPortConsumer<T>,
    buffer: &'a SharedBuffer<T>,
    notifier: &'a Notifier<T>,
}

impl<T: PortData> PushContext<'_, T> {
    /// Deliver `sample` with the send-side listener sequence.
    fn send(&self, sample: &Sample<T>) -> PortStatus {
        self.notifier.data(D::OnBufferRead, sample);
        self.notifier.data(D::OnSend, sample);
        let ret = catch_unwind(AssertUnwindSafe(|| self.consumer.put(sample)))
            .unwrap_or(PortStatus::ConnectionLost);
        if ret.is_ok() {
            self.notifier.data(D::OnReceived, sample);
        } else {
            self.on_failure(ret, sample);
        }
        ret
    }

    fn on_failure(&self, ret: PortStatus, sample: &Sample<T>) {
        match ret {
            PortStatus::SendFull => self.notifier.data(D::OnReceiverFull, sample),
            PortStatus::SendTimeout => self.notifier.data(D::OnReceiverTimeout, sample),
            _ => self.notifier.data(D::OnReceiverError, sample),
        }
    }

    fn head(&self) -> Result<Sample<T>, PortStatus> {
        self.buffer.get().ok_or(PortStatus::PreconditionNotMet)
    }

    fn push_fifo(&self) -> PortStatus {
        let sample = match self.head() {
            Ok(s) => s,
            Err(e) => return e,
        };
        let ret = self.send(&sample);
        if ret.is_ok() {
            self.buffer.advance_rptr(1);
        }
        ret
    }

    fn push_all(&self) -> PortStatus {
        while self.buffer.readable() > 0 {
            let ret = self.push_fifo();
            if !ret.is_ok() {
                return ret;
            }
        }
        PortStatus::Ok
    }

    fn push_new(&self) -> PortStatus {
        let stale = self.buffer.readable().saturating_sub(1) as isize;
        self.buffer.advance_rptr(stale);
        self.push_fifo()
    }

    /// Only the samples readable on entry are consumed; later writes wait
    /// for the next wake.
    fn push_skip(&self, skipn: usize, leftskip: &mut usize) -> PortStatus {
        let readable = self.buffer.readable();
        let stride = skipn + 1;
        let preskip = readable + *leftskip;
        let loopcnt = preskip / stride;
        let mut postskip = skipn - (*leftskip).min(skipn);
        // Slots of the snapshot passed over so far.
        let mut consumed = 0;

        for i in 0..loopcnt {
            self.buffer.advance_rptr(postskip as isize);
            let ret = match self.head() {
                Ok(sample) => self.send(&sample),
                Err(e) => e,
            };
            if !ret.is_ok() {
                // Back to just after the last delivered sample.
                let back = if i == 0 { postskip } else { postskip - 1 };
                self.buffer.advance_rptr(-(back as isize));
                *leftskip = 0;
                return ret;
            }
            consumed += postskip;
            postskip = stride;
        }

        self.buffer.advance_rptr((readable - consumed) as isize);
        *leftskip = preskip % stride;
        PortStatus::Ok
    }

    fn on_empty(&self) -> PortStatus {
        if self.buffer.policy().empty == EmptyPolicy::Readback {
            if let Ok(sample) = self.buffer.read(None) {
                return self.send(&sample);
            }
        }
        self.notifier.event(C::OnBufferEmpty);
        self.notifier.event(C::OnSenderEmpty);
        PortStatus::BufferEmpty
    }
}

/// Store `sample` with the write-side listener sequence: `OnBufferWrite`,
/// then `OnBufferFull` + `OnBufferOverwrite` if an unread sample was
/// discarded to make room.
pub(crate) fn write_buffer<T: PortData>(
    buffer: &SharedBuffer<T>,
    sample: &Sample<T>,
    timeout: Option<Duration>,
    notifier: &Notifier<T>,
) -> BufferStatus {
    notifier.data(D::OnBufferWrite, sample);
    let (status, overwrote) = buffer.write_tracked(sample.clone(), timeout);
    if overwrote {
        notifier.data(D::OnBufferFull, sample);
        notifier.data(D::OnBufferOverwrite, sample);
    }
    status
}

/// Map a local buffer write status to a port status, firing write-side
/// listeners.
pub(crate) fn convert_write<T>(
    status: BufferStatus,
    sample: &Sample<T>,
    notifier: &Notifier<T>,
) -> PortStatus {
    match status {
        BufferStatus::Ok => PortStatus::Ok,
        BufferStatus::Full => {
            notifier.data(D::OnBufferFull, sample);
            PortStatus::BufferFull
        }
        BufferStatus::Timeout => {
            notifier.data(D::OnBufferWriteTimeout, sample);
            PortStatus::BufferTimeout
        }
        BufferStatus::PreconditionNotMet => PortStatus::PreconditionNotMet,
        BufferStatus::Empty | BufferStatus::Error => PortStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::interface::ChannelConsumer;
    use crossbeam::channel::Receiver;

    fn core_with(
        policy: &str,
        skip: Option<&str>,
        capacity: usize,
    ) -> (PushCore<u32>, SharedBuffer<u32>, Receiver<Sample<u32>>) {
        let mut props = Properties::from_pairs([("publisher.push_policy", policy)]);
        if let Some(n) = skip {
            props.set("publisher.skip_count", n);
        }
        let core = PushCore::new("test");
        core.set_config(PushConfig::from_properties(&props));
        let buffer: SharedBuffer<u32> = Arc::new(Buffer::new(64));
        let (consumer, rx) = ChannelConsumer::bounded(capacity);
        core.set_buffer(Some(Arc::clone(&buffer)));
        core.set_consumer(Some(Arc::new(consumer)));
        (core, buffer, rx)
    }

    fn fill(buffer: &SharedBuffer<u32>, values: impl IntoIterator<Item = u32>) {
        for v in values {
            buffer.write(Sample::new(v), None);
        }
    }

    fn received(rx: &Receiver<Sample<u32>>) -> Vec<u32> {
        rx.try_iter().map(Sample::into_payload).collect()
    }

    #[test]
    fn test_config_defaults_and_fallbacks() {
        assert_eq!(PushConfig::from_properties(&Properties::new()).policy, PushPolicy::New);
        let bad = Properties::from_pairs([
            ("publisher.push_policy", "random"),
            ("publisher.skip_count", "-3"),
        ]);
        let cfg = PushConfig::from_properties(&bad);
        assert_eq!(cfg.policy, PushPolicy::New);
        assert_eq!(cfg.skip_count, 0);
        let upper = Properties::from_pairs([("publisher.push_policy", " FIFO ")]);
        assert_eq!(PushConfig::from_properties(&upper).policy, PushPolicy::Fifo);
    }

    #[test]
    fn test_fifo_one_per_wake() {
        let (core, buffer, rx) = core_with("fifo", None, 16);
        fill(&buffer, [1, 2, 3]);
        core.push(OnEmpty::Idle);
        assert_eq!(received(&rx), vec![1]);
        core.push(OnEmpty::Idle);
        core.push(OnEmpty::Idle);
        assert_eq!(received(&rx), vec![2, 3]);
        assert!(buffer.empty());
    }

    #[test]
    fn test_all_drains() {
        let (core, buffer, rx) = core_with("all", None, 16);
        fill(&buffer, [1, 2, 3, 4]);
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::Ok);
        assert_eq!(received(&rx), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_new_delivers_latest_only() {
        let (core, buffer, rx) = core_with("new", None, 16);
        fill(&buffer, [1, 2, 3, 4, 5]);
        core.push(OnEmpty::Idle);
        assert_eq!(received(&rx), vec![5]);
        assert!(buffer.empty());
    }

    #[test]
    fn test_skip_stride_across_wakes() {
        let (core, buffer, rx) = core_with("skip", Some("2"), 64);
        fill(&buffer, 1..=7);
        core.push(OnEmpty::Idle);
        fill(&buffer, 8..=12);
        core.push(OnEmpty::Idle);
        assert_eq!(received(&rx), vec![3, 6, 9, 12]);
    }

    /// Consumer that appends a fresh sample to the buffer on every put,
    /// as a writer running alongside the push would.
    struct WritingConsumer {
        buffer: SharedBuffer<u32>,
        next: Mutex<u32>,
        delivered: Mutex<Vec<u32>>,
    }

    impl InPortConsumer<u32> for WritingConsumer {
        fn subscribe_interface(&self, _props: &Properties) -> bool {
            true
        }
        fn unsubscribe_interface(&self, _props: &Properties) {}
        fn put(&self, sample: &Sample<u32>) -> PortStatus {
            let mut next = self.next.lock();
            self.buffer.write(Sample::new(*next), None);
            *next += 1;
            self.delivered.lock().push(sample.payload);
            PortStatus::Ok
        }
    }

    #[test]
    fn test_skip_keeps_samples_written_during_push() {
        let core: PushCore<u32> = PushCore::new("test");
        core.set_config(PushConfig {
            policy: PushPolicy::Skip,
            skip_count: 2,
        });
        let buffer: SharedBuffer<u32> = Arc::new(Buffer::new(64));
        let consumer = Arc::new(WritingConsumer {
            buffer: Arc::clone(&buffer),
            next: Mutex::new(100),
            delivered: Mutex::new(Vec::new()),
        });
        core.set_buffer(Some(Arc::clone(&buffer)));
        core.set_consumer(Some(Arc::clone(&consumer) as Arc<dyn InPortConsumer<u32>>));

        fill(&buffer, 1..=6);
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::Ok);
        assert_eq!(*consumer.delivered.lock(), vec![3, 6]);
        assert_eq!(*core.leftskip.lock(), 0);
        // 100 and 101 arrived mid-push and wait for the next wake.
        assert_eq!(buffer.readable(), 2);
        assert_eq!(buffer.get().map(Sample::into_payload), Some(100));
    }

    #[test]
    fn test_skip_failure_resets_remainder() {
        let (core, buffer, rx) = core_with("skip", Some("2"), 1);
        fill(&buffer, 1..=7);
        // Channel holds one sample: 3 is delivered, 6 is refused.
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::SendFull);
        assert_eq!(*core.leftskip.lock(), 0);
        assert_eq!(received(&rx), vec![3]);
        // Rewound to just after 3; the refused 6 stays unread.
        assert_eq!(buffer.readable(), 4);
        assert_eq!(buffer.get().map(Sample::into_payload), Some(4));
    }

    #[test]
    fn test_skip_zero_is_fifo_drain() {
        let (core, buffer, rx) = core_with("skip", Some("0"), 64);
        fill(&buffer, 1..=4);
        core.push(OnEmpty::Idle);
        assert_eq!(received(&rx), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_send_full_keeps_sample() {
        let (core, buffer, rx) = core_with("fifo", None, 1);
        fill(&buffer, [1, 2]);
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::Ok);
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::SendFull);
        assert_eq!(core.retcode(), PortStatus::SendFull);
        assert_eq!(buffer.readable(), 1);
        assert_eq!(received(&rx), vec![1]);
        assert_eq!(core.push(OnEmpty::Idle), PortStatus::Ok);
        assert_eq!(core.retcode(), PortStatus::Ok);
        assert_eq!(received(&rx), vec![2]);
    }

    #[test]
    fn test_empty_report_and_readback() {
        let (core, buffer, rx) = core_with("new", None, 16);
        assert_eq!(core.push(OnEmpty::Report), PortStatus::BufferEmpty);

        buffer.init(&Properties::from_pairs([("read.empty_policy", "readback")]));
        fill(&buffer, [7]);
        core.push(OnEmpty::Report);
        assert_eq!(core.push(OnEmpty::Report), PortStatus::Ok);
        assert_eq!(received(&rx), vec![7, 7]);
    }

    #[test]
    fn test_write_without_consumer_is_precondition() {
        let core: PushCore<u32> = PushCore::new("test");
        core.set_buffer(Some(Arc::new(Buffer::new(4))));
        assert_eq!(
            core.write(&Sample::new(1), None, || {}),
            PortStatus::PreconditionNotMet
        );
    }
}

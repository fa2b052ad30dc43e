// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event-driven asynchronous publisher.
//!
//! `write` buffers the sample and signals a suspended [`PeriodicTask`]; the
//! task runs the push policy once per signal (signals are counted).
//! An empty buffer on wake is not an error.

use super::policy::{OnEmpty, PushConfig, PushCore};
use super::Publisher;
use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::interface::InPortConsumer;
use crate::listener::{ConnectorInfo, ConnectorListeners, Notifier};
use crate::properties::Properties;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use crate::task::{PeriodicTask, Statistics};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct PublisherNew<T> {
    core: Arc<PushCore<T>>,
    task: PeriodicTask,
    active: AtomicBool,
}

impl<T: PortData> PublisherNew<T> {
    pub fn new() -> Self {
        Self {
            core: Arc::new(PushCore::new("PublisherNew")),
            task: PeriodicTask::new("rtm-publisher-new"),
            active: AtomicBool::new(false),
        }
    }

    pub fn push_config(&self) -> PushConfig {
        self.core.config()
    }

    /// Timing of the push task, when `measurement.exec_time` is enabled.
    pub fn execution_statistics(&self) -> Option<Statistics> {
        self.task.execution_statistics()
    }
}

impl<T: PortData> Default for PublisherNew<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PortData> Publisher<T> for PublisherNew<T> {
    fn init(&self, props: &Properties) -> Result<()> {
        log::trace!("[PublisherNew::init]");
        self.core.set_config(PushConfig::from_properties(props));

        let core = Arc::clone(&self.core);
        self.task.set_task(move || {
            core.push(OnEmpty::Idle);
        });
        self.task.set_period(Duration::ZERO);
        self.task.configure_measurement(props);
        self.task.suspend();
        self.task.activate()
    }

    fn set_consumer(&self, consumer: Arc<dyn InPortConsumer<T>>) {
        self.core.set_consumer(Some(consumer));
    }

    fn set_buffer(&self, buffer: SharedBuffer<T>) {
        self.core.set_buffer(Some(buffer));
    }

    fn set_listener(&self, info: Arc<ConnectorInfo>, listeners: Arc<ConnectorListeners<T>>) {
        self.core.set_notifier(Notifier::new(info, listeners));
    }

    fn write(&self, sample: &Sample<T>, timeout: Option<Duration>) -> PortStatus {
        self.core.write(sample, timeout, || self.task.signal())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn activate(&self) -> PortStatus {
        self.active.store(true, Ordering::Release);
        PortStatus::Ok
    }

    fn deactivate(&self) -> PortStatus {
        self.active.store(false, Ordering::Release);
        PortStatus::Ok
    }

    fn finalize(&self) {
        self.active.store(false, Ordering::Release);
        self.task.finalize();
        self.core.set_consumer(None);
        self.core.set_buffer(None);
        log::debug!("[PublisherNew::finalize] done");
    }
}

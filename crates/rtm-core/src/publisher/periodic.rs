// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rate-driven asynchronous publisher.
//!
//! A [`PeriodicTask`] runs the push policy every `1 / publisher.push_rate`
//! seconds while the publisher is active. A tick on an empty buffer fires
//! `OnBufferEmpty` + `OnSenderEmpty`, or re-sends the last sample when the
//! buffer's read policy is `readback`.

use super::policy::{OnEmpty, PushConfig, PushCore};
use super::Publisher;
use crate::buffer::SharedBuffer;
use crate::error::{Error, Result};
use crate::interface::InPortConsumer;
use crate::listener::{ConnectorInfo, ConnectorListeners, Notifier};
use crate::properties::Properties;
use crate::sample::{PortData, Sample};
use crate::status::PortStatus;
use crate::task::{period_from_rate, PeriodicTask, Statistics};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct PublisherPeriodic<T> {
    core: Arc<PushCore<T>>,
    task: PeriodicTask,
    active: AtomicBool,
}

impl<T: PortData> PublisherPeriodic<T> {
    pub fn new() -> Self {
        Self {
            core: Arc::new(PushCore::new("PublisherPeriodic")),
            task: PeriodicTask::new("rtm-publisher-periodic"),
            active: AtomicBool::new(false),
        }
    }

    pub fn push_config(&self) -> PushConfig {
        self.core.config()
    }

    pub fn period(&self) -> Duration {
        self.task.period()
    }

    pub fn execution_statistics(&self) -> Option<Statistics> {
        self.task.execution_statistics()
    }

    pub fn period_statistics(&self) -> Option<Statistics> {
        self.task.period_statistics()
    }
}

impl<T: PortData> Default for PublisherPeriodic<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// `publisher.push_rate` (or bare `push_rate`) in Hz, with its period.
fn push_rate(props: &Properties) -> Result<(f64, Duration)> {
    let raw = props
        .get("publisher.push_rate")
        .filter(|v| !v.trim().is_empty())
        .or_else(|| props.get("push_rate"))
        .ok_or_else(|| Error::InvalidArgs("publisher.push_rate is required".into()))?;
    match raw.trim().parse::<f64>() {
        Ok(rate) => period_from_rate(rate)
            .map(|period| (rate, period))
            .ok_or_else(|| Error::InvalidArgs(format!("invalid push_rate '{}'", raw))),
        Err(_) => Err(Error::InvalidArgs(format!("invalid push_rate '{}'", raw))),
    }
}

impl<T: PortData> Publisher<T> for PublisherPeriodic<T> {
    fn init(&self, props: &Properties) -> Result<()> {
        log::trace!("[PublisherPeriodic::init]");
        let (rate, period) = push_rate(props).map_err(|e| {
            log::error!("[PublisherPeriodic::init] {}", e);
            e
        })?;
        self.core.set_config(PushConfig::from_properties(props));

        let core = Arc::clone(&self.core);
        self.task.set_task(move || {
            core.push(OnEmpty::Report);
        });
        self.task.set_period(period);
        self.task.configure_measurement(props);
        self.task.suspend();
        self.task.activate()?;
        log::debug!("[PublisherPeriodic::init] push_rate={} Hz", rate);
        Ok(())
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
        self.core.write(sample, timeout, || {})
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn activate(&self) -> PortStatus {
        if self.active.swap(true, Ordering::AcqRel) {
            return PortStatus::PreconditionNotMet;
        }
        self.task.resume();
        PortStatus::Ok
    }

    fn deactivate(&self) -> PortStatus {
        if !self.active.swap(false, Ordering::AcqRel) {
            return PortStatus::PreconditionNotMet;
        }
        self.task.suspend();
        PortStatus::Ok
    }

    fn finalize(&self) {
        self.active.store(false, Ordering::Release);
        self.task.finalize();
        self.core.set_consumer(None);
        self.core.set_buffer(None);
        log::debug!("[PublisherPeriodic::finalize] done");
    }
}

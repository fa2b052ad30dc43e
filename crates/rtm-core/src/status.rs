// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status codes exchanged across the buffer, port and execution-context
//! boundaries.
//!
//! These are closed enums: a remoting layer in front of the engine can map
//! them one-to-one onto its own wire representation.

use std::fmt;

/// Outcome of a buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferStatus {
    Ok,
    /// Nothing unread (read under `do_nothing`).
    Empty,
    /// No free slot (write under `do_nothing`).
    Full,
    /// Blocking policy deadline expired.
    Timeout,
    /// Cursor moved out of range, or buffer misconfigured.
    PreconditionNotMet,
    Error,
}

impl BufferStatus {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == BufferStatus::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BufferStatus::Ok => "BUFFER_OK",
            BufferStatus::Empty => "BUFFER_EMPTY",
            BufferStatus::Full => "BUFFER_FULL",
            BufferStatus::Timeout => "TIMEOUT",
            BufferStatus::PreconditionNotMet => "PRECONDITION_NOT_MET",
            BufferStatus::Error => "BUFFER_ERROR",
        }
    }
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a data-port operation (connector, publisher, provider, consumer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStatus {
    Ok,
    Error,
    /// Local buffer full.
    BufferFull,
    /// Local buffer empty.
    BufferEmpty,
    /// Local buffer blocking policy timed out.
    BufferTimeout,
    /// Remote side reported its buffer full.
    SendFull,
    /// Remote side timed out.
    SendTimeout,
    /// Remote side unreachable; cached until the connector is rebuilt.
    ConnectionLost,
    /// Required collaborator unset or connector already torn down.
    PreconditionNotMet,
    UnknownError,
}

impl PortStatus {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == PortStatus::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortStatus::Ok => "PORT_OK",
            PortStatus::Error => "PORT_ERROR",
            PortStatus::BufferFull => "BUFFER_FULL",
            PortStatus::BufferEmpty => "BUFFER_EMPTY",
            PortStatus::BufferTimeout => "BUFFER_TIMEOUT",
            PortStatus::SendFull => "SEND_FULL",
            PortStatus::SendTimeout => "SEND_TIMEOUT",
            PortStatus::ConnectionLost => "CONNECTION_LOST",
            PortStatus::PreconditionNotMet => "PRECONDITION_NOT_MET",
            PortStatus::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BufferStatus> for PortStatus {
    /// Local-buffer view of a buffer status (used by writers and readers of
    /// their own connector buffer).
    fn from(status: BufferStatus) -> Self {
        match status {
            BufferStatus::Ok => PortStatus::Ok,
            BufferStatus::Empty => PortStatus::BufferEmpty,
            BufferStatus::Full => PortStatus::BufferFull,
            BufferStatus::Timeout => PortStatus::BufferTimeout,
            BufferStatus::PreconditionNotMet => PortStatus::PreconditionNotMet,
            BufferStatus::Error => PortStatus::Error,
        }
    }
}

/// Return code of RT-Component actions and execution-context requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnCode {
    #[default]
    Ok,
    Error,
    BadParameter,
    Unsupported,
    OutOfResources,
    PreconditionNotMet,
}

impl ReturnCode {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReturnCode::Ok => "RTC_OK",
            ReturnCode::Error => "RTC_ERROR",
            ReturnCode::BadParameter => "BAD_PARAMETER",
            ReturnCode::Unsupported => "UNSUPPORTED",
            ReturnCode::OutOfResources => "OUT_OF_RESOURCES",
            ReturnCode::PreconditionNotMet => "PRECONDITION_NOT_MET",
        };
        f.write_str(s)
    }
}

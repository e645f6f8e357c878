// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Job status

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

/// Job status
///
/// Jobs move forward through `Unknown -> ToDo -> Enqueued -> Encoded ->
/// Sent -> Answered`. `Error` may be entered from any other status and is
/// never left.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    num_enum::TryFromPrimitive,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    #[default]
    Unknown = 0x00,
    ToDo = 0x01,
    Enqueued = 0x02,
    Encoded = 0x03,
    Sent = 0x04,
    Answered = 0x05,
    Error = 0xff,
}

impl JobStatus {
    /// Check whether moving from `self` to `next` is a valid transition
    ///
    /// Re-entering the current status is not a transition.
    pub fn can_transition(&self, next: JobStatus) -> bool {
        match (*self, next) {
            (a, b) if a == b => false,
            (JobStatus::Error, _) => false,
            (_, JobStatus::Error) => true,
            (a, b) => (b as u8) > (a as u8),
        }
    }
}

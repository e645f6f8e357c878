// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::fmt;

use chrono::{DateTime, Local};
use log::Level;

/// Entry in a job's cumulative log
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub level: Level,
    pub timestamp: DateTime<Local>,
    pub provider: String,
    pub text: String,
}

impl LogEntry {
    pub fn new(level: Level, provider: &str, text: &str) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            provider: provider.to_string(),
            text: text.to_string(),
        }
    }
}

/// Renders as `LL:YYYYMMDD:hhmmss:provider:text`
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{}:{}:{}",
            self.level as usize,
            self.timestamp.format("%Y%m%d:%H%M%S"),
            self.provider,
            self.text
        )
    }
}

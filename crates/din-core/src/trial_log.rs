//! Structured trial log: one JSON object per line.

use crate::error::DinResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Events emitted over the course of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrialEvent {
    StimulusPresented {
        trial: usize,
        prompt: String,
        snr_db: f64,
    },
    ResponseReceived {
        trial: usize,
        response: String,
        /// Set when capture failed and the trial was scored incorrect.
        error: Option<String>,
    },
    AnswerScored {
        trial: usize,
        correct: bool,
        correct_count: u32,
        incorrect_count: u32,
    },
    SnrChanged {
        trial: usize,
        from_db: f64,
        to_db: f64,
        reversal_count: u32,
    },
    TestFinished {
        trials: usize,
        srt_db: f64,
        reversals: Vec<f64>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TrialEvent,
}

/// Appends `LogLine`s to a file. A disabled log drops everything.
pub struct TrialLog {
    writer: Option<BufWriter<File>>,
}

impl TrialLog {
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Open (append) a JSON-lines log, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> DinResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record(&mut self, event: TrialEvent) -> DinResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let line = LogLine {
            timestamp: Utc::now(),
            event,
        };
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

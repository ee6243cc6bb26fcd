// src/logging.rs
use crate::types::UiEvent;
use anyhow::Result;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Sink for the messages a session emits.
pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl EventLog for TracingLog {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Keeps every line in memory. Used by tests to assert on what was logged.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: Level) -> usize {
        self.lines()
            .iter()
            .filter(|(lvl, _)| *lvl == level)
            .count()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl EventLog for MemoryLog {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

/// Pushes lines to the dashboard. Drops them when the channel is full.
pub struct ChannelLog {
    sender: mpsc::Sender<UiEvent>,
}

impl ChannelLog {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, line: String) {
        match self.sender.try_send(UiEvent::Log(line)) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("UI Channel closed! Interface is likely dead.");
            }
        }
    }
}

impl EventLog for ChannelLog {
    fn info(&self, message: &str) {
        info!("{}", message);
        self.send(format!("INFO  {}", message));
    }

    fn error(&self, message: &str) {
        error!("{}", message);
        self.send(format!("ERROR {}", message));
    }
}

/// Installs the global subscriber writing to `<dir>/binary_sim.log`.
/// The returned guard must stay alive for the writer to flush.
pub fn init_tracing(dir: impl AsRef<Path>) -> Result<WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, "binary_sim.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}

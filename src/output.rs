use std::io::{self, Write};

use serde::Serialize;

use crate::stats::Summary;
use crate::sync::{DatasetStatus, SyncEvent, SyncSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub dataset: String,
    pub title: String,
    pub summary: Summary,
    pub sentence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub refreshed: Vec<String>,
    pub failed: Vec<FailedRefresh>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRefresh {
    pub dataset: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub email: String,
    pub authorized: bool,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_status(result: &[DatasetStatus]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_summary(result: &SummaryResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_refresh(result: &RefreshResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_login(result: &LoginResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl SyncSink for JsonOutput {
    fn event(&self, _event: SyncEvent) {}
}

/// Prints one short line per sync event to stderr.
pub struct StatusLines;

impl StatusLines {
    pub fn render(event: &SyncEvent) -> String {
        match event {
            SyncEvent::CacheLoaded { name, rows } => format!("cache   {name}: {rows} rows"),
            SyncEvent::CacheMiss { name } => format!("cache   {name}: not stored yet"),
            SyncEvent::CacheReadFailed { name, message } => {
                format!("cache   {name}: unreadable ({message})")
            }
            SyncEvent::Fetched { name, rows } => format!("network {name}: {rows} rows"),
            SyncEvent::FetchFailed { name, message } => {
                format!("network {name}: failed ({message}); keeping previous data")
            }
            SyncEvent::CacheWriteFailed { name, message } => {
                format!("cache   {name}: not saved ({message})")
            }
            SyncEvent::Reconnected => "online again, refreshing".to_string(),
            SyncEvent::NoConnectivity => {
                "No internet connection. Please connect to the internet to refresh data."
                    .to_string()
            }
            SyncEvent::Ready => "all datasets ready".to_string(),
        }
    }
}

impl SyncSink for StatusLines {
    fn event(&self, event: SyncEvent) {
        let _ = writeln!(io::stderr(), "{}", Self::render(&event));
    }
}

//! Media sync progress reporting.
//!
//! Reports observable progress during `portal media sync` so operators see
//! which table is being scanned and how many downloads are left. Progress
//! is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use clap::ValueEnum;

/// A single progress event for the sync pass.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// Scanning a content table for upload references. Total unknown.
    Collecting { table: String },
    /// Processing reference `n` of `total`.
    Fetching { path: String, n: u64, total: u64 },
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the sync pipeline.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync media  fetching  12 / 1,024  /uploads/a.png".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Collecting { table } => {
                format!("sync media  scanning {}...\n", table)
            }
            SyncProgressEvent::Fetching { path, n, total } => format!(
                "sync media  fetching  {} / {}  {}\n",
                format_number(*n),
                format_number(*total),
                path
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Collecting { table } => serde_json::json!({
                "event": "progress",
                "phase": "collecting",
                "table": table,
            }),
            SyncProgressEvent::Fetching { path, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "path": path,
                "n": n,
                "total": total,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12345), "12,345");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn progress_mode_values() {
        assert_eq!(
            ProgressMode::from_str("json", true).unwrap(),
            ProgressMode::Json
        );
        assert!(ProgressMode::from_str("loud", true).is_err());
    }
}

//! Terminal rendering of progress events for foreground CLI runs

use std::future::Future;
use std::io::Write;

use super::{ProgressEvent, Subscription};
use crate::utils::format_file_size;
use crate::utils::time::format_timestamp;

const BAR_LENGTH: usize = 20;

/// Prints events either as human-readable lines or as JSON lines
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    json: bool,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool, verbose: bool) -> Self {
        Self { json, verbose }
    }

    /// Render one event, or `None` when it is not shown in this mode
    pub fn render(&self, event: &ProgressEvent) -> Option<String> {
        if self.json {
            return Some(self.render_json(event));
        }

        match event {
            ProgressEvent::Connected => None,
            ProgressEvent::Start { total } => Some(format!("🚀 Cutting {} segment(s)", total)),
            ProgressEvent::Progress { percent, .. } => {
                let filled = (*percent as usize * BAR_LENGTH / 100).min(BAR_LENGTH);
                let bar = "█".repeat(filled) + &"░".repeat(BAR_LENGTH - filled);
                Some(format!("🔄 [{}] {:>3}%", bar, percent))
            }
            ProgressEvent::Merge => Some("🔗 Merging parts".to_string()),
            ProgressEvent::Complete {
                output,
                size,
                duration,
            } => Some(format!(
                "✅ Wrote {} ({}, {})",
                output.display(),
                format_file_size(*size),
                format_timestamp(*duration)
            )),
            ProgressEvent::Error { message } => Some(format!("❌ Error: {}", message)),
            ProgressEvent::Info { message } if self.verbose => Some(format!("ℹ️  {}", message)),
            ProgressEvent::Info { .. } => None,
        }
    }

    fn render_json(&self, event: &ProgressEvent) -> String {
        let mut value = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value.to_string()
    }

    /// Print one event if it is shown in this mode
    pub fn print(&self, event: &ProgressEvent) {
        if let Some(line) = self.render(event) {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
        }
    }

    /// Drive `job` to completion, printing events as they arrive
    pub async fn report_while<F: Future>(&self, mut subscription: Subscription, job: F) -> F::Output {
        tokio::pin!(job);
        let output = loop {
            tokio::select! {
                output = &mut job => break output,
                Some(event) = subscription.recv() => self.print(&event),
            }
        };
        // events broadcast in the job's final poll are already queued
        for event in subscription.drain() {
            self.print(&event);
        }
        output
    }
}

//! Progress reporting
//!
//! The destroy engine reports every teardown and destroy it performs through a
//! [`ProgressSink`]. Reporting never fails the operation: write errors are
//! dropped.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use console::style;
use serde::Serialize;

/// What happened to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressVerb {
    /// Torn down, waiting for finalizers
    TornDown,
    /// Physically removed
    Destroyed,
}

impl fmt::Display for ProgressVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressVerb::TornDown => write!(f, "torn down"),
            ProgressVerb::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub verb: ProgressVerb,
    pub resource_type: String,
    pub id: String,
}

impl ProgressEvent {
    pub fn new(verb: ProgressVerb, resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            verb,
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn torn_down(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(ProgressVerb::TornDown, resource_type, id)
    }

    pub fn destroyed(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(ProgressVerb::Destroyed, resource_type, id)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb, self.resource_type, self.id)
    }
}

/// Receives progress from a destroy operation
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// One styled line per event
pub struct ConsoleProgress {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleProgress {
    /// Create a reporter that writes to stdout
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Create a reporter that writes to a custom writer (for testing)
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: &ProgressEvent) {
        let verb = match event.verb {
            ProgressVerb::TornDown => style(event.verb).yellow(),
            ProgressVerb::Destroyed => style(event.verb).green(),
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(
                writer,
                "{} {} {}",
                verb,
                style(&event.resource_type).bold(),
                event.id
            );
        }
    }
}

/// One JSON object per line
pub struct JsonProgress {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonProgress {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl ProgressSink for JsonProgress {
    fn report(&self, event: &ProgressEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietProgress;

impl ProgressSink for QuietProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events reported so far, in order
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// IDs reported with the given verb, in order
    pub fn ids(&self, verb: ProgressVerb) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.verb == verb)
            .map(|event| event.id)
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer whose contents outlive the sink
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_event_display() {
        let event = ProgressEvent::torn_down("ClusterMachines", "m1");
        assert_eq!(event.to_string(), "torn down ClusterMachines m1");
    }

    #[test]
    fn test_console_lines() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleProgress::with_writer(buffer.clone());

        sink.report(&ProgressEvent::torn_down("ClusterMachines", "m1"));
        sink.report(&ProgressEvent::destroyed("ClusterMachines", "m1"));

        let output = console::strip_ansi_codes(&buffer.contents()).to_string();
        assert_eq!(
            output,
            "torn down ClusterMachines m1\ndestroyed ClusterMachines m1\n"
        );
    }

    #[test]
    fn test_json_lines() {
        let buffer = SharedBuffer::default();
        let sink = JsonProgress::with_writer(buffer.clone());

        sink.report(&ProgressEvent::destroyed("Links", "l1"));

        insta::assert_snapshot!(buffer.contents().trim_end(), @r#"{"verb":"destroyed","resourceType":"Links","id":"l1"}"#);
    }

    #[test]
    fn test_recording() {
        let sink = RecordingProgress::new();
        sink.report(&ProgressEvent::torn_down("Links", "a"));
        sink.report(&ProgressEvent::destroyed("Links", "b"));
        sink.report(&ProgressEvent::destroyed("Links", "a"));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.ids(ProgressVerb::Destroyed), vec!["b", "a"]);
        assert_eq!(sink.ids(ProgressVerb::TornDown), vec!["a"]);
    }

    #[test]
    fn test_quiet_accepts_anything() {
        QuietProgress.report(&ProgressEvent::destroyed("Links", "a"));
    }
}

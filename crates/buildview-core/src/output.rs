//! Minimal model of a build's live output.
//!
//! Consumes raw event-stream envelopes, keeps the log text, and reports the
//! one thing the controller cares about: status transitions.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use super::routes::build_events_path;
use super::state::Build;
use super::state::BuildId;
use super::state::BuildStatus;

/// One message from the build's event stream, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Opened,
    Errored,
    Event(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum BuildEvent {
    Status {
        status: BuildStatus,
        time: i64,
    },
    Log {
        payload: String,
        #[serde(default)]
        origin: Option<String>,
    },
    Error {
        message: String,
    },
    End,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSignal {
    None,
    StatusChanged {
        status: BuildStatus,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamConnection {
    Connecting,
    Connected,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub origin: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub build_id: BuildId,
    event_source_path: String,
    pub connection: StreamConnection,
    pub lines: Vec<LogLine>,
    pub errors: Vec<String>,
    pub ended: bool,
    line_open: bool,
}

impl Output {
    pub fn init(build: &Build) -> Self {
        Self {
            build_id: build.id,
            event_source_path: build_events_path(build.id),
            connection: StreamConnection::Connecting,
            lines: Vec::new(),
            errors: Vec::new(),
            ended: false,
            line_open: false,
        }
    }

    pub fn event_source_path(&self) -> &str {
        &self.event_source_path
    }

    pub fn handle_envelope(&mut self, envelope: &Envelope) -> OutputSignal {
        match envelope {
            Envelope::Opened => {
                self.connection = StreamConnection::Connected;
                OutputSignal::None
            }
            Envelope::Errored => {
                self.connection = StreamConnection::Errored;
                OutputSignal::None
            }
            Envelope::Event(data) => match serde_json::from_str::<BuildEvent>(data) {
                Ok(event) => self.handle_event(event),
                Err(err) => {
                    warn!(build = %self.build_id, %err, "undecodable build event");
                    self.errors.push(format!("undecodable event: {err}"));
                    OutputSignal::None
                }
            },
        }
    }

    fn handle_event(&mut self, event: BuildEvent) -> OutputSignal {
        match event {
            BuildEvent::Status { status, time } => match DateTime::from_timestamp(time, 0) {
                Some(at) => OutputSignal::StatusChanged { status, at },
                None => {
                    warn!(build = %self.build_id, time, "status event with invalid time");
                    OutputSignal::None
                }
            },
            BuildEvent::Log { payload, origin } => {
                self.append_log(origin, &payload);
                OutputSignal::None
            }
            BuildEvent::Error { message } => {
                self.errors.push(message);
                OutputSignal::None
            }
            BuildEvent::End => {
                self.ended = true;
                OutputSignal::None
            }
            BuildEvent::Unknown => OutputSignal::None,
        }
    }

    fn append_log(&mut self, origin: Option<String>, payload: &str) {
        for (idx, chunk) in payload.split('\n').enumerate() {
            let continues = idx == 0 && self.line_open;
            match self.lines.last_mut() {
                Some(last) if continues && last.origin == origin => last.text.push_str(chunk),
                _ => self.lines.push(LogLine {
                    origin: origin.clone(),
                    text: chunk.to_string(),
                }),
            }
        }
        self.line_open = !payload.ends_with('\n');
        if !self.line_open {
            // split leaves an empty tail after a trailing newline
            if self.lines.last().is_some_and(|line| line.text.is_empty()) {
                self.lines.pop();
            }
        }
    }
}

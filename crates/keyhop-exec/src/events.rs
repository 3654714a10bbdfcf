//! Progress events emitted while a session runs
//!
//! Events are informational only: they never influence the returned result, and a sink
//! with no receivers simply drops them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Sender side of the progress channel
pub type ProgressSink = broadcast::Sender<ProgressEvent>;

/// Which output stream a chunk arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    KeyStaged,
    Connected {
        target: String,
    },
    Executing {
        command: String,
    },
    Output {
        command: String,
        stream: OutputStream,
        chunk: String,
    },
    Exited {
        command: String,
        exit_code: Option<i32>,
        signal: Option<String>,
    },
    IncompleteResult {
        command: String,
    },
    Rejected {
        command: String,
        reason: String,
    },
    DirectoryEnsured {
        path: String,
    },
    Uploading {
        path: String,
        bytes: usize,
    },
    CleaningUp,
}

/// Create a progress channel
#[must_use]
pub fn channel(capacity: usize) -> (ProgressSink, broadcast::Receiver<ProgressEvent>) {
    broadcast::channel(capacity)
}

pub(crate) fn emit(sink: Option<&ProgressSink>, event: ProgressEvent) {
    if let Some(tx) = sink {
        // No receivers is fine
        let _ = tx.send(event);
    }
}

//! JSONL loop transcript.
//!
//! One line per [`ConversationEvent`]: the payload's fields merged with
//! `type`, `seq` and `timestamp`. The file is opened in append mode so
//! consecutive runs accumulate in the same transcript.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use serde_json::{Value, json};
use toolforge_application::{ConversationEvent, ConversationLogger};
use tracing::warn;

pub struct JsonlTranscript {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    seq: AtomicU64,
}

impl JsonlTranscript {
    /// Open (or create) the transcript at `path`, creating parent
    /// directories. Returns `None` when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "Could not create transcript directory");
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open transcript");
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: ConversationEvent) -> Value {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), json!(event.event_type));
                map.insert("seq".to_string(), json!(seq));
                map.insert("timestamp".to_string(), json!(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "seq": seq,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl ConversationLogger for JsonlTranscript {
    fn log(&self, event: ConversationEvent) {
        let Ok(line) = serde_json::to_string(&self.record(event)) else {
            return;
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "{}", line);
        // Each record is flushed so a crash loses at most the current line
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_become_numbered_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("transcript.jsonl");
        let transcript = JsonlTranscript::open(&path).unwrap();

        transcript.log(ConversationEvent::new(
            "tool_call",
            json!({"mode": "command", "call": {"name": "Echo", "arguments": {}}}),
        ));
        transcript.log(ConversationEvent::new("budget_reset", json!({"date": "2024-06-02"})));
        drop(transcript);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "tool_call");
        assert_eq!(lines[0]["seq"], 0);
        assert_eq!(lines[0]["call"]["name"], "Echo");
        assert_eq!(lines[1]["type"], "budget_reset");
        assert_eq!(lines[1]["seq"], 1);
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let transcript = JsonlTranscript::open(&path).unwrap();
        transcript.log(ConversationEvent::new("notice", json!("cooldown")));
        drop(transcript);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["data"], "cooldown");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        for _ in 0..2 {
            let transcript = JsonlTranscript::open(&path).unwrap();
            transcript.log(ConversationEvent::new("goal", json!({"goal": "tidy up"})));
        }
        assert_eq!(read_lines(&path).len(), 2);
    }
}

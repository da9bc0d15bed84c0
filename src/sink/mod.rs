//! Append-only, day-partitioned JSON Lines request log.
//!
//! The [`LogSink`] writes one [`LogEvent`] per line to the segment file
//! named by substituting the current UTC date into a strftime template
//! (e.g. `forward_%Y%m%d.jsonl`). A new segment is opened the first time
//! a write lands on a new day. Each record is serialized in full before
//! the segment lock is taken and written with a single `write_all`, so
//! concurrent writers never interleave partial lines.

pub mod event;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ForwarderError;

pub use event::{
    body_text, header_map, FailureEvent, LogEvent, RequestEvent, ResponseEvent, TargetRole,
    BODY_PLACEHOLDER,
};

/// Render the segment file name for `date`.
pub fn segment_path(template: &str, date: NaiveDate) -> Result<PathBuf, ForwarderError> {
    let mut name = String::new();
    write!(name, "{}", date.format(template)).map_err(|_| ForwarderError::LogTemplate {
        template: template.to_string(),
        reason: "contains an invalid or non-date strftime specifier".into(),
    })?;
    Ok(PathBuf::from(name))
}

/// Check that a template renders for dates and changes every calendar day.
pub fn check_template(template: &str) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err("log file template cannot be empty".into());
    }
    let day = |d| NaiveDate::from_ymd_opt(2000, 1, d).ok_or_else(|| "bad sample date".to_string());
    let render = |date| segment_path(template, date).map_err(|e| e.to_string());

    let first = render(day(1)?)?;
    let second = render(day(2)?)?;
    if first == second {
        return Err("log file template must include a day placeholder such as %Y%m%d".into());
    }
    Ok(())
}

struct Segment {
    path: PathBuf,
    file: tokio::fs::File,
}

impl Segment {
    async fn open(path: PathBuf) -> Result<Self, ForwarderError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::debug!(path = %path.display(), "opened log segment");
        Ok(Self { path, file })
    }
}

pub struct LogSink {
    template: String,
    current: Mutex<Option<Segment>>,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl LogSink {
    /// Create a sink. No file is touched until the first append.
    pub fn new(template: impl Into<String>) -> Result<Self, ForwarderError> {
        let template = template.into();
        check_template(&template).map_err(|reason| ForwarderError::LogTemplate {
            template: template.clone(),
            reason,
        })?;
        Ok(Self {
            template,
            current: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Path of the segment a write issued right now would land in.
    pub fn current_path(&self) -> Result<PathBuf, ForwarderError> {
        segment_path(&self.template, Utc::now().date_naive())
    }

    pub async fn append(&self, event: &LogEvent) -> Result<(), ForwarderError> {
        self.append_at(event, Utc::now()).await
    }

    /// Append `event` to the segment for the UTC date of `now`.
    pub async fn append_at(&self, event: &LogEvent, now: DateTime<Utc>) -> Result<(), ForwarderError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let path = segment_path(&self.template, now.date_naive())?;

        let mut current = self.current.lock().await;
        let segment = match current.take() {
            Some(segment) if segment.path == path => segment,
            _ => Segment::open(path).await?,
        };
        let segment = current.insert(segment);

        segment.file.write_all(&line).await?;
        segment.file.flush().await?;
        Ok(())
    }

    /// Flush the open segment, if any.
    pub async fn flush(&self) -> Result<(), ForwarderError> {
        if let Some(segment) = self.current.lock().await.as_mut() {
            segment.file.flush().await?;
        }
        Ok(())
    }
}

/// Read every record of a segment file. Used by tests and tooling.
pub async fn read_segment(path: &Path) -> Result<Vec<LogEvent>, ForwarderError> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(ForwarderError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn request(id: &str, body: &[u8]) -> LogEvent {
        LogEvent::Request(RequestEvent {
            timestamp: Utc::now(),
            request_id: id.into(),
            method: "POST".into(),
            url: "http://proxy/orders".into(),
            path: "/orders".into(),
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            remote_addr: None,
            body: body_text(body),
        })
    }

    fn template_in(dir: &Path) -> String {
        dir.join("forward_%Y%m%d.jsonl").display().to_string()
    }

    #[test]
    fn segment_name_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let path = segment_path("logs/forward_%Y%m%d.jsonl", date).unwrap();
        assert_eq!(path, PathBuf::from("logs/forward_20240309.jsonl"));
    }

    #[test]
    fn template_checks() {
        assert!(check_template("forward_%Y%m%d.jsonl").is_ok());
        assert!(check_template("forward_%F.jsonl").is_ok());
        assert!(check_template("forward.jsonl").is_err());
        assert!(check_template("forward_%Y%m.jsonl").is_err());
        assert!(check_template("forward_%H.jsonl").is_err());
        assert!(check_template("").is_err());
        assert!(LogSink::new("static.log").is_err());
    }

    #[tokio::test]
    async fn writes_on_different_days_land_in_different_segments() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::new(template_in(dir.path())).unwrap();

        let day_one = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let day_two = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 1).unwrap();
        sink.append_at(&request("a", b"one"), day_one).await.unwrap();
        sink.append_at(&request("b", b"two"), day_two).await.unwrap();

        let first = read_segment(&dir.path().join("forward_20240131.jsonl"))
            .await
            .unwrap();
        let second = read_segment(&dir.path().join("forward_20240201.jsonl"))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].request_id(), "a");
        assert_eq!(second[0].request_id(), "b");
    }

    #[tokio::test]
    async fn returning_to_a_day_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::new(template_in(dir.path())).unwrap();
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();

        sink.append_at(&request("a", b""), day).await.unwrap();
        sink.append_at(&request("b", b""), next).await.unwrap();
        sink.append_at(&request("c", b""), day).await.unwrap();

        let records = read_segment(&dir.path().join("forward_20240501.jsonl"))
            .await
            .unwrap();
        let ids: Vec<&str> = records.iter().map(LogEvent::request_id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn invalid_utf8_body_is_logged_with_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::new(template_in(dir.path())).unwrap();
        sink.append(&request("bin", &[0xc3, 0x28, 0xff])).await.unwrap();

        let records = read_segment(&sink.current_path().unwrap()).await.unwrap();
        let LogEvent::Request(ref event) = records[0] else {
            panic!("expected a request record");
        };
        assert_eq!(event.body, BODY_PLACEHOLDER);
        assert_eq!(event.method, "POST");
        assert_eq!(event.path, "/orders");
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(LogSink::new(template_in(dir.path())).unwrap());
        let big = "x".repeat(64 * 1024);

        let mut handles = Vec::new();
        for i in 0..32 {
            let sink = Arc::clone(&sink);
            let body = big.clone();
            handles.push(tokio::spawn(async move {
                sink.append(&request(&format!("r{i}"), body.as_bytes()))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = read_segment(&sink.current_path().unwrap()).await.unwrap();
        assert_eq!(records.len(), 32);
    }
}

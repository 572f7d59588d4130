//! Reading event files and printing rendered log lines

use std::collections::HashMap;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use logspan_ansi::{Span, SpanParser, parse, plain_text};
use logspan_logs::LogEvent;

/// Parse a JSON-lines file of events, skipping blank lines
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<LogEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("reading events")?;
        if line.trim().is_empty() {
            continue;
        }
        let event: LogEvent = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Turns messages into spans, optionally carrying style per stream
pub struct LineRenderer {
    persist_style: bool,
    json: bool,
    parsers: HashMap<String, SpanParser>,
}

impl LineRenderer {
    pub fn new(persist_style: bool, json: bool) -> Self {
        Self {
            persist_style,
            json,
            parsers: HashMap::new(),
        }
    }

    /// Parse one line belonging to `stream`
    pub fn spans(&mut self, stream: &str, line: &str) -> Vec<Span> {
        if !self.persist_style {
            return parse(line);
        }
        self.parsers
            .entry(stream.to_string())
            .or_default()
            .parse_line(line)
    }

    /// Write a raw line as spans (JSON) or plain text
    pub fn write_line<W: Write>(&mut self, out: &mut W, stream: &str, line: &str) -> Result<()> {
        let spans = self.spans(stream, line);
        if self.json {
            serde_json::to_writer(&mut *out, &spans)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", plain_text(&spans))?;
        }
        Ok(())
    }

    /// Write an event with its timestamp and stream prefix
    pub fn write_event<W: Write>(&mut self, out: &mut W, event: &LogEvent) -> Result<()> {
        let spans = self.spans(&event.log, &event.message);
        if self.json {
            let record = serde_json::json!({
                "id": event.id,
                "timestamp": event.timestamp,
                "log": event.log,
                "spans": spans,
            });
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{} {} | {}",
                format_timestamp(event),
                event.log,
                plain_text(&spans)
            )?;
        }
        Ok(())
    }
}

fn format_timestamp(event: &LogEvent) -> String {
    match event.parsed_timestamp() {
        Some(ts) => ts.format("%H:%M:%S%.3f").to_string(),
        None => event.timestamp.clone(),
    }
}

/// Events in `window` that come after the one with id `last_seen`
///
/// If `last_seen` was evicted (or never seen) the whole window is new.
pub fn unseen<'a>(window: &'a [LogEvent], last_seen: Option<&str>) -> &'a [LogEvent] {
    let Some(last_seen) = last_seen else {
        return window;
    };
    match window.iter().rposition(|e| e.id == last_seen) {
        Some(pos) => &window[pos + 1..],
        None => window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, message: &str) -> LogEvent {
        LogEvent::new(id, "2024-01-15T10:30:00.250Z", "web:out", message)
    }

    #[test]
    fn test_read_events_skips_blank_lines() {
        let input = concat!(
            r#"{"id":"1","timestamp":"t","log":"web:out","message":"a"}"#,
            "\n\n",
            r#"{"id":"2","timestamp":"t","stream":"db:err","message":"b"}"#,
            "\n"
        );
        let events = read_events(input.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].log, "db:err");
    }

    #[test]
    fn test_read_events_reports_line() {
        let err = read_events("{}\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_write_event_plain() {
        let mut renderer = LineRenderer::new(false, false);
        let mut out = Vec::new();
        renderer
            .write_event(&mut out, &event("1", "\u{1b}[31mfailed\u{1b}[0m see https://x.io"))
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "10:30:00.250 web:out | failed see https://x.io\n"
        );
    }

    #[test]
    fn test_write_line_json() {
        let mut renderer = LineRenderer::new(false, true);
        let mut out = Vec::new();
        renderer.write_line(&mut out, "-", "\u{1b}[1mhi").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[{\"text\":\"hi\",\"style\":\"bold\"}]\n"
        );
    }

    #[test]
    fn test_persisted_style_is_per_stream() {
        let mut renderer = LineRenderer::new(true, false);
        renderer.spans("web:out", "\u{1b}[32mgreen");
        assert!(renderer.spans("web:out", "still")[0].foreground.is_some());
        assert!(renderer.spans("db:err", "plain")[0].foreground.is_none());
    }

    #[test]
    fn test_unseen_events() {
        let window = vec![event("1", "a"), event("2", "b"), event("3", "c")];
        assert_eq!(unseen(&window, None).len(), 3);
        assert_eq!(unseen(&window, Some("2")).len(), 1);
        assert_eq!(unseen(&window, Some("3")).len(), 0);
        assert_eq!(unseen(&window, Some("gone")).len(), 3);
    }
}

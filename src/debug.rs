use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Structured JSONL event log, injected into pipeline stages explicitly.
/// One line per event. Counters accumulate across a pipeline run and are
/// flushed as a single summary line by `emit_summary`.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(File::create(path)?),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn event(&self, kind: &str, fields: &[(&str, String)]) {
        let mut line = String::with_capacity(48);
        line.push_str("{\"type\":");
        push_json_str(&mut line, kind);
        for (key, value) in fields {
            line.push(',');
            push_json_str(&mut line, key);
            line.push(':');
            push_json_str(&mut line, value);
        }
        line.push('}');
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            *state.counters.entry(key.to_string()).or_insert(0) += amount;
        }
    }

    /// Write accumulated counters as one summary line and reset them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let mut line = String::with_capacity(64);
            line.push_str("{\"type\":\"export.summary\",\"context\":");
            push_json_str(&mut line, context);
            line.push_str(",\"counts\":{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    line.push(',');
                }
                push_json_str(&mut line, key);
                let _ = write!(line, ":{value}");
            }
            line.push_str("}}");
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

/// Append `raw` as a quoted JSON string. Quotes, backslashes, and
/// control characters are escaped; everything else (Korean document
/// names included) passes through as UTF-8.
pub(crate) fn push_json_str(out: &mut String, raw: &str) {
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log_path(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "docpress_{tag}_{}_{}.jsonl",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn events_and_summary_are_written_as_jsonl() {
        let path = temp_log_path("debug");
        let log = DebugLogger::new(&path).expect("create log");
        log.event("raster.capture", &[("section", "purchase_order".to_string())]);
        log.increment("pages", 2);
        log.increment("pages", 1);
        log.emit_summary("export");
        log.flush();

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"raster.capture\""));
        assert!(lines[0].contains("\"section\":\"purchase_order\""));
        assert!(lines[1].contains("\"pages\":3"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn summary_resets_counters() {
        let path = temp_log_path("debug_reset");
        let log = DebugLogger::new(&path).expect("create log");
        log.increment("pages", 5);
        log.emit_summary("first");
        log.emit_summary("second");
        log.flush();

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].contains("\"pages\":5"));
        assert!(lines[1].contains("\"counts\":{}"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn json_strings_escape_quotes_newlines_and_controls() {
        let mut out = String::new();
        push_json_str(&mut out, "a\"b\nc\u{1}");
        assert_eq!(out, "\"a\\\"b\\nc\\u0001\"");
    }
}

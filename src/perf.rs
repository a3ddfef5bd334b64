use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::debug::push_json_str;

#[derive(Default)]
struct SpanStat {
    total_ms: f64,
    calls: u64,
}

/// Span/count JSONL log. Every span and count is written as it happens;
/// on drop the aggregated totals land in a sibling `*_hot.log`, ranked
/// by total time so the slowest stages read first.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    spans: BTreeMap<String, SpanStat>,
    counters: BTreeMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                spans: BTreeMap::new(),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, section: Option<usize>, ms: f64) {
        let mut line = String::with_capacity(64);
        line.push_str("{\"type\":\"perf.span\",\"name\":");
        push_json_str(&mut line, name);
        let _ = match section {
            Some(idx) => write!(line, ",\"section\":{idx}"),
            None => write!(line, ",\"section\":null"),
        };
        let _ = write!(line, ",\"unit\":\"ms\",\"ms\":{ms:.3}}}");
        if let Ok(mut state) = self.inner.lock() {
            let stat = state.spans.entry(name.to_string()).or_default();
            stat.total_ms += ms;
            stat.calls += 1;
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn log_counts(&self, name: &str, section: Option<usize>, counts: &[(&str, u64)]) {
        let mut line = String::with_capacity(64);
        line.push_str("{\"type\":\"perf.counts\",\"name\":");
        push_json_str(&mut line, name);
        let _ = match section {
            Some(idx) => write!(line, ",\"section\":{idx}"),
            None => write!(line, ",\"section\":null"),
        };
        line.push_str(",\"counts\":{");
        for (idx, (key, value)) in counts.iter().enumerate() {
            if idx > 0 {
                line.push(',');
            }
            push_json_str(&mut line, key);
            let _ = write!(line, ":{value}");
        }
        line.push_str("}}");
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                *state.counters.entry(format!("{name}.{key}")).or_insert(0) += value;
            }
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

const HOT_LIST_LIMIT: usize = 100;

impl Drop for PerfState {
    fn drop(&mut self) {
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut ranked: Vec<(&String, &SpanStat)> = self.spans.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.total_ms
                .partial_cmp(&a.1.total_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, (name, stat)) in ranked.into_iter().take(HOT_LIST_LIMIT).enumerate() {
            let avg = stat.total_ms / stat.calls.max(1) as f64;
            let mut line = String::with_capacity(96);
            let _ = write!(line, "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":", rank + 1);
            push_json_str(&mut line, name);
            let _ = write!(
                line,
                ",\"unit\":\"ms\",\"agg\":\"sum\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{avg:.3}}}",
                stat.total_ms, stat.calls
            );
            let _ = writeln!(writer, "{line}");
        }

        let mut ranked: Vec<(&String, &u64)> = self.counters.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        for (rank, (name, value)) in ranked.into_iter().take(HOT_LIST_LIMIT).enumerate() {
            let mut line = String::with_capacity(64);
            let _ = write!(line, "{{\"type\":\"perf.hot.count\",\"rank\":{},\"name\":", rank + 1);
            push_json_str(&mut line, name);
            let _ = write!(line, ",\"value\":{value}}}");
            let _ = writeln!(writer, "{line}");
        }
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("docpress_perf");
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_path_appends_suffix_before_extension() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/export_perf.log")),
            PathBuf::from("/tmp/export_perf_hot.log")
        );
        assert_eq!(
            hot_path_for(Path::new("/tmp/perf")),
            PathBuf::from("/tmp/perf_hot.log")
        );
    }

    #[test]
    fn spans_aggregate_into_hot_file_on_drop() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "docpress_perf_{}_{}.log",
            std::process::id(),
            nanos
        ));
        {
            let perf = PerfLogger::new(&path).expect("create perf log");
            perf.log_span_ms("raster", Some(0), 12.5);
            perf.log_span_ms("raster", Some(1), 7.5);
            perf.log_counts("paginate", Some(0), &[("strips", 4)]);
            perf.flush();
        }
        let hot = std::fs::read_to_string(hot_path_for(&path)).expect("hot log");
        assert!(hot.contains("\"name\":\"raster\""));
        assert!(hot.contains("\"ms\":20.000"));
        assert!(hot.contains("\"count\":2"));
        assert!(hot.contains("paginate.strips"));
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(hot_path_for(&path));
    }
}

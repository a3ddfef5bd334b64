use crate::template::Section;
use std::sync::{Condvar, Mutex};

/// One export call: one or more document sections, each starting on a
/// fresh page boundary, assembled into a single PDF.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub sections: Vec<Section>,
    /// Business document number; also the ledger key when storing.
    /// Falls back to the generated filename stem.
    pub document_number: Option<String>,
    /// `yymmdd` filename stamp. Defaults to today (UTC); supply it
    /// explicitly for reproducible filenames.
    pub filename_stamp: Option<String>,
}

impl ExportJob {
    pub fn single(section: Section) -> Self {
        Self {
            sections: vec![section],
            document_number: None,
            filename_stamp: None,
        }
    }
}

/// Finished export: the PDF bytes plus the caller-facing metadata.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
    pub doc_code: &'static str,
}

/// Export that was handed to the collaborators.
#[derive(Debug, Clone)]
pub struct StoredExport {
    pub artifact: ExportArtifact,
    pub url: String,
}

/// Counting permit gate bounding concurrent exports. Each export call
/// mutates only call-local scratch state, but captures are memory-heavy,
/// so the exporter refuses to run more than `limit` at once; excess
/// callers block until a permit frees up.
pub(crate) struct ExportGate {
    running: Mutex<usize>,
    freed: Condvar,
    limit: usize,
}

impl ExportGate {
    pub fn new(limit: usize) -> Self {
        Self {
            running: Mutex::new(0),
            freed: Condvar::new(),
            limit: limit.max(1),
        }
    }

    pub fn acquire(&self) -> GatePermit<'_> {
        // Poisoning must not leak permits; recover the guard.
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        while *running >= self.limit {
            running = self
                .freed
                .wait(running)
                .unwrap_or_else(|e| e.into_inner());
        }
        *running += 1;
        GatePermit { gate: self }
    }
}

pub(crate) struct GatePermit<'a> {
    gate: &'a ExportGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut running = self
            .gate
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *running -= 1;
        drop(running);
        self.gate.freed.notify_one();
    }
}

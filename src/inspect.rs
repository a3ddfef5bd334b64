use lopdf::Document as LoDocument;
use std::path::Path;

/// Why an exported file failed inspection or the upload gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    Parse(String),
    Encrypted,
    NoPages,
    Io(String),
}

impl InspectError {
    /// Stable machine code, shared with the storage side's validation
    /// log vocabulary.
    pub fn code(&self) -> &'static str {
        match self {
            InspectError::Parse(_) => "PDF_PARSE_FAILED",
            InspectError::Encrypted => "PDF_ENCRYPTED_UNSUPPORTED",
            InspectError::NoPages => "PDF_EMPTY_OR_NO_PAGES",
            InspectError::Io(_) => "PDF_IO_ERROR",
        }
    }
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectError::Parse(message) => write!(f, "{}: {message}", self.code()),
            InspectError::Io(message) => write!(f, "{}: {message}", self.code()),
            InspectError::Encrypted => {
                write!(f, "{}: encrypted documents are not uploadable", self.code())
            }
            InspectError::NoPages => write!(f, "{}: document has no pages", self.code()),
        }
    }
}

impl std::error::Error for InspectError {}

/// Post-generation check on an exported document, used by callers that
/// validate uploads before attaching them to business records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<InspectReport, InspectError> {
    let pdf =
        LoDocument::load_mem(bytes).map_err(|err| InspectError::Parse(err.to_string()))?;
    Ok(InspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<InspectReport, InspectError> {
    let data = std::fs::read(path).map_err(|err| InspectError::Io(err.to_string()))?;
    inspect_pdf_bytes(&data)
}

/// Gate for handing a document to the storage collaborator: encrypted or
/// page-less files never upload.
pub fn require_uploadable(report: &InspectReport) -> Result<(), InspectError> {
    if report.encrypted {
        return Err(InspectError::Encrypted);
    }
    if report.page_count == 0 {
        return Err(InspectError::NoPages);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::PageStrip;
    use crate::pdf::{PdfMetadata, write_pdf};
    use crate::types::PageGeometry;

    fn sample_pdf_bytes(pages: usize) -> Vec<u8> {
        let strips: Vec<PageStrip> = (0..pages)
            .map(|idx| PageStrip {
                jpeg: vec![0xFF, 0xD8, idx as u8, 0xFF, 0xD9],
                width_px: 4,
                height_px: 4,
                width_mm: 190.0,
                height_mm: 100.0,
                x_offset_mm: 0.0,
            })
            .collect();
        write_pdf(
            &strips,
            &PageGeometry::a4(10.0),
            &PdfMetadata {
                title: None,
                producer: "docpress".to_string(),
            },
        )
        .expect("pdf")
    }

    #[test]
    fn inspect_reads_version_and_page_count() {
        let bytes = sample_pdf_bytes(2);
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 2);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert!(!report.pdf_version.is_empty());
    }

    #[test]
    fn inspect_rejects_malformed_bytes() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert!(matches!(err, InspectError::Parse(_)));
        assert_eq!(err.code(), "PDF_PARSE_FAILED");
    }

    #[test]
    fn missing_file_reports_io_error() {
        let missing = std::env::temp_dir().join(format!(
            "docpress_inspect_missing_{}_{}.pdf",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let err = inspect_pdf_path(&missing).expect_err("missing");
        assert!(matches!(err, InspectError::Io(_)));
        assert_eq!(err.code(), "PDF_IO_ERROR");
    }

    #[test]
    fn uploadable_gate_rejects_empty_and_encrypted() {
        let mut report = InspectReport {
            pdf_version: "1.7".to_string(),
            page_count: 0,
            encrypted: false,
            file_size_bytes: 10,
        };
        assert_eq!(
            require_uploadable(&report).expect_err("no pages"),
            InspectError::NoPages
        );

        report.page_count = 1;
        report.encrypted = true;
        assert_eq!(
            require_uploadable(&report).expect_err("encrypted"),
            InspectError::Encrypted
        );
    }

    #[test]
    fn generated_documents_pass_the_upload_gate() {
        let report = inspect_pdf_bytes(&sample_pdf_bytes(1)).expect("inspect");
        require_uploadable(&report).expect("uploadable");
    }
}

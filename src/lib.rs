mod debug;
mod error;
mod export;
mod font;
mod format;
mod html;
mod inspect;
mod layout;
mod paginate;
mod pdf;
mod perf;
mod raster;
mod record;
mod store;
mod style;
mod template;
mod types;

pub use error::ExportError;
pub use export::{ExportArtifact, ExportJob, StoredExport};
pub use format::{
    escape_html, export_filename, format_amount_korean, format_currency, format_date,
    sanitize_filename_component, today_yymmdd, yymmdd,
};
pub use inspect::{
    InspectError, InspectReport, inspect_pdf_bytes, inspect_pdf_path, require_uploadable,
};
pub use record::{
    AirPermitRecord, ContractKind, ContractRecord, EquipmentCounts, FacilityRecord, OutletRecord,
    PaymentTerms, PhIndicatorLocation, PurchaseOrderRecord, TemperatureSensorLength,
    TemperatureSensorType, VpnType, facility_display_number,
};
pub use store::{CollaboratorError, DocumentLedger, DocumentStore, UploadMeta};
pub use template::Section;
pub use types::{Color, PageGeometry, Pt};

use crate::debug::DebugLogger;
use crate::export::ExportGate;
use crate::font::FontRegistry;
use crate::html::build_box_tree;
use crate::layout::layout_document;
use crate::paginate::{PageStrip, fit_single_page, paginate_flow};
use crate::pdf::{PdfMetadata, write_pdf};
use crate::perf::PerfLogger;
use crate::raster::raster_display_list;
use crate::style::{ComputedStyle, Edges};
use crate::template::{PageFill, RenderedSection};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const PRODUCER: &str = concat!("docpress ", env!("CARGO_PKG_VERSION"));

/// Document export pipeline: template -> capture -> paginate -> PDF.
/// One `Exporter` is immutable and shareable; every export call owns its
/// scratch state, so concurrent calls are safe and bounded only by the
/// configured permit gate.
pub struct Exporter {
    geometry: PageGeometry,
    raster_scale: f32,
    flow_jpeg_quality: u8,
    fit_jpeg_quality: u8,
    content_width_px: f32,
    container_padding_px: f32,
    base_font_px: f32,
    base_line_height: f32,
    fonts: Arc<FontRegistry>,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
    gate: ExportGate,
}

#[derive(Clone)]
pub struct ExporterBuilder {
    geometry: PageGeometry,
    raster_scale: f32,
    flow_jpeg_quality: u8,
    fit_jpeg_quality: u8,
    content_width_px: f32,
    container_padding_px: f32,
    base_font_px: f32,
    base_line_height: f32,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_bytes: Vec<(Vec<u8>, Option<String>)>,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
    max_concurrent_exports: usize,
}

impl Default for ExporterBuilder {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::a4(10.0),
            raster_scale: 2.0,
            flow_jpeg_quality: 95,
            fit_jpeg_quality: 85,
            content_width_px: 794.0,
            container_padding_px: 20.0,
            base_font_px: 12.0,
            base_line_height: 1.5,
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            font_bytes: Vec::new(),
            debug_path: None,
            perf_path: None,
            max_concurrent_exports: 4,
        }
    }
}

impl ExporterBuilder {
    pub fn page_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn margin_mm(mut self, margin_mm: f32) -> Self {
        self.geometry.margin_mm = margin_mm;
        self
    }

    /// Capture pixel density relative to the nominal print width. The
    /// default 2x is the print-quality floor; 1x is the accepted
    /// minimum.
    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }

    pub fn flow_jpeg_quality(mut self, quality: u8) -> Self {
        self.flow_jpeg_quality = quality;
        self
    }

    pub fn fit_jpeg_quality(mut self, quality: u8) -> Self {
        self.fit_jpeg_quality = quality;
        self
    }

    pub fn content_width_px(mut self, width: f32) -> Self {
        self.content_width_px = width;
        self
    }

    pub fn container_padding_px(mut self, padding: f32) -> Self {
        self.container_padding_px = padding;
        self
    }

    pub fn base_font_px(mut self, font_size: f32) -> Self {
        self.base_font_px = font_size;
        self
    }

    pub fn base_line_height(mut self, line_height: f32) -> Self {
        self.base_line_height = line_height;
        self
    }

    pub fn font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn font_bytes(mut self, data: Vec<u8>, name: Option<String>) -> Self {
        self.font_bytes.push((data, name));
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn max_concurrent_exports(mut self, limit: usize) -> Self {
        self.max_concurrent_exports = limit;
        self
    }

    pub fn build(self) -> Result<Exporter, ExportError> {
        if !self.geometry.is_valid() {
            return Err(ExportError::InvalidConfiguration(
                "page geometry leaves no content box".to_string(),
            ));
        }
        if !(1.0..=8.0).contains(&self.raster_scale) {
            return Err(ExportError::InvalidConfiguration(format!(
                "raster scale {} outside 1.0..=8.0",
                self.raster_scale
            )));
        }
        for quality in [self.flow_jpeg_quality, self.fit_jpeg_quality] {
            if !(1..=100).contains(&quality) {
                return Err(ExportError::InvalidConfiguration(format!(
                    "jpeg quality {quality} outside 1..=100"
                )));
            }
        }
        if self.content_width_px < 100.0 {
            return Err(ExportError::InvalidConfiguration(
                "content width below 100px cannot hold the templates".to_string(),
            ));
        }
        if self.max_concurrent_exports == 0 {
            return Err(ExportError::InvalidConfiguration(
                "concurrent export limit must be at least 1".to_string(),
            ));
        }

        let mut fonts = FontRegistry::new();
        for dir in &self.font_dirs {
            fonts.register_dir(dir);
        }
        for file in &self.font_files {
            fonts.register_file(file)?;
        }
        for (data, name) in self.font_bytes {
            fonts.register_bytes(data, name.as_deref())?;
        }

        let debug = match &self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let perf = match &self.perf_path {
            Some(path) => Some(Arc::new(PerfLogger::new(path)?)),
            None => None,
        };

        Ok(Exporter {
            geometry: self.geometry,
            raster_scale: self.raster_scale,
            flow_jpeg_quality: self.flow_jpeg_quality,
            fit_jpeg_quality: self.fit_jpeg_quality,
            content_width_px: self.content_width_px,
            container_padding_px: self.container_padding_px,
            base_font_px: self.base_font_px,
            base_line_height: self.base_line_height,
            fonts: Arc::new(fonts),
            debug,
            perf,
            gate: ExportGate::new(self.max_concurrent_exports),
        })
    }
}

impl Exporter {
    pub fn builder() -> ExporterBuilder {
        ExporterBuilder::default()
    }

    /// Fingerprint of the embedded document catalog, for collaborators
    /// that verify catalog agreement before accepting uploads.
    pub fn catalog_fingerprint() -> &'static str {
        docpress_catalog_contract::catalog_fingerprint()
    }

    pub fn has_fonts(&self) -> bool {
        self.fonts.has_fonts()
    }

    pub fn font_names(&self) -> Vec<String> {
        self.fonts.font_names()
    }

    /// Raw markup for a section, one string per independent capture.
    /// Pure and infallible; used directly by preview surfaces.
    pub fn render_markup(&self, section: &Section) -> Vec<String> {
        section.render().into_iter().map(|r| r.html).collect()
    }

    /// Run the full pipeline for a job and return the assembled PDF.
    /// Any stage failure aborts the whole export; there is no partial
    /// document.
    pub fn render_pdf(&self, job: &ExportJob) -> Result<ExportArtifact, ExportError> {
        if job.sections.is_empty() {
            return Err(ExportError::InvalidConfiguration(
                "export job has no sections".to_string(),
            ));
        }
        let _permit = self.gate.acquire();
        let started = Instant::now();

        let mut strips: Vec<PageStrip> = Vec::new();
        for (section_index, section) in job.sections.iter().enumerate() {
            for rendered in section.render() {
                let captured = self.capture(section_index, &rendered)?;
                strips.extend(captured);
            }
        }

        let first = &job.sections[0];
        let metadata = PdfMetadata {
            title: Some(format!("{} - {}", first.title(), first.entity_name())),
            producer: PRODUCER.to_string(),
        };
        let bytes = write_pdf(&strips, &self.geometry, &metadata)?;

        let stamp = job
            .filename_stamp
            .clone()
            .unwrap_or_else(crate::format::today_yymmdd);
        let doc_code = first.doc_code();
        let filename_code = docpress_catalog_contract::doc_type(doc_code)
            .map(|def| def.filename_code)
            .unwrap_or("문서");
        let filename = crate::format::export_filename(&stamp, filename_code, first.entity_name());

        if let Some(perf) = &self.perf {
            perf.log_span_ms("export.total", None, started.elapsed().as_secs_f64() * 1000.0);
            perf.flush();
        }
        if let Some(debug) = &self.debug {
            debug.increment("export.pages", strips.len() as u64);
            debug.increment("export.sections", job.sections.len() as u64);
            debug.event(
                "export.finished",
                &[
                    ("doc_code", doc_code.to_string()),
                    ("filename", filename.clone()),
                    ("bytes", bytes.len().to_string()),
                ],
            );
            debug.emit_summary("export");
            debug.flush();
        }

        Ok(ExportArtifact {
            page_count: strips.len(),
            bytes,
            filename,
            doc_code,
        })
    }

    /// Generate, upload, and attach. Upload and persist failures come
    /// back as their own stages so the caller can retry the handoff
    /// without regenerating the document.
    pub fn export_and_store(
        &self,
        job: &ExportJob,
        store: &dyn DocumentStore,
        ledger: Option<&dyn DocumentLedger>,
    ) -> Result<StoredExport, ExportError> {
        let artifact = self.render_pdf(job)?;
        let document_number = job
            .document_number
            .clone()
            .unwrap_or_else(|| artifact.filename.trim_end_matches(".pdf").to_string());
        let storage_folder = docpress_catalog_contract::doc_type(artifact.doc_code)
            .map(|def| def.storage_folder)
            .unwrap_or("documents");
        let meta = UploadMeta {
            document_number: &document_number,
            doc_code: artifact.doc_code,
            storage_folder,
            filename: &artifact.filename,
        };
        let url = store
            .upload(&artifact.bytes, &meta)
            .map_err(|err| ExportError::Upload(err.to_string()))?;
        if let Some(ledger) = ledger {
            ledger
                .attach_document(&document_number, &url)
                .map_err(|err| ExportError::Persist(err.to_string()))?;
        }
        if let Some(debug) = &self.debug {
            debug.event(
                "export.stored",
                &[
                    ("document_number", document_number.clone()),
                    ("url", url.clone()),
                ],
            );
            debug.flush();
        }
        Ok(StoredExport { artifact, url })
    }

    fn base_style(&self) -> ComputedStyle {
        let mut style = ComputedStyle::root(self.base_font_px, self.base_line_height);
        style.padding = Edges {
            top: self.container_padding_px,
            right: self.container_padding_px,
            bottom: self.container_padding_px,
            left: self.container_padding_px,
        };
        style
    }

    /// One capture: parse, lay out at the nominal width, rasterize, and
    /// slice. All scratch state is call-local and dropped on return.
    fn capture(
        &self,
        section_index: usize,
        rendered: &RenderedSection,
    ) -> Result<Vec<PageStrip>, ExportError> {
        let started = Instant::now();
        let base = self.base_style();
        let tree = build_box_tree(&rendered.html, &base);
        let list = layout_document(&tree, self.content_width_px, &self.fonts);
        let pixmap =
            raster_display_list(&list, self.raster_scale, &self.fonts, self.debug.as_deref())?;
        let strips = match rendered.fill {
            PageFill::Flow => paginate_flow(&pixmap, &self.geometry, self.flow_jpeg_quality)?,
            PageFill::FitSingle => {
                vec![fit_single_page(&pixmap, &self.geometry, self.fit_jpeg_quality)?]
            }
        };
        if let Some(perf) = &self.perf {
            perf.log_span_ms(
                "export.capture",
                Some(section_index),
                started.elapsed().as_secs_f64() * 1000.0,
            );
            perf.log_counts(
                "export.capture",
                Some(section_index),
                &[
                    ("strips", strips.len() as u64),
                    ("commands", list.cmds.len() as u64),
                ],
            );
        }
        Ok(strips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn exporter() -> Exporter {
        Exporter::builder().build().expect("default exporter")
    }

    fn po_record() -> PurchaseOrderRecord {
        PurchaseOrderRecord {
            business_name: "한국환경산업".to_string(),
            address: "서울특별시 강남구 테헤란로 1".to_string(),
            manager_name: Some("김담당".to_string()),
            manager_contact: Some("010-0000-0000".to_string()),
            equipment: EquipmentCounts {
                ph_sensor: 3,
                gateway: 1,
                ..EquipmentCounts::default()
            },
            subtotal: 5_000_000,
            vat: 500_000,
            grand_total: 5_500_000,
            ..PurchaseOrderRecord::default()
        }
    }

    fn po_job() -> ExportJob {
        ExportJob {
            sections: vec![Section::PurchaseOrder(po_record())],
            document_number: Some("PO-250109-01".to_string()),
            filename_stamp: Some("250109".to_string()),
        }
    }

    #[test]
    fn purchase_order_exports_to_a_parseable_pdf() {
        let artifact = exporter().render_pdf(&po_job()).expect("export");
        assert_eq!(artifact.doc_code, "purchase_order");
        assert_eq!(artifact.filename, "250109_발주서_한국환경산업.pdf");
        let report = inspect_pdf_bytes(&artifact.bytes).expect("inspect");
        assert_eq!(report.page_count, artifact.page_count);
        assert!(report.page_count >= 1);
        require_uploadable(&report).expect("uploadable");
    }

    #[test]
    fn contract_job_produces_exactly_three_pages() {
        let record = ContractRecord {
            contract_number: "C-2025-001".to_string(),
            contract_date: Some("2025-01-09".to_string()),
            business_name: "한국환경산업".to_string(),
            business_address: "서울특별시".to_string(),
            business_representative: "홍길동".to_string(),
            supplier_company_name: "공급사".to_string(),
            supplier_representative: "김공급".to_string(),
            supplier_address: "경기도".to_string(),
            total_amount: 12_000_000,
            ..ContractRecord::default()
        };
        let job = ExportJob::single(Section::Contract(record));
        let artifact = exporter().render_pdf(&job).expect("export");
        assert_eq!(artifact.page_count, 3);
        let report = inspect_pdf_bytes(&artifact.bytes).expect("inspect");
        assert_eq!(report.page_count, 3);
    }

    #[test]
    fn permit_appendix_starts_its_own_page() {
        let mut record = po_record();
        let plain_pages = exporter()
            .render_pdf(&ExportJob::single(Section::PurchaseOrder(record.clone())))
            .expect("plain")
            .page_count;
        record.air_permit = Some(AirPermitRecord {
            business_name: record.business_name.clone(),
            business_type: Some("금속가공".to_string()),
            outlets: vec![OutletRecord {
                outlet_number: 1,
                outlet_name: "배출구".to_string(),
                discharge_facilities: vec![FacilityRecord {
                    name: "혼합시설".to_string(),
                    quantity: 1,
                    ..FacilityRecord::default()
                }],
                prevention_facilities: Vec::new(),
            }],
            ..AirPermitRecord::default()
        });
        let with_permit = exporter()
            .render_pdf(&ExportJob::single(Section::PurchaseOrder(record)))
            .expect("with permit")
            .page_count;
        assert!(with_permit > plain_pages);
    }

    #[test]
    fn same_job_exports_byte_identical_documents() {
        let exporter = exporter();
        let first = exporter.render_pdf(&po_job()).expect("first");
        let second = exporter.render_pdf(&po_job()).expect("second");
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.filename, second.filename);
    }

    #[test]
    fn markup_rendering_survives_fully_empty_optionals() {
        let record = PurchaseOrderRecord {
            business_name: "사업장".to_string(),
            ..PurchaseOrderRecord::default()
        };
        let markup = exporter().render_markup(&Section::PurchaseOrder(record));
        assert_eq!(markup.len(), 1);
        assert!(markup[0].contains("발 주 서"));
        assert!(markup[0].contains("사업장"));
    }

    #[test]
    fn empty_job_is_rejected_before_any_capture() {
        let job = ExportJob {
            sections: Vec::new(),
            document_number: None,
            filename_stamp: None,
        };
        let err = exporter().render_pdf(&job).expect_err("empty job");
        assert!(matches!(err, ExportError::InvalidConfiguration(_)));
    }

    #[test]
    fn builder_rejects_degenerate_settings() {
        assert!(matches!(
            Exporter::builder().raster_scale(0.5).build(),
            Err(ExportError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Exporter::builder().margin_mm(150.0).build(),
            Err(ExportError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Exporter::builder().flow_jpeg_quality(0).build(),
            Err(ExportError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Exporter::builder().max_concurrent_exports(0).build(),
            Err(ExportError::InvalidConfiguration(_))
        ));
    }

    struct FlakyStore {
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl DocumentStore for FlakyStore {
        fn upload(
            &self,
            _bytes: &[u8],
            meta: &UploadMeta<'_>,
        ) -> Result<String, CollaboratorError> {
            if self.fail {
                return Err("storage 503".into());
            }
            self.seen.lock().unwrap().push(meta.filename.to_string());
            Ok(format!(
                "https://files.example/{}/{}",
                meta.storage_folder, meta.filename
            ))
        }
    }

    struct RecordingLedger {
        attached: Mutex<Vec<(String, String)>>,
    }

    impl DocumentLedger for RecordingLedger {
        fn attach_document(
            &self,
            document_number: &str,
            url: &str,
        ) -> Result<(), CollaboratorError> {
            self.attached
                .lock()
                .unwrap()
                .push((document_number.to_string(), url.to_string()));
            Ok(())
        }
    }

    #[test]
    fn stored_export_reaches_store_and_ledger() {
        let store = FlakyStore {
            fail: false,
            seen: Mutex::new(Vec::new()),
        };
        let ledger = RecordingLedger {
            attached: Mutex::new(Vec::new()),
        };
        let stored = exporter()
            .export_and_store(&po_job(), &store, Some(&ledger))
            .expect("store");
        assert!(stored.url.contains("purchase-orders"));
        let attached = ledger.attached.lock().unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].0, "PO-250109-01");
        assert_eq!(attached[0].1, stored.url);
    }

    #[test]
    fn upload_failure_is_a_distinct_retryable_stage() {
        let store = FlakyStore {
            fail: true,
            seen: Mutex::new(Vec::new()),
        };
        let err = exporter()
            .export_and_store(&po_job(), &store, None)
            .expect_err("upload fails");
        assert!(matches!(err, ExportError::Upload(_)));
        assert!(err.is_handoff());
    }

    #[test]
    fn debug_and_perf_logs_capture_the_export() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let debug_path = std::env::temp_dir().join(format!(
            "docpress_export_debug_{}_{nanos}.jsonl",
            std::process::id()
        ));
        let perf_path = std::env::temp_dir().join(format!(
            "docpress_export_perf_{}_{nanos}.jsonl",
            std::process::id()
        ));
        let exporter = Exporter::builder()
            .debug_log(&debug_path)
            .perf_log(&perf_path)
            .build()
            .expect("exporter");
        exporter.render_pdf(&po_job()).expect("export");
        let debug_log = std::fs::read_to_string(&debug_path).expect("debug log");
        assert!(debug_log.contains("\"type\":\"export.finished\""));
        let perf_log = std::fs::read_to_string(&perf_path).expect("perf log");
        assert!(perf_log.contains("export.capture"));
        drop(exporter);
        let _ = std::fs::remove_file(&debug_path);
        let _ = std::fs::remove_file(&perf_path);
        let _ = std::fs::remove_file(
            perf_path.with_file_name(
                perf_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| format!("{s}_hot.log"))
                    .unwrap_or_default(),
            ),
        );
    }

    #[test]
    fn catalog_fingerprint_is_exposed_for_collaborators() {
        let fingerprint = Exporter::catalog_fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, docpress_catalog_contract::catalog_fingerprint());
    }
}

use std::error::Error;

/// Identifying fields that travel with the uploaded bytes. Mirrors what
/// the storage side needs to file the document: the catalog folder, the
/// document number, and the display filename.
#[derive(Debug, Clone)]
pub struct UploadMeta<'a> {
    pub document_number: &'a str,
    pub doc_code: &'a str,
    pub storage_folder: &'a str,
    pub filename: &'a str,
}

pub type CollaboratorError = Box<dyn Error + Send + Sync>;

/// Remote file storage. Opaque to the pipeline: retry policy, auth, and
/// transport all live behind this trait. Returns a retrievable URL.
pub trait DocumentStore {
    fn upload(&self, bytes: &[u8], meta: &UploadMeta<'_>) -> Result<String, CollaboratorError>;
}

/// Durable business-record side: attaches a stored document URL to the
/// record identified by the document number.
pub trait DocumentLedger {
    fn attach_document(&self, document_number: &str, url: &str)
    -> Result<(), CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingStore {
        uploads: Mutex<Vec<(usize, String)>>,
    }

    impl DocumentStore for RecordingStore {
        fn upload(
            &self,
            bytes: &[u8],
            meta: &UploadMeta<'_>,
        ) -> Result<String, CollaboratorError> {
            self.uploads
                .lock()
                .unwrap()
                .push((bytes.len(), meta.filename.to_string()));
            Ok(format!("https://files.example/{}/{}", meta.storage_folder, meta.filename))
        }
    }

    #[test]
    fn store_receives_bytes_and_identifying_fields() {
        let store = RecordingStore {
            uploads: Mutex::new(Vec::new()),
        };
        let meta = UploadMeta {
            document_number: "PO-20250109-01",
            doc_code: "purchase_order",
            storage_folder: "purchase-orders",
            filename: "250109_발주서_한국환경.pdf",
        };
        let url = store.upload(b"%PDF-", &meta).expect("upload");
        assert!(url.contains("purchase-orders"));
        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, 5);
    }
}

use std::fmt;

/// Pipeline failures, tagged by stage. Template rendering never fails
/// (missing optional fields degrade to empty display), so there is no
/// template variant. Upload and persist are distinct stages so a caller
/// can retry the upload of an already generated document without
/// regenerating it.
#[derive(Debug)]
pub enum ExportError {
    InvalidConfiguration(String),
    Asset(String),
    Raster(String),
    Compose(String),
    Pdf(String),
    Upload(String),
    Persist(String),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ExportError::Asset(message) => write!(f, "asset error: {}", message),
            ExportError::Raster(message) => write!(f, "rasterization failed: {}", message),
            ExportError::Compose(message) => write!(f, "page composition failed: {}", message),
            ExportError::Pdf(message) => write!(f, "pdf assembly failed: {}", message),
            ExportError::Upload(message) => write!(f, "upload failed: {}", message),
            ExportError::Persist(message) => write!(f, "record update failed: {}", message),
            ExportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        ExportError::Io(value)
    }
}

impl ExportError {
    /// True when the document itself was generated and only the handoff
    /// to a collaborator failed.
    pub fn is_handoff(&self) -> bool {
        matches!(self, ExportError::Upload(_) | ExportError::Persist(_))
    }
}

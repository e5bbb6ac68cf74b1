use thiserror::Error;

/// Errors surfaced by the template patch engine.
///
/// Every variant is fatal for the fill that raised it: no output bytes are produced once an error
/// has been returned.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// A part the fill depends on is absent from the template package.
    #[error("missing template part: {0}")]
    MissingPart(String),
    /// A part exists but lacks structure the fill depends on (e.g. `<sheetData>`, the item row).
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
    #[error("xml parse error in {part}: {message}")]
    Parse { part: String, message: String },
    #[error("malformed cell reference: {0:?}")]
    MalformedReference(String),
    #[error("invalid numeric value for {field}: {value:?}")]
    InvalidNumericValue { field: String, value: String },
}

impl TemplateError {
    pub(crate) fn parse(part: &str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

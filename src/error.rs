use thiserror::Error;

#[derive(Debug, Error)]
pub enum InkScrubError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Rasterization error: {0}")]
    RasterizationError(String),

    #[error("Reconstruction error: {0}")]
    ReconstructionError(String),

    #[error("Image encode error: {0}")]
    EncodeError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Batch error: {0}")]
    BatchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`InkScrubError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl InkScrubError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a rasterization error.
    render => RasterizationError,
    /// Create a reconstruction error.
    reconstruct => ReconstructionError,
    /// Create an image encode error.
    encode => EncodeError,
    /// Create a persistence error.
    persistence => PersistenceError,
    /// Create a batch error.
    batch => BatchError,
}

impl From<lopdf::Error> for InkScrubError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for InkScrubError {
    fn from(e: serde_json::Error) -> Self {
        Self::PersistenceError(e.to_string())
    }
}

impl From<serde_yml::Error> for InkScrubError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

#[cfg(feature = "pdfium")]
impl From<pdfium_render::prelude::PdfiumError> for InkScrubError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RasterizationError(e.to_string())
    }
}

impl From<image::ImageError> for InkScrubError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InkScrubError>;

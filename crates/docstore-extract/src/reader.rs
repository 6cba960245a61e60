use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tracing::debug;

use docstore_core::error::{Error, Result};
use docstore_core::types::{ExtractedDocument, SourceInfo, TextUnit};

/// The closed set of formats the reader understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [Self::Json, Self::Pdf, Self::Docx, Self::Txt];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| {
            let shown = if ext.is_empty() { "<none>".to_string() } else { format!(".{}", ext) };
            Error::UnsupportedFormat(format!("{} ({})", shown, path.display()))
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    fn extract(self, path: &Path, bytes: &[u8]) -> Result<Vec<TextUnit>> {
        match self {
            Self::Json => crate::json::extract(path, bytes),
            Self::Pdf => crate::pdf::extract(path, bytes),
            Self::Docx => crate::docx::extract(path, bytes),
            Self::Txt => crate::txt::extract(path, bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatReader;

impl FormatReader {
    pub fn new() -> Self {
        Self
    }

    /// Read `path` into text units. Missing files fail with `NotFound` before
    /// the extension is looked at.
    pub fn read(&self, path: &Path) -> Result<ExtractedDocument> {
        let meta = fs::metadata(path).map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;
        if !meta.is_file() {
            return Err(Error::NotFound(format!("{} is not a file", path.display())));
        }
        let format = DocumentFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;
        let units = format.extract(path, &bytes)?;
        debug!(path = %path.display(), format = format.as_str(), units = units.len(), "extracted");

        let source = SourceInfo {
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            format: format.as_str().to_string(),
            size_bytes: meta.len(),
            modified_at: meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .and_then(|d| i64::try_from(d.as_secs()).ok()),
        };
        Ok(ExtractedDocument { source, units })
    }

    /// Just the text of each unit, in order.
    pub fn read_texts(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.read(path)?.texts())
    }
}

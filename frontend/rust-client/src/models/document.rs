use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::Part;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Txt => "text/plain",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        [DocumentKind::Pdf, DocumentKind::Docx, DocumentKind::Txt]
            .into_iter()
            .find(|kind| kind.mime_type().eq_ignore_ascii_case(mime.trim()))
    }
}

/// An in-memory file picked for upload.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl DocumentFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("invalid file path {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }

    /// Kind by extension, falling back to the declared MIME type.
    pub fn kind(&self) -> Option<DocumentKind> {
        self.extension()
            .and_then(DocumentKind::from_extension)
            .or_else(|| self.content_type.as_deref().and_then(DocumentKind::from_mime))
    }

    pub fn is_pdf(&self) -> bool {
        self.extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }

    /// Multipart part carrying the whole file.
    pub fn to_part(&self) -> ClientResult<Part> {
        let mime = self
            .content_type
            .clone()
            .or_else(|| self.kind().map(|k| k.mime_type().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Part::stream_with_length(self.bytes.clone(), self.len())
            .file_name(self.file_name.clone())
            .mime_str(&mime)
            .map_err(|e| ClientError::Validation(format!("invalid content type '{}': {}", mime, e)))
    }
}

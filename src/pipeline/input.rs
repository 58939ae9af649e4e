//! Input resolution: load a user-supplied path or URL into memory.
//!
//! pdfium opens documents from a byte slice, so a download never needs a
//! temporary file. Both paths check the `%PDF` magic before returning, so a
//! mistyped URL that serves an HTML error page fails with a clear message
//! rather than a pdfium load error.

use crate::error::Pdf2PptxError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Where the bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Local(PathBuf),
    Url(String),
    Memory,
}

/// A PDF held in memory, with the name the output is derived from.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub bytes: Vec<u8>,
    /// File name without directories, e.g. `"report.pdf"`.
    pub filename: String,
    pub source: InputSource,
}

impl InputDocument {
    /// Wrap bytes that are already in memory.
    pub fn from_bytes(bytes: Vec<u8>, filename: impl Into<String>) -> Result<Self, Pdf2PptxError> {
        let filename = filename.into();
        check_magic(&bytes, &filename)?;
        Ok(Self {
            bytes,
            filename,
            source: InputSource::Memory,
        })
    }

    /// File stem, used as the deck title when the PDF has none.
    pub fn stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a PDF in memory.
///
/// URLs are fetched with a `timeout_secs` limit; anything else is read as a
/// local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputDocument, Pdf2PptxError> {
    if input.trim().is_empty() {
        return Err(Pdf2PptxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input))
    }
}

/// Read a local PDF, validating existence, permissions and magic bytes.
pub fn read_local(path: &Path) -> Result<InputDocument, Pdf2PptxError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2PptxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Pdf2PptxError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    check_magic(&bytes, &filename)?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(InputDocument {
        bytes,
        filename,
        source: InputSource::Local(path.to_path_buf()),
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<InputDocument, Pdf2PptxError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2PptxError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    let filename = filename_from_url(url);
    check_magic(&bytes, &filename)?;

    info!("Downloaded {} bytes as {}", bytes.len(), filename);
    Ok(InputDocument {
        bytes: bytes.to_vec(),
        filename,
        source: InputSource::Url(url.to_string()),
    })
}

/// Last path segment of `url` if it looks like a file name, else
/// `"downloaded.pdf"`.
pub fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

fn check_magic(bytes: &[u8], name: &str) -> Result<(), Pdf2PptxError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(Pdf2PptxError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_comes_from_last_segment() {
        assert_eq!(filename_from_url("https://example.com/papers/q3.pdf"), "q3.pdf");
        assert_eq!(filename_from_url("https://example.com/papers/q3.pdf?dl=1"), "q3.pdf");
        assert_eq!(filename_from_url("https://example.com/download"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
    }

    #[test]
    fn local_pdf_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7\n%fake")
            .unwrap();

        let doc = read_local(&path).unwrap();
        assert_eq!(doc.filename, "report.pdf");
        assert_eq!(doc.stem(), "report");
        assert_eq!(doc.source, InputSource::Local(path));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Pdf2PptxError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected() {
        let err = InputDocument::from_bytes(b"<html>".to_vec(), "page.html").unwrap_err();
        match err {
            Pdf2PptxError::NotAPdf { name, magic } => {
                assert_eq!(name, "page.html");
                assert_eq!(magic, b"<htm".to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(InputDocument::from_bytes(Vec::new(), "empty.pdf").is_err());
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2PptxError::InvalidInput { .. }));
    }
}

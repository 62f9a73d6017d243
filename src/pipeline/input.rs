//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a temp file?
//!
//! The OCR stage reads whole files from disk, and keeping the downloaded
//! bytes inside a `TempDir` ensures cleanup happens automatically when
//! `ResolvedInput` is dropped, even if the process panics. We validate the
//! image magic bytes before returning so callers get a meaningful
//! `UnsupportedFormat` error rather than a decoder failure deep in the
//! OCR stage.

use crate::error::Ocr2InvoiceError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// File extensions the pipeline accepts (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; image downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the image file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// True when the path carries one of the supported image extensions.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// True when the first bytes identify a supported image container.
fn is_supported_magic(magic: &[u8; 4]) -> bool {
    magic.starts_with(&[0x89, b'P', b'N', b'G'])      // PNG
        || magic.starts_with(&[0xFF, 0xD8, 0xFF])     // JPEG
        || magic.starts_with(b"BM")                   // BMP
        || magic == b"II*\0"                          // TIFF little-endian
        || magic == b"MM\0*" // TIFF big-endian
}

/// Resolve the input string to a local image file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, Ocr2InvoiceError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and image magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Ocr2InvoiceError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Ocr2InvoiceError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && !is_supported_magic(&magic) {
                return Err(Ocr2InvoiceError::UnsupportedFormat { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Ocr2InvoiceError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Ocr2InvoiceError::FileNotFound { path });
        }
    }

    debug!("Resolved local image: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Ocr2InvoiceError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Ocr2InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Ocr2InvoiceError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Ocr2InvoiceError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Ocr2InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| Ocr2InvoiceError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Ocr2InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    // Verify image magic bytes before writing anything permanent.
    if bytes.len() >= 4 {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if !is_supported_magic(&magic) {
            return Err(Ocr2InvoiceError::UnsupportedFormat {
                path: file_path,
                magic,
            });
        }
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Ocr2InvoiceError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/scan.png"));
        assert!(is_url("http://example.com/scan.png"));
        assert!(!is_url("/tmp/scan.png"));
        assert!(!is_url("scan.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(has_supported_extension(Path::new("a.PNG")));
        assert!(has_supported_extension(Path::new("a.jpeg")));
        assert!(has_supported_extension(Path::new("dir/a.TIFF")));
        assert!(!has_supported_extension(Path::new("a.gif")));
        assert!(!has_supported_extension(Path::new("a")));
    }

    #[test]
    fn magic_bytes_recognised() {
        assert!(is_supported_magic(&[0x89, b'P', b'N', b'G']));
        assert!(is_supported_magic(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(is_supported_magic(b"BM\x3a\x00"));
        assert!(is_supported_magic(b"II*\0"));
        assert!(is_supported_magic(b"MM\0*"));
        assert!(!is_supported_magic(b"GIF8"));
        assert!(!is_supported_magic(b"%PDF"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/a/real/scan.png").unwrap_err();
        assert!(matches!(err, Ocr2InvoiceError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"GIF89a not an invoice").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Ocr2InvoiceError::UnsupportedFormat { .. }));
    }

    #[test]
    fn png_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap();
        let resolved = resolve_local(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[test]
    fn filename_extraction() {
        assert_eq!(
            extract_filename("https://example.com/scans/invoice.png"),
            "invoice.png"
        );
        assert_eq!(extract_filename("https://example.com/"), "downloaded.png");
    }
}

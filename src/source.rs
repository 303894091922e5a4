//! Where the raw table bytes come from.
//!
//! The decoder itself never touches the network.  A [`ByteSource`] hands the
//! loader a complete buffer; [`CachedFileSource`] reads the local cache file
//! and, if it is missing, asks a [`Downloader`] to fetch a copy first.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::error::SourceError;

pub trait ByteSource: Send + Sync {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}

pub trait Downloader: Send + Sync {
    fn url(&self) -> &str;
    /// Download to `dest`, replacing any existing file.
    fn download(&self, dest: &Path) -> Result<(), SourceError>;
}

// ── MemorySource ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ByteSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} B)", self.bytes.len())
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.clone())
    }
}

// ── CachedFileSource ──────────────────────────────────────────────────────────

pub struct CachedFileSource {
    path:       PathBuf,
    downloader: Option<Box<dyn Downloader>>,
}

impl CachedFileSource {
    /// Local file only; a missing file is [`SourceError::NotFound`].
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_owned(), downloader: None }
    }

    pub fn with_downloader<P: AsRef<Path>>(path: P, downloader: Box<dyn Downloader>) -> Self {
        Self { path: path.as_ref().to_owned(), downloader: Some(downloader) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn download_missing(&self) -> Result<(), SourceError> {
        let downloader = match &self.downloader {
            Some(d) => d,
            None    => return Err(SourceError::NotFound(self.path.clone())),
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        // Download next to the cache file and rename it into place, so an
        // interrupted download never leaves a partial table at `path`.
        let partial = self.partial_path();
        info!(url = downloader.url(), path = %self.path.display(), "LUT file not found, downloading");
        if let Err(e) = downloader.download(&partial) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &self.path)?;
        info!(path = %self.path.display(), "downloaded LUT file");
        Ok(())
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".part");
        self.path.with_file_name(name)
    }
}

impl ByteSource for CachedFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        if !self.path.is_file() {
            self.download_missing()?;
        }
        Ok(fs::read(&self.path)?)
    }
}

// ── CommandDownloader ─────────────────────────────────────────────────────────

/// Downloads with `curl`, falling back to `wget`.  Network timeouts are
/// whatever those tools default to.
#[derive(Debug, Clone)]
pub struct CommandDownloader {
    url: String,
}

impl CommandDownloader {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<(), String> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("{program}: {e}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{program} exited with {status}"))
        }
    }
}

impl Downloader for CommandDownloader {
    fn url(&self) -> &str {
        &self.url
    }

    fn download(&self, dest: &Path) -> Result<(), SourceError> {
        let dest_str = dest.to_string_lossy();
        let curl_err = match self.run("curl", &["-fsSL", "-o", &*dest_str, self.url.as_str()]) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!(error = %curl_err, "curl download failed, trying wget");
        self.run("wget", &["-q", "-O", &*dest_str, self.url.as_str()]).map_err(|wget_err| {
            // wget leaves an empty file behind on failure.
            let _ = fs::remove_file(dest);
            SourceError::Download {
                url:    self.url.clone(),
                reason: format!("{curl_err}; {wget_err}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedDownloader {
        bytes: Vec<u8>,
        calls: Arc<AtomicUsize>,
    }

    /// Writes part of the file, then fails.
    struct InterruptedDownloader;

    impl Downloader for InterruptedDownloader {
        fn url(&self) -> &str {
            "https://example.invalid/blz.lut"
        }

        fn download(&self, dest: &Path) -> Result<(), SourceError> {
            fs::write(dest, b"BLZ Lookup")?;
            Err(SourceError::Download { url: self.url().into(), reason: "connection reset".into() })
        }
    }

    impl Downloader for FixedDownloader {
        fn url(&self) -> &str {
            "https://example.invalid/blz.lut"
        }

        fn download(&self, dest: &Path) -> Result<(), SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(dest, &self.bytes)?;
            Ok(())
        }
    }

    #[test]
    fn missing_file_without_downloader_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let src = CachedFileSource::new(dir.path().join("blz.lut"));
        assert!(matches!(src.fetch(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn downloads_once_then_reads_cache() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("nested").join("blz.lut");
        let calls = Arc::new(AtomicUsize::new(0));
        let src   = CachedFileSource::with_downloader(
            &path,
            Box::new(FixedDownloader { bytes: b"payload".to_vec(), calls: calls.clone() }),
        );
        assert_eq!(src.fetch().unwrap(), b"payload");
        assert_eq!(src.fetch().unwrap(), b"payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(path.is_file());
    }

    #[test]
    fn interrupted_download_leaves_no_cache_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("blz.lut");
        let src  = CachedFileSource::with_downloader(&path, Box::new(InterruptedDownloader));
        assert!(matches!(src.fetch(), Err(SourceError::Download { .. })));
        assert!(!path.exists());
        assert!(!dir.path().join("blz.lut.part").exists());

        // A later attempt downloads again instead of reading the fragment.
        let calls = Arc::new(AtomicUsize::new(0));
        let src   = CachedFileSource::with_downloader(
            &path,
            Box::new(FixedDownloader { bytes: b"payload".to_vec(), calls: calls.clone() }),
        );
        assert_eq!(src.fetch().unwrap(), b"payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("blz.lut.part").exists());
    }
}

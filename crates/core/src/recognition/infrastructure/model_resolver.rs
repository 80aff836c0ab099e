use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine a cache directory")]
    NoCacheDir,
    #[error("failed to create model cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`; `total_bytes` is 0
/// when the server sent no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolves a detection model by name: per-user cache first, download
/// otherwise.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached = cache_dir.join(name);
    if cached.exists() {
        return Ok(cached);
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached, progress)?;
    Ok(cached)
}

/// Platform cache location for detection models, e.g.
/// `~/.cache/Rollcall/models/` on Linux.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("Rollcall").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Downloads to a `.part` sibling and renames into place, so an interrupted
/// download never leaves a half-written model behind.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let partial = dest.with_extension("part");
    let result = fetch_to_disk(url, dest, &partial, progress);
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn fetch_to_disk(
    url: &str,
    dest: &Path,
    partial: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error, path: &Path| ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(partial).map_err(|e| write_err(e, partial))?;

    // Stream in chunks; models are small but there is no reason to hold the
    // whole body in memory.
    let mut buf = vec![0u8; 256 * 1024];
    let mut received: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(|e| write_err(e, partial))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(|e| write_err(e, partial))?;
        received += n as u64;
        if let Some(ref report) = progress {
            report(received, total);
        }
    }
    file.flush().map_err(|e| write_err(e, partial))?;
    drop(file);

    fs::rename(partial, dest).map_err(|e| write_err(e, dest))
}

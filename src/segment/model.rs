use std::{
    ffi::OsString,
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use anyhow::Context as _;
use tracing::{error, info};

use crate::foundation::error::{PortraitError, PortraitResult};
use crate::foundation::fs::ensure_dir;
use crate::segment::{Segmenter, SegmenterFactory};

/// Release location of the u2net segmentation weights.
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2net.onnx";

const CHUNK_SIZE: usize = 8192;

/// `~/.u2net/u2net.onnx`, where rembg-compatible tooling looks for the model.
pub fn default_model_path() -> Option<PathBuf> {
    directories_next::BaseDirs::new().map(|d| d.home_dir().join(".u2net").join("u2net.onnx"))
}

/// Cooperative cancellation flag polled between download chunks.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the download to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a model download ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was installed.
    Completed {
        /// Size of the downloaded file.
        bytes: u64,
    },
    /// Stopped through the [`CancelFlag`]; nothing was installed.
    Cancelled,
}

/// A downloadable background-removal model file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAsset {
    /// Download URL.
    pub url: String,
    /// Install location.
    pub path: PathBuf,
}

impl ModelAsset {
    /// Asset fetched from `url` and installed at `path`.
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Default URL and home-directory location.
    pub fn with_defaults() -> PortraitResult<Self> {
        let path = default_model_path().ok_or_else(|| {
            PortraitError::model_unavailable("cannot determine home directory for model path")
        })?;
        Ok(Self::new(DEFAULT_MODEL_URL, path))
    }

    /// Whether the model file exists.
    pub fn is_installed(&self) -> bool {
        self.path.is_file()
    }

    /// The model path, or `ModelUnavailable` when it is not installed.
    pub fn require(&self) -> PortraitResult<&Path> {
        if self.is_installed() {
            Ok(&self.path)
        } else {
            Err(PortraitError::model_unavailable(format!(
                "model not installed at '{}'",
                self.path.display()
            )))
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut s = OsString::from(self.path.as_os_str());
        s.push(".tmp");
        PathBuf::from(s)
    }

    /// Fetch the model over HTTP, honouring `cancel` between chunks.
    pub fn download(
        &self,
        cancel: &CancelFlag,
        progress: impl FnMut(f32),
    ) -> PortraitResult<DownloadOutcome> {
        info!(url = %self.url, "starting model download");
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("build http client")?;
        let response = client
            .get(self.url.as_str())
            .send()
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()
            .context("model download returned an error status")?;
        let total = response.content_length();
        self.install_from_reader(response, total, cancel, progress)
    }

    /// Run [`ModelAsset::download`] on a detached thread.
    pub fn spawn_download(
        self,
        cancel: CancelFlag,
        progress: impl FnMut(f32) + Send + 'static,
    ) -> JoinHandle<PortraitResult<DownloadOutcome>> {
        std::thread::spawn(move || {
            let result = self.download(&cancel, progress);
            if let Err(e) = &result {
                error!(error = %e, "model download failed");
            }
            result
        })
    }

    /// Stream `reader` into `<path>.tmp`, then rename over `path`.
    ///
    /// On cancellation or failure the temp file is removed and `path` is untouched.
    pub(crate) fn install_from_reader<R: Read>(
        &self,
        mut reader: R,
        total: Option<u64>,
        cancel: &CancelFlag,
        mut progress: impl FnMut(f32),
    ) -> PortraitResult<DownloadOutcome> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let tmp = self.temp_path();

        let streamed = (|| -> std::io::Result<Option<u64>> {
            let mut out = fs::File::create(&tmp)?;
            let mut buf = vec![0u8; CHUNK_SIZE];
            let mut written = 0u64;
            loop {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])?;
                written += n as u64;
                if let Some(total) = total.filter(|t| *t > 0) {
                    progress((written as f64 / total as f64).min(1.0) as f32);
                }
            }
            out.sync_all()?;
            Ok(Some(written))
        })();

        match streamed {
            Ok(Some(bytes)) => {
                fs::rename(&tmp, &self.path).map_err(|e| {
                    let _ = fs::remove_file(&tmp);
                    PortraitError::io(format!("install model '{}'", self.path.display()), e)
                })?;
                info!(bytes, path = %self.path.display(), "model download completed");
                Ok(DownloadOutcome::Completed { bytes })
            }
            Ok(None) => {
                let _ = fs::remove_file(&tmp);
                info!("model download cancelled");
                Ok(DownloadOutcome::Cancelled)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(PortraitError::io("download model", e))
            }
        }
    }
}

/// Wraps a factory so initialization fails with `ModelUnavailable` until the model is installed.
#[derive(Clone, Debug)]
pub struct ModelGated<F> {
    /// Model that must be installed.
    pub asset: ModelAsset,
    /// Factory used once the model is present.
    pub inner: F,
}

impl<F> ModelGated<F> {
    /// Gate `inner` on `asset` being installed.
    pub fn new(asset: ModelAsset, inner: F) -> Self {
        Self { asset, inner }
    }
}

impl<F: SegmenterFactory> SegmenterFactory for ModelGated<F> {
    fn create(&self) -> PortraitResult<Arc<dyn Segmenter>> {
        self.asset.require()?;
        self.inner.create()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/segment/model.rs"]
mod tests;

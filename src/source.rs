//! Source video resolution.
//!
//! A composition input is either a template in a local library directory or a
//! remote URL fetched with ffmpeg into a temporary file. Every failure mode on
//! either path folds into [`BanderoleError::VideoNotFound`]: callers cannot
//! usefully distinguish "does not exist" from "could not be fetched", and the
//! underlying cause is logged instead.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use crate::error::{BanderoleError, BanderoleResult};

/// Hard wall-clock limit on a remote fetch.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads smaller than this are error pages or truncated streams, not video.
const MIN_DOWNLOAD_BYTES: u64 = 1000;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where a composition's footage comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSource {
    /// `{library}/{scenario}.mp4` on the local filesystem.
    LocalTemplate { library: PathBuf, scenario: String },
    /// A URL ffmpeg can read; fetched with a stream copy, no re-encode.
    RemoteUrl { url: String },
}

impl VideoSource {
    fn display_name(&self) -> String {
        match self {
            Self::LocalTemplate { scenario, .. } => scenario.clone(),
            Self::RemoteUrl { url } => url.clone(),
        }
    }
}

/// A locally readable video file, possibly backed by a temporary download.
///
/// The temp file (remote case) is deleted when this value drops.
#[derive(Debug)]
pub struct ResolvedVideo {
    path: PathBuf,
    _temp: Option<tempfile::TempPath>,
}

impl ResolvedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Materialize `source` as a local file.
pub fn resolve(source: &VideoSource, ffmpeg: &Path) -> BanderoleResult<ResolvedVideo> {
    match source {
        VideoSource::LocalTemplate { library, scenario } => {
            let path = library.join(format!("{scenario}.mp4"));
            if !path.is_file() {
                return Err(BanderoleError::not_found(
                    scenario,
                    library.display().to_string(),
                ));
            }
            Ok(ResolvedVideo { path, _temp: None })
        }
        VideoSource::RemoteUrl { url } => download(source, url, ffmpeg),
    }
}

fn download(source: &VideoSource, url: &str, ffmpeg: &Path) -> BanderoleResult<ResolvedVideo> {
    let not_found = || BanderoleError::not_found(source.display_name(), "remote");

    let temp = tempfile::Builder::new()
        .prefix("banderole-fetch-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to create temp file for download");
            not_found()
        })?
        .into_temp_path();

    let mut child = Command::new(ffmpeg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .args(["-y", "-loglevel", "error", "-i", url, "-c", "copy"])
        .arg(temp.as_os_str())
        .spawn()
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to spawn ffmpeg for download");
            not_found()
        })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= DOWNLOAD_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(url, "download timed out");
                    return Err(not_found());
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(url, error = %e, "failed to poll ffmpeg download");
                return Err(not_found());
            }
        }
    };

    if !status.success() {
        tracing::warn!(url, %status, "ffmpeg download exited with an error");
        return Err(not_found());
    }

    let len = std::fs::metadata(&temp).map(|m| m.len()).unwrap_or(0);
    if !download_size_ok(len) {
        tracing::warn!(url, len, "download too small to be a video");
        return Err(not_found());
    }

    Ok(ResolvedVideo {
        path: temp.to_path_buf(),
        _temp: Some(temp),
    })
}

fn download_size_ok(len: u64) -> bool {
    len >= MIN_DOWNLOAD_BYTES
}

//! Top-level entry point: resolve the source, compose, clean up.

use std::path::PathBuf;

use crate::{
    compose::{compose, ComposeRequest, ComposeStats, TrimSpec},
    config::{ComposeConfig, FfmpegPaths},
    error::BanderoleResult,
    source::{resolve, VideoSource},
};

/// Everything needed to produce one captioned vertical video.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub source: VideoSource,
    pub caption: String,
    pub font_path: PathBuf,
    pub trim: TrimSpec,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

/// Resolve the source video, run the composition, and write the MP4.
///
/// A remote source is fetched into a temp file that is removed on every exit
/// path, success or error, when the resolved handle drops.
#[tracing::instrument(skip_all, fields(out = %req.out_path.display()))]
pub fn generate_video(
    req: &GenerateRequest,
    cfg: &ComposeConfig,
    paths: &FfmpegPaths,
) -> BanderoleResult<ComposeStats> {
    let resolved = resolve(&req.source, &paths.ffmpeg)?;
    tracing::info!(source = %resolved.path().display(), "source resolved");

    let stats = compose(
        &ComposeRequest {
            source_path: resolved.path(),
            caption: &req.caption,
            font_path: &req.font_path,
            trim: req.trim,
            out_path: &req.out_path,
            overwrite: req.overwrite,
        },
        cfg,
        paths,
    )?;

    tracing::info!(
        frames = stats.frames,
        duration_sec = stats.duration_sec,
        audio = stats.had_audio,
        "composition finished"
    );
    Ok(stats)
}

/// Convenience constructor for the common library-template case.
pub fn library_source(library: impl Into<PathBuf>, scenario: impl Into<String>) -> VideoSource {
    VideoSource::LocalTemplate {
        library: library.into(),
        scenario: scenario.into(),
    }
}

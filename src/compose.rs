//! The composition run: trim, fit, banner, per-frame layering, encode.

use std::path::Path;

use crate::{
    banner::BannerRenderer,
    composite_cpu::{blit_opaque, fade_from_black_in_place, fill_black},
    config::{ComposeConfig, FfmpegPaths},
    encode_ffmpeg::{AudioInput, EncodeConfig, FfmpegEncoder},
    error::{BanderoleError, BanderoleResult},
    geometry::fit,
    media::{probe_video, FrameReader},
};

/// Seconds to drop from each end of the source before composing.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrimSpec {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TrimSpec {
    pub fn validate(&self) -> BanderoleResult<()> {
        if !self.start_sec.is_finite()
            || !self.end_sec.is_finite()
            || self.start_sec < 0.0
            || self.end_sec < 0.0
        {
            return Err(BanderoleError::validation(
                "trim seconds must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Resolve the `(start, duration)` window inside a source of
    /// `duration_sec`. Trims that would consume the whole source are dropped
    /// wholesale and the full source is used instead.
    pub fn apply(&self, duration_sec: f64) -> (f64, f64) {
        if self.start_sec + self.end_sec >= duration_sec {
            return (0.0, duration_sec);
        }
        (self.start_sec, duration_sec - self.start_sec - self.end_sec)
    }
}

/// One composition job over an already-resolved local source file.
#[derive(Debug)]
pub struct ComposeRequest<'a> {
    pub source_path: &'a Path,
    pub caption: &'a str,
    pub font_path: &'a Path,
    pub trim: TrimSpec,
    pub out_path: &'a Path,
    pub overwrite: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ComposeStats {
    pub frames: u64,
    pub duration_sec: f64,
    pub had_audio: bool,
}

/// Brightness multiplier for the fade-in at time `t`.
pub(crate) fn fade_factor(t_sec: f64, fade_in_sec: f64) -> f32 {
    if fade_in_sec <= 0.0 {
        return 1.0;
    }
    (t_sec / fade_in_sec).clamp(0.0, 1.0) as f32
}

/// Run one composition end to end and write the output MP4.
pub fn compose(
    req: &ComposeRequest<'_>,
    cfg: &ComposeConfig,
    paths: &FfmpegPaths,
) -> BanderoleResult<ComposeStats> {
    cfg.validate()?;
    req.trim.validate()?;

    let info = probe_video(&paths.ffprobe, req.source_path)?;
    if !(info.duration_sec > 0.0) {
        return Err(BanderoleError::pipeline(format!(
            "source '{}' reports no duration",
            req.source_path.display()
        )));
    }
    let (start_sec, duration_sec) = req.trim.apply(info.duration_sec);
    let trims_requested = req.trim.start_sec > 0.0 || req.trim.end_sec > 0.0;
    if trims_requested && req.trim.start_sec + req.trim.end_sec >= info.duration_sec {
        tracing::warn!(
            source_duration = info.duration_sec,
            trim_start = req.trim.start_sec,
            trim_end = req.trim.end_sec,
            "trims exceed the source duration, using the full source"
        );
    }

    let out = cfg.output;
    let target = out.target();
    let plan = fit(info.dims(), target)?;
    tracing::debug!(
        source_w = info.width,
        source_h = info.height,
        scaled_w = plan.scaled.width,
        scaled_h = plan.scaled.height,
        crop_x = plan.crop_x,
        crop_y = plan.crop_y,
        "fit plan"
    );

    let banner = BannerRenderer::new().render(
        req.caption,
        req.font_path,
        out.banner_dims(),
        &cfg.font_search,
    )?;
    tracing::debug!(
        font_size = banner.font_size,
        lines = banner.wrapped.lines().count(),
        "banner laid out"
    );

    let mut reader = FrameReader::open(
        &paths.ffmpeg,
        req.source_path,
        start_sec,
        duration_sec,
        &plan,
        target,
    )?;

    let mut encoder = FfmpegEncoder::new(&EncodeConfig {
        width: out.width,
        height: out.height,
        fps: info.fps,
        preset: cfg.preset,
        out_path: req.out_path.to_path_buf(),
        overwrite: req.overwrite,
        audio: info.has_audio.then(|| AudioInput {
            path: req.source_path.to_path_buf(),
            offset_sec: start_sec,
            duration_sec,
        }),
        ffmpeg_bin: paths.ffmpeg.clone(),
    })?;

    let frame_len = target.width as usize * target.height as usize * 4;
    let mut video_buf = vec![0u8; frame_len];
    let mut frame = vec![0u8; frame_len];
    let frame_dt = info.fps.frame_duration_secs();
    let banner_dims = out.banner_dims();

    let mut frames: u64 = 0;
    while reader.next_frame(&mut video_buf)? {
        fill_black(&mut frame, target)?;
        blit_opaque(
            &mut frame,
            target,
            &video_buf,
            target,
            0,
            out.video_top_offset,
        )?;
        blit_opaque(&mut frame, target, &banner.rgba8, banner_dims, 0, 0)?;

        let factor = fade_factor(frames as f64 * frame_dt, out.fade_in_sec);
        fade_from_black_in_place(&mut frame, factor)?;

        encoder.write_frame(&frame)?;
        frames += 1;
    }

    reader.finish()?;
    encoder.finish()?;

    if frames == 0 {
        return Err(BanderoleError::pipeline(
            "decoder produced no frames for the requested window",
        ));
    }

    Ok(ComposeStats {
        frames,
        duration_sec,
        had_audio: info.has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_carve_the_window_from_both_ends() {
        let trim = TrimSpec {
            start_sec: 2.0,
            end_sec: 3.0,
        };
        assert_eq!(trim.apply(10.0), (2.0, 5.0));
    }

    #[test]
    fn oversized_trims_fall_back_to_the_full_source() {
        let trim = TrimSpec {
            start_sec: 6.0,
            end_sec: 5.0,
        };
        assert_eq!(trim.apply(10.0), (0.0, 10.0));

        // Exactly consuming the source also falls back.
        let trim = TrimSpec {
            start_sec: 5.0,
            end_sec: 5.0,
        };
        assert_eq!(trim.apply(10.0), (0.0, 10.0));
    }

    #[test]
    fn zero_trims_pass_the_source_through() {
        assert_eq!(TrimSpec::default().apply(7.5), (0.0, 7.5));
    }

    #[test]
    fn negative_trims_are_rejected() {
        let trim = TrimSpec {
            start_sec: -1.0,
            end_sec: 0.0,
        };
        assert!(trim.validate().is_err());
    }

    #[test]
    fn fade_ramps_linearly_then_saturates() {
        assert_eq!(fade_factor(0.0, 1.0), 0.0);
        assert!((fade_factor(0.5, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(fade_factor(1.0, 1.0), 1.0);
        assert_eq!(fade_factor(30.0, 1.0), 1.0);
    }

    #[test]
    fn zero_fade_means_full_brightness_from_the_first_frame() {
        assert_eq!(fade_factor(0.0, 0.0), 1.0);
    }
}

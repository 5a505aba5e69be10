//! Composition configuration.
//!
//! The two historical call sites of this pipeline (interactive single-video
//! use and server/batch use) diverged on the video offset, the font-size
//! search range, and the encoder preset. Both live here as named profiles
//! instead of forked code paths.

use std::path::{Path, PathBuf};

use crate::error::{BanderoleError, BanderoleResult};
use crate::geometry::Dims;

/// Fixed portrait output geometry plus the banner/fade parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputSpec {
    pub width: u32,
    pub height: u32,
    /// Height of the white caption strip composited at (0, 0).
    pub banner_height: u32,
    /// Vertical pixel offset at which the fitted video layer is placed.
    pub video_top_offset: u32,
    /// Linear fade-in from black, anchored at t = 0.
    pub fade_in_sec: f64,
}

impl OutputSpec {
    pub fn validate(&self) -> BanderoleResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BanderoleError::validation(
                "output width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(BanderoleError::validation(
                "output width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.banner_height >= self.height {
            return Err(BanderoleError::validation(
                "banner height must be smaller than the output height",
            ));
        }
        if self.video_top_offset >= self.height {
            return Err(BanderoleError::validation(
                "video top offset must lie inside the output frame",
            ));
        }
        if !self.fade_in_sec.is_finite() || self.fade_in_sec < 0.0 {
            return Err(BanderoleError::validation(
                "fade-in seconds must be finite and >= 0",
            ));
        }
        Ok(())
    }

    pub fn target(&self) -> Dims {
        Dims {
            width: self.width,
            height: self.height,
        }
    }

    pub fn banner_dims(&self) -> Dims {
        Dims {
            width: self.width,
            height: self.banner_height,
        }
    }
}

/// Font-size search parameters for the caption banner.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BannerFontSearch {
    pub start_size: f32,
    pub min_size: f32,
    pub step: f32,
    /// Horizontal and vertical inset between the banner edge and the text box.
    pub padding: u32,
}

impl BannerFontSearch {
    pub fn validate(&self) -> BanderoleResult<()> {
        if !(self.min_size > 0.0) || !(self.start_size >= self.min_size) {
            return Err(BanderoleError::validation(
                "banner font sizes must satisfy 0 < min <= start",
            ));
        }
        if !(self.step > 0.0) {
            return Err(BanderoleError::validation("banner font step must be > 0"));
        }
        Ok(())
    }
}

/// Encoder speed/quality trade-off, mapped onto libx264 presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderPreset {
    /// Higher-quality output for interactive single-video use.
    Quality,
    /// Accelerated encoding for server/batch use.
    Throughput,
}

impl EncoderPreset {
    pub fn as_x264_preset(self) -> &'static str {
        match self {
            Self::Quality => "medium",
            Self::Throughput => "ultrafast",
        }
    }
}

/// Full configuration for one composition run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComposeConfig {
    pub output: OutputSpec,
    pub font_search: BannerFontSearch,
    pub preset: EncoderPreset,
}

impl ComposeConfig {
    /// Profile used by the single-video interactive tool.
    pub fn interactive() -> Self {
        Self {
            output: OutputSpec {
                width: 1080,
                height: 1920,
                banner_height: 346,
                video_top_offset: 120,
                fade_in_sec: 1.0,
            },
            font_search: BannerFontSearch {
                start_size: 80.0,
                min_size: 24.0,
                step: 4.0,
                padding: 40,
            },
            preset: EncoderPreset::Quality,
        }
    }

    /// Profile used by the server/batch generator.
    pub fn server() -> Self {
        Self {
            output: OutputSpec {
                width: 1080,
                height: 1920,
                banner_height: 346,
                video_top_offset: 155,
                fade_in_sec: 1.0,
            },
            font_search: BannerFontSearch {
                start_size: 60.0,
                min_size: 20.0,
                step: 4.0,
                padding: 40,
            },
            preset: EncoderPreset::Throughput,
        }
    }

    pub fn validate(&self) -> BanderoleResult<()> {
        self.output.validate()?;
        self.font_search.validate()?;
        Ok(())
    }
}

/// Locations of the external codec binaries.
///
/// Passed explicitly through the pipeline rather than read from ambient
/// process state at call time.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FfmpegPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegPaths {
    /// Resolve binary locations from `BANDEROLE_FFMPEG` / `BANDEROLE_FFPROBE`,
    /// falling back to PATH lookup by name.
    pub fn from_env() -> Self {
        let mut paths = Self::default();
        if let Ok(p) = std::env::var("BANDEROLE_FFMPEG")
            && !p.is_empty()
        {
            paths.ffmpeg = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("BANDEROLE_FFPROBE")
            && !p.is_empty()
        {
            paths.ffprobe = PathBuf::from(p);
        }
        paths
    }

    pub fn ffmpeg_available(&self) -> bool {
        binary_responds(&self.ffmpeg)
    }

    pub fn ffprobe_available(&self) -> bool {
        binary_responds(&self.ffprobe)
    }
}

fn binary_responds(bin: &Path) -> bool {
    std::process::Command::new(bin)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_validate() {
        ComposeConfig::interactive().validate().unwrap();
        ComposeConfig::server().validate().unwrap();
    }

    #[test]
    fn profiles_differ_where_the_call_sites_did() {
        let a = ComposeConfig::interactive();
        let b = ComposeConfig::server();
        assert_eq!(a.output.video_top_offset, 120);
        assert_eq!(b.output.video_top_offset, 155);
        assert_eq!(a.font_search.start_size, 80.0);
        assert_eq!(b.font_search.start_size, 60.0);
        assert_eq!(a.preset.as_x264_preset(), "medium");
        assert_eq!(b.preset.as_x264_preset(), "ultrafast");
    }

    #[test]
    fn output_validation_catches_bad_values() {
        let mut spec = ComposeConfig::interactive().output;
        spec.width = 1081;
        assert!(spec.validate().is_err());

        let mut spec = ComposeConfig::interactive().output;
        spec.banner_height = 1920;
        assert!(spec.validate().is_err());

        let mut spec = ComposeConfig::interactive().output;
        spec.fade_in_sec = -1.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn font_search_validation_catches_bad_ranges() {
        let mut fs = ComposeConfig::server().font_search;
        fs.min_size = 90.0;
        assert!(fs.validate().is_err());

        let mut fs = ComposeConfig::server().font_search;
        fs.step = 0.0;
        assert!(fs.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ComposeConfig::server();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ComposeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}

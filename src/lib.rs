#![forbid(unsafe_code)]

pub mod banner;
pub mod compose;
pub mod composite_cpu;
pub mod config;
pub mod encode_ffmpeg;
pub mod error;
pub mod geometry;
pub mod media;
pub mod pipeline;
pub mod source;

pub use banner::{BannerRenderer, RenderedBanner};
pub use compose::{ComposeRequest, ComposeStats, TrimSpec};
pub use config::{ComposeConfig, EncoderPreset, FfmpegPaths, OutputSpec};
pub use error::{BanderoleError, BanderoleResult};
pub use geometry::{fit, Dims, FitPlan};
pub use media::{Fps, MediaInfo};
pub use pipeline::{generate_video, GenerateRequest};
pub use source::{ResolvedVideo, VideoSource};

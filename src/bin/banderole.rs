use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use banderole::{
    compose::TrimSpec,
    pipeline::{generate_video, GenerateRequest},
    source::VideoSource,
    BannerRenderer, ComposeConfig, FfmpegPaths,
};

#[derive(Parser, Debug)]
#[command(name = "banderole", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a captioned vertical MP4 (requires `ffmpeg` and `ffprobe`).
    Render(RenderArgs),
    /// Rasterize just the caption banner as a PNG.
    Banner(BannerArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template name, resolved as `{library}/{scenario}.mp4`.
    #[arg(long, conflicts_with = "url", requires = "library")]
    scenario: Option<String>,

    /// Template library directory.
    #[arg(long)]
    library: Option<PathBuf>,

    /// Remote source URL, fetched with ffmpeg.
    #[arg(long, required_unless_present = "scenario")]
    url: Option<String>,

    /// Caption text for the banner.
    #[arg(long)]
    caption: String,

    /// TrueType/OpenType font for the caption.
    #[arg(long)]
    font: PathBuf,

    /// Seconds to drop from the start of the source.
    #[arg(long, default_value_t = 0.0)]
    trim_start: f64,

    /// Seconds to drop from the end of the source.
    #[arg(long, default_value_t = 0.0)]
    trim_end: f64,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Composition profile.
    #[arg(long, value_enum, default_value_t = ProfileChoice::Interactive)]
    profile: ProfileChoice,

    /// Refuse to overwrite an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// Path to the ffmpeg binary (default: `BANDEROLE_FFMPEG` or PATH).
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary (default: `BANDEROLE_FFPROBE` or PATH).
    #[arg(long)]
    ffprobe: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct BannerArgs {
    /// Caption text for the banner.
    #[arg(long)]
    caption: String,

    /// TrueType/OpenType font for the caption.
    #[arg(long)]
    font: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Composition profile (sets banner size and the font search range).
    #[arg(long, value_enum, default_value_t = ProfileChoice::Interactive)]
    profile: ProfileChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileChoice {
    Interactive,
    Server,
}

impl ProfileChoice {
    fn config(self) -> ComposeConfig {
        match self {
            Self::Interactive => ComposeConfig::interactive(),
            Self::Server => ComposeConfig::server(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Banner(args) => cmd_banner(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let source = match (&args.scenario, &args.library, &args.url) {
        (Some(scenario), Some(library), None) => VideoSource::LocalTemplate {
            library: library.clone(),
            scenario: scenario.clone(),
        },
        (None, _, Some(url)) => VideoSource::RemoteUrl { url: url.clone() },
        _ => anyhow::bail!("pass either --scenario with --library, or --url"),
    };

    let mut paths = FfmpegPaths::from_env();
    if let Some(p) = args.ffmpeg {
        paths.ffmpeg = p;
    }
    if let Some(p) = args.ffprobe {
        paths.ffprobe = p;
    }

    let req = GenerateRequest {
        source,
        caption: args.caption,
        font_path: args.font,
        trim: TrimSpec {
            start_sec: args.trim_start,
            end_sec: args.trim_end,
        },
        out_path: args.out,
        overwrite: !args.no_overwrite,
    };

    let stats = generate_video(&req, &args.profile.config(), &paths)?;
    eprintln!(
        "wrote {} ({} frames, {:.2}s)",
        req.out_path.display(),
        stats.frames,
        stats.duration_sec
    );
    Ok(())
}

fn cmd_banner(args: BannerArgs) -> anyhow::Result<()> {
    let cfg = args.profile.config();
    let banner = BannerRenderer::new().render(
        &args.caption,
        &args.font,
        cfg.output.banner_dims(),
        &cfg.font_search,
    )?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &banner.rgba8,
        banner.width,
        banner.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} (font size {:.0})",
        args.out.display(),
        banner.font_size
    );
    Ok(())
}

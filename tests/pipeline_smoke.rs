use std::{path::Path, process::Command};

use banderole::{
    compose::TrimSpec,
    media::probe_video,
    pipeline::{generate_video, GenerateRequest},
    source::VideoSource,
    ComposeConfig, FfmpegPaths,
};

fn ffmpeg_tools_available() -> bool {
    let paths = FfmpegPaths::default();
    paths.ffmpeg_available() && paths.ffprobe_available()
}

fn temp_root(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "banderole_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

/// Synthesize `{root}/{name}.mp4` from lavfi test sources.
fn synth_clip(root: &Path, name: &str, seconds: f64, with_audio: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(root)?;
    let path = root.join(format!("{name}.mp4"));

    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-v",
        "error",
        "-y",
        "-f",
        "lavfi",
        "-i",
        "testsrc=size=192x108:rate=30",
    ]);
    if with_audio {
        cmd.args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=48000"]);
    }
    cmd.args(["-t", &format!("{seconds}"), "-pix_fmt", "yuv420p", "-c:v", "libx264"]);
    if with_audio {
        cmd.args(["-c:a", "aac"]);
    }
    let status = cmd.arg(&path).status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating {name}.mp4");
    Ok(())
}

fn request(root: &Path, scenario: &str, trim: TrimSpec) -> GenerateRequest {
    GenerateRequest {
        source: VideoSource::LocalTemplate {
            library: root.to_path_buf(),
            scenario: scenario.to_string(),
        },
        caption: "keep scrolling bro, you won't".to_string(),
        // Exercises the system-font fallback so the test needs no fixture font.
        font_path: root.join("no-such-font.ttf"),
        trim,
        out_path: root.join("out.mp4"),
        overwrite: true,
    }
}

#[test]
fn render_produces_a_vertical_mp4_with_audio() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = temp_root("render");
    synth_clip(&root, "clip", 2.0, true).unwrap();

    let req = request(
        &root,
        "clip",
        TrimSpec {
            start_sec: 0.25,
            end_sec: 0.25,
        },
    );
    let paths = FfmpegPaths::default();
    let stats = generate_video(&req, &ComposeConfig::server(), &paths).unwrap();

    assert!(stats.frames > 0);
    assert!(stats.had_audio);
    assert!((stats.duration_sec - 1.5).abs() < 0.15);

    let info = probe_video(&paths.ffprobe, &req.out_path).unwrap();
    assert_eq!((info.width, info.height), (1080, 1920));
    assert!(info.has_audio);
    assert_eq!(info.fps.as_f64().round() as u32, 30);
    // aac padding can stretch the container slightly.
    assert!(info.duration_sec > 1.2 && info.duration_sec < 2.0);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn oversized_trims_fall_back_to_the_full_clip() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = temp_root("trim_underflow");
    synth_clip(&root, "clip", 1.0, true).unwrap();

    let req = request(
        &root,
        "clip",
        TrimSpec {
            start_sec: 5.0,
            end_sec: 5.0,
        },
    );
    let paths = FfmpegPaths::default();
    let stats = generate_video(&req, &ComposeConfig::server(), &paths).unwrap();
    assert!((stats.duration_sec - 1.0).abs() < 0.15);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn silent_sources_render_without_an_audio_stream() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = temp_root("silent");
    synth_clip(&root, "clip", 1.0, false).unwrap();

    let req = request(&root, "clip", TrimSpec::default());
    let paths = FfmpegPaths::default();
    let stats = generate_video(&req, &ComposeConfig::interactive(), &paths).unwrap();
    assert!(!stats.had_audio);

    let info = probe_video(&paths.ffprobe, &req.out_path).unwrap();
    assert_eq!((info.width, info.height), (1080, 1920));
    assert!(!info.has_audio);

    std::fs::remove_dir_all(&root).unwrap();
}

use std::{
    ffi::OsString,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    config::EncoderPreset,
    error::{BanderoleError, BanderoleResult},
    media::Fps,
};

/// Audio track to mux into the output, cut to the same window as the video.
#[derive(Clone, Debug)]
pub struct AudioInput {
    pub path: PathBuf,
    pub offset_sec: f64,
    pub duration_sec: f64,
}

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub preset: EncoderPreset,
    pub out_path: PathBuf,
    pub overwrite: bool,
    pub audio: Option<AudioInput>,
    pub ffmpeg_bin: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> BanderoleResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BanderoleError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // We target yuv420p output for maximum player compatibility.
            return Err(BanderoleError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if let Some(audio) = &self.audio
            && (!(audio.offset_sec >= 0.0) || !(audio.duration_sec > 0.0))
        {
            return Err(BanderoleError::validation(
                "audio input needs offset >= 0 and duration > 0",
            ));
        }
        Ok(())
    }
}

pub fn ensure_parent_dir(path: &Path) -> BanderoleResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// The full ffmpeg argument list for one encode, raw RGBA frames on stdin.
///
/// Input 0 is the frame pipe at the source frame rate; when audio is present,
/// input 1 is the original file trimmed to the composed window, with the
/// explicit stream maps keeping its video stream out of the mux.
fn build_args(cfg: &EncodeConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        (if cfg.overwrite { "-y" } else { "-n" }).into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", cfg.width, cfg.height).into(),
        "-r".into(),
        format!("{}/{}", cfg.fps.num, cfg.fps.den).into(),
        "-i".into(),
        "pipe:0".into(),
    ];

    if let Some(audio) = &cfg.audio {
        args.extend([
            "-ss".into(),
            format!("{:.6}", audio.offset_sec).into(),
            "-t".into(),
            format!("{:.6}", audio.duration_sec).into(),
            "-i".into(),
            audio.path.clone().into_os_string(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:a".into(),
            "aac".into(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }

    args.extend([
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-preset".into(),
        cfg.preset.as_x264_preset().into(),
        "-movflags".into(),
        "+faststart".into(),
        cfg.out_path.clone().into_os_string(),
    ]);
    args
}

/// Streaming MP4 encoder: raw RGBA frames in, H.264 file out.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
}

impl FfmpegEncoder {
    pub fn new(cfg: &EncodeConfig) -> BanderoleResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(BanderoleError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        // System binary over pipes rather than native FFmpeg bindings, which
        // keeps the build free of dev header/lib requirements.
        let mut cmd = Command::new(&cfg.ffmpeg_bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(build_args(cfg));

        let mut child = cmd.spawn().map_err(|e| {
            BanderoleError::pipeline(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BanderoleError::pipeline("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BanderoleError::pipeline("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frame_len: cfg.width as usize * cfg.height as usize * 4,
        })
    }

    pub fn write_frame(&mut self, frame: &[u8]) -> BanderoleResult<()> {
        if frame.len() != self.frame_len {
            return Err(BanderoleError::validation(
                "frame size mismatch with width*height*4",
            ));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BanderoleError::pipeline("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(frame).map_err(|e| {
            BanderoleError::pipeline(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    /// Close the frame pipe, wait for ffmpeg and surface a non-zero exit.
    pub fn finish(mut self) -> BanderoleResult<()> {
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| BanderoleError::pipeline(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BanderoleError::pipeline("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if !status.success() {
            return Err(BanderoleError::pipeline(format!(
                "ffmpeg encode exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EncodeConfig {
        EncodeConfig {
            width: 1080,
            height: 1920,
            fps: Fps { num: 30000, den: 1001 },
            preset: EncoderPreset::Quality,
            out_path: PathBuf::from("out/final.mp4"),
            overwrite: true,
            audio: None,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }

    fn args_as_strings(cfg: &EncodeConfig) -> Vec<String> {
        build_args(cfg)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = base_config();
        cfg.width = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.height = 1921;
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.audio = Some(AudioInput {
            path: PathBuf::from("a.mp4"),
            offset_sec: -1.0,
            duration_sec: 5.0,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn args_without_audio_stay_silent_and_carry_the_rational_rate() {
        let args = args_as_strings(&base_config());
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-shortest".to_string()));

        let r = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r + 1], "30000/1001");
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().unwrap(), "out/final.mp4");
    }

    #[test]
    fn args_with_audio_map_both_inputs_and_trim_the_track() {
        let mut cfg = base_config();
        cfg.preset = EncoderPreset::Throughput;
        cfg.audio = Some(AudioInput {
            path: PathBuf::from("clip.mp4"),
            offset_sec: 1.5,
            duration_sec: 7.25,
        });
        let args = args_as_strings(&cfg);

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "1.500000");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "7.250000");

        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| &args[i + 1])
            .collect();
        assert_eq!(maps, vec!["0:v:0", "1:a:0"]);
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!args.contains(&"-an".to_string()));

        let p = args.iter().position(|a| a == "-preset").unwrap();
        assert_eq!(args[p + 1], "ultrafast");
    }

    #[test]
    fn audio_trim_precedes_its_input_in_the_arg_order() {
        let mut cfg = base_config();
        cfg.audio = Some(AudioInput {
            path: PathBuf::from("clip.mp4"),
            offset_sec: 0.0,
            duration_sec: 3.0,
        });
        let args = args_as_strings(&cfg);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let audio_input = args.iter().position(|a| a == "clip.mp4").unwrap();
        assert!(ss < audio_input);
    }
}

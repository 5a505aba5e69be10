//! Probing and raw-frame decode via the system `ffprobe`/`ffmpeg` binaries.
//!
//! We intentionally drive the system binaries over pipes rather than linking
//! native FFmpeg libraries, which keeps the build free of dev header/lib
//! requirements.

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, Stdio},
};

use crate::{
    error::{BanderoleError, BanderoleResult},
    geometry::{Dims, FitPlan},
};

/// Frames-per-second as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> BanderoleResult<Self> {
        if num == 0 || den == 0 {
            return Err(BanderoleError::validation("fps num/den must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

/// Everything the composition pipeline needs to know about a source file.
#[derive(Clone, Debug)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub duration_sec: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn dims(&self) -> Dims {
        Dims {
            width: self.width,
            height: self.height,
        }
    }
}

/// Probe a local media file with `ffprobe`.
pub fn probe_video(ffprobe: &Path, source_path: &Path) -> BanderoleResult<MediaInfo> {
    let out = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| BanderoleError::pipeline(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(BanderoleError::pipeline(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_output(&out.stdout, source_path)
}

fn parse_probe_output(json: &[u8], source_path: &Path) -> BanderoleResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| BanderoleError::pipeline(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BanderoleError::pipeline("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| BanderoleError::pipeline("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| BanderoleError::pipeline("missing video height from ffprobe"))?;

    let (num, den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| BanderoleError::pipeline("invalid video r_frame_rate"))?;
    let fps = Fps::new(num, den)?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        path: source_path.to_path_buf(),
        width,
        height,
        fps,
        duration_sec,
        has_audio,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

/// ffmpeg `-vf` expression realizing a [`FitPlan`]: uniform scale followed by
/// a fixed-size crop at the plan's offsets.
pub fn scale_crop_filter(plan: &FitPlan, target: Dims) -> String {
    format!(
        "scale={}:{},crop={}:{}:{}:{}",
        plan.scaled.width, plan.scaled.height, target.width, target.height, plan.crop_x, plan.crop_y
    )
}

/// Streaming raw-RGBA frame decoder for one trimmed, fitted video segment.
///
/// Spawns `ffmpeg` once and reads frames off its stdout in timeline order.
pub struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    out_dims: Dims,
}

impl FrameReader {
    pub fn open(
        ffmpeg: &Path,
        source_path: &Path,
        start_sec: f64,
        duration_sec: f64,
        plan: &FitPlan,
        out_dims: Dims,
    ) -> BanderoleResult<Self> {
        if !(start_sec >= 0.0) || !(duration_sec > 0.0) {
            return Err(BanderoleError::validation(
                "frame reader needs start >= 0 and duration > 0",
            ));
        }

        let mut cmd = Command::new(ffmpeg);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(["-v", "error", "-ss", &format!("{start_sec:.6}")])
            .arg("-i")
            .arg(source_path)
            .args([
                "-t",
                &format!("{duration_sec:.6}"),
                "-an",
                "-vf",
                &scale_crop_filter(plan, out_dims),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ]);

        let mut child = cmd.spawn().map_err(|e| {
            BanderoleError::pipeline(format!(
                "failed to spawn ffmpeg for video decode (is it installed?): {e}"
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BanderoleError::pipeline("failed to open ffmpeg stdout (unexpected)"))?;
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
            stdout,
            stderr_drain: Some(stderr_drain),
            frame_len: out_dims.width as usize * out_dims.height as usize * 4,
            out_dims,
        })
    }

    pub fn out_dims(&self) -> Dims {
        self.out_dims
    }

    /// Read the next frame into `buf`. Returns `Ok(false)` on clean end of
    /// stream; a partial trailing frame is an error.
    pub fn next_frame(&mut self, buf: &mut [u8]) -> BanderoleResult<bool> {
        if buf.len() != self.frame_len {
            return Err(BanderoleError::validation(
                "frame buffer size mismatch with width*height*4",
            ));
        }

        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self
                .stdout
                .read(&mut buf[filled..])
                .map_err(|e| BanderoleError::pipeline(format!("ffmpeg decode read failed: {e}")))?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(BanderoleError::pipeline(format!(
                    "ffmpeg decode stream ended mid-frame ({filled} of {} bytes)",
                    buf.len()
                )));
            }
            filled += n;
        }
        Ok(true)
    }

    /// Wait for the decoder process and surface a non-zero exit.
    pub fn finish(mut self) -> BanderoleResult<()> {
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
                "ffmpeg video decode exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        // Reap the child if the caller bailed before finish().
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

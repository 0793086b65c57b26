use std::{
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
    sync::OnceLock,
};

use crate::{
    color::Rgba8,
    error::{AgjendaError, AgjendaResult},
    recording::Recording,
    sink::{CaptureSink, Encoding, SinkConfig},
    surface::{FrameRgba, flatten_to_opaque_rgba8},
};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `ffmpeg -encoders` output, probed once per process.
fn ffmpeg_encoders() -> &'static str {
    static ENCODERS: OnceLock<String> = OnceLock::new();
    ENCODERS.get_or_init(|| {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stderr(Stdio::null())
            .output()
            .ok()
            .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
            .unwrap_or_default()
    })
}

/// RGBA8 frame size in bytes, widened before multiplying so large
/// dimensions cannot overflow `u32` arithmetic.
fn frame_byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

pub fn encoder_available(encoding: Encoding) -> bool {
    let name = encoding.ffmpeg_encoder();
    ffmpeg_encoders()
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}

/// Capture sink that streams raw RGBA frames to the system `ffmpeg` binary
/// and finalizes to a WebM file in the temp directory.
///
/// We intentionally shell out to `ffmpeg` rather than linking FFmpeg to
/// avoid native dev header/lib requirements.
pub struct WebmSink {
    out_path: PathBuf,
    bg: Rgba8,
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    frames: u64,
}

impl WebmSink {
    /// Create a sink writing to a process-unique temp file.
    ///
    /// Fails with `UnsupportedEnvironment` when `ffmpeg` is not on `PATH`.
    pub fn new(bg: Rgba8) -> AgjendaResult<Self> {
        if !is_ffmpeg_on_path() {
            return Err(AgjendaError::unsupported_environment(
                "ffmpeg is required for WebM recording, but was not found on PATH",
            ));
        }
        let out_path = std::env::temp_dir().join(format!(
            "agjenda_recording_{}_{}.webm",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
        ));
        Ok(Self {
            out_path,
            bg,
            cfg: None,
            child: None,
            stdin: None,
            scratch: Vec::new(),
            frames: 0,
        })
    }

    pub fn out_path(&self) -> &std::path::Path {
        &self.out_path
    }
}

impl CaptureSink for WebmSink {
    fn supports(&self, encoding: Encoding) -> bool {
        encoder_available(encoding)
    }

    fn begin(&mut self, cfg: SinkConfig) -> AgjendaResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(AgjendaError::validation(
                "capture width/height must be non-zero",
            ));
        }
        if cfg.fps == 0 {
            return Err(AgjendaError::validation("capture fps must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            // The yuv420p output format needs even dimensions.
            return Err(AgjendaError::validation(
                "capture width/height must be even (required for yuv420p webm output)",
            ));
        }
        if self.child.is_some() {
            return Err(AgjendaError::encoding("capture sink is already running"));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            cfg.encoding.ffmpeg_encoder(),
        ]);
        match cfg.encoding {
            Encoding::Vp9 => {
                cmd.args(["-b:v", "0", "-crf", "32", "-row-mt", "1"]);
            }
            Encoding::Vp8 => {
                cmd.args(["-crf", "10", "-b:v", "1M"]);
            }
        }
        cmd.args(["-pix_fmt", "yuv420p"]).arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            AgjendaError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgjendaError::encoding("failed to open ffmpeg stdin (unexpected)"))?;

        tracing::debug!(
            encoder = cfg.encoding.ffmpeg_encoder(),
            out = %self.out_path.display(),
            "capture sink started"
        );

        self.scratch = vec![0u8; frame_byte_len(cfg.width, cfg.height)];
        self.cfg = Some(cfg);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> AgjendaResult<()> {
        let Some(cfg) = self.cfg else {
            return Err(AgjendaError::encoding("capture sink was never started"));
        };
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(AgjendaError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(AgjendaError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(&mut self.scratch, &frame.data, frame.premultiplied, self.bg)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AgjendaError::encoding("capture sink is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            AgjendaError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> AgjendaResult<Recording> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Err(AgjendaError::finalization("capture sink was never started"));
        };

        let output = child.wait_with_output().map_err(|e| {
            AgjendaError::finalization(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Leave no partial output behind when encoding fails.
            let _ = std::fs::remove_file(&self.out_path);
            return Err(AgjendaError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = std::fs::metadata(&self.out_path)
            .map_err(|e| {
                AgjendaError::finalization(format!(
                    "ffmpeg finished but produced no output at '{}': {e}",
                    self.out_path.display()
                ))
            })?
            .len();

        tracing::debug!(frames = self.frames, bytes, "capture sink finalized");

        Ok(Recording {
            path: Some(self.out_path.clone()),
            frames: self.frames,
            bytes,
        })
    }
}

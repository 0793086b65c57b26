use crate::{error::AgjendaResult, recording::Recording, surface::FrameRgba};

/// Video encodings a capture sink may negotiate.
///
/// VP9 is the preferred encoding; VP8 is the generic fallback every WebM
/// muxer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Vp9,
    Vp8,
}

impl Encoding {
    pub const PREFERRED: Encoding = Encoding::Vp9;
    pub const GENERIC: Encoding = Encoding::Vp8;

    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Encoding::Vp9 => "libvpx-vp9",
            Encoding::Vp8 => "libvpx",
        }
    }
}

/// Configuration handed to a [`CaptureSink`] when capture begins.
#[derive(Clone, Copy, Debug)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub encoding: Encoding,
}

/// Consumes sampled surface frames and produces one finalized recording.
///
/// Ordering contract: `begin` once, then `push_frame` in playback order,
/// then `finish` exactly once. `finish` must be called on every exit path,
/// including cancellation and mid-capture errors.
pub trait CaptureSink {
    /// Whether the sink can encode with `encoding`.
    fn supports(&self, encoding: Encoding) -> bool;

    fn begin(&mut self, cfg: SinkConfig) -> AgjendaResult<()>;

    fn push_frame(&mut self, frame: &FrameRgba) -> AgjendaResult<()>;

    /// Stop capturing and finalize the accumulated output.
    fn finish(&mut self) -> AgjendaResult<Recording>;
}

/// In-memory sink for tests and debugging: retains pushed frames and
/// finalizes to a file-less [`Recording`].
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameRgba>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[FrameRgba] {
        &self.frames
    }
}

impl CaptureSink for InMemorySink {
    fn supports(&self, _encoding: Encoding) -> bool {
        true
    }

    fn begin(&mut self, cfg: SinkConfig) -> AgjendaResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> AgjendaResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> AgjendaResult<Recording> {
        let bytes = self
            .frames
            .iter()
            .map(|f| f.data.len() as u64)
            .sum::<u64>();
        Ok(Recording {
            path: None,
            frames: self.frames.len() as u64,
            bytes,
        })
    }
}

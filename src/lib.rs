//! Agenda slide video generator.
//!
//! Renders a sequence of agenda items as styled slides on a CPU raster
//! surface and captures them into a WebM recording through the system
//! `ffmpeg` binary. The in-memory capture sink supports headless tests
//! without an encoder installed.

#![forbid(unsafe_code)]

pub mod agenda;
pub mod color;
pub mod driver;
pub mod encode_ffmpeg;
pub mod error;
pub mod recording;
pub mod session;
pub mod sink;
pub mod slide;
pub mod surface;
pub mod text;

pub use agenda::{Agenda, AgendaItem, SlideContext};
pub use color::Rgba8;
pub use driver::{CancelToken, FPS, GenerateOpts, Outcome, Pacing, generate};
pub use error::{AgjendaError, AgjendaResult};
pub use recording::{Recording, RecordingHandle, SUGGESTED_FILE_NAME};
pub use session::{Session, SessionOutcome};
pub use sink::{CaptureSink, Encoding, InMemorySink, SinkConfig};
pub use slide::SlideRenderer;
pub use surface::{FrameRgba, Surface};
pub use text::TextShaper;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{
    agenda::{Agenda, SlideContext},
    error::{AgjendaError, AgjendaResult},
    recording::RecordingHandle,
    sink::{CaptureSink, Encoding, SinkConfig},
    slide::SlideRenderer,
    surface::Surface,
};

/// Capture frame rate, matching the slide timing model.
pub const FPS: u32 = 30;

/// Shared cancellation flag checked between frames.
///
/// Cancellation is cooperative: capture stops at the next frame boundary,
/// never mid-frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Whether capture paces itself against wall-clock frame times.
///
/// `Realtime` sleeps toward a fixed 1/FPS cadence, like a live recording.
/// `Unthrottled` runs as fast as rendering and encoding allow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pacing {
    Realtime,
    #[default]
    Unthrottled,
}

/// Fixed-step frame pacer. Skips sleeping when behind schedule rather than
/// accumulating debt.
struct FrameClock {
    interval: Duration,
    next: Instant,
}

impl FrameClock {
    fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            next: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.next += self.interval;
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
        } else {
            self.next = now;
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GenerateOpts {
    pub pacing: Pacing,
    pub encoding: Encoding,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            pacing: Pacing::Unthrottled,
            encoding: Encoding::PREFERRED,
        }
    }
}

/// How a capture run ended.
///
/// Cancellation is an expected outcome, not an error: the partial recording
/// is discarded and the run reports `Cancelled`.
#[derive(Debug)]
pub enum Outcome {
    Completed(RecordingHandle),
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn into_recording(self) -> Option<RecordingHandle> {
        match self {
            Outcome::Completed(handle) => Some(handle),
            Outcome::Cancelled => None,
        }
    }
}

/// Number of capture frames for one item of `duration_secs`, never zero.
pub fn frames_for_duration(duration_secs: f64) -> u64 {
    ((duration_secs * f64::from(FPS)).round() as u64).max(1)
}

/// Render every agenda item to `sink` and finalize a recording.
///
/// Progress is reported through `on_progress` as integer percentages: 0 at
/// start, periodic updates capped at 99 while capturing, and 100 only after
/// the sink has finalized. Every exit path, including cancellation and
/// mid-capture errors, still finalizes the sink; non-completed runs release
/// the resulting recording.
#[tracing::instrument(skip_all, fields(items = agenda.len()))]
pub fn generate<S, F>(
    agenda: &Agenda,
    renderer: &mut SlideRenderer,
    surface: &mut Surface,
    sink: &mut S,
    opts: GenerateOpts,
    mut on_progress: F,
    cancel: &CancelToken,
) -> AgjendaResult<Outcome>
where
    S: CaptureSink + ?Sized,
    F: FnMut(u8),
{
    if agenda.is_empty() {
        return Err(AgjendaError::EmptyAgenda);
    }

    let encoding = if sink.supports(opts.encoding) {
        opts.encoding
    } else if sink.supports(Encoding::GENERIC) {
        Encoding::GENERIC
    } else {
        return Err(AgjendaError::unsupported_environment(
            "capture sink supports neither the preferred nor the generic encoding",
        ));
    };
    if encoding != opts.encoding {
        tracing::warn!(
            requested = opts.encoding.ffmpeg_encoder(),
            using = encoding.ffmpeg_encoder(),
            "preferred encoding unavailable, falling back"
        );
    }

    sink.begin(SinkConfig {
        width: surface.width(),
        height: surface.height(),
        fps: FPS,
        encoding,
    })?;

    on_progress(0);

    let total = agenda.len();
    let mut clock = match opts.pacing {
        Pacing::Realtime => Some(FrameClock::new(FPS)),
        Pacing::Unthrottled => None,
    };

    let mut run = || -> AgjendaResult<bool> {
        for (index, item) in agenda.items().iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(true);
            }

            let frames = frames_for_duration(item.duration_secs);
            tracing::debug!(index, frames, title = %item.title, "capturing item");

            let mut interrupted = false;
            for frame in 0..frames {
                if cancel.is_cancelled() {
                    interrupted = true;
                    break;
                }

                let focus = frame as f64 / frames as f64;
                let ctx = SlideContext {
                    item,
                    index,
                    total,
                    focus,
                };
                renderer.render(surface, &ctx)?;
                sink.push_frame(&surface.frame())?;

                if frame.is_multiple_of(u64::from(FPS)) {
                    let pct = ((index as f64 / total as f64) * 100.0).round() as u8;
                    on_progress(pct.min(99));
                }

                if let Some(clock) = clock.as_mut() {
                    clock.tick();
                }
            }

            // The end-of-item update runs even when cancellation cut the
            // item short; the 99 cap keeps 100 exclusive to finalization.
            let pct = (((index + 1) as f64 / total as f64) * 100.0).round() as u8;
            on_progress(pct.min(99));

            if interrupted {
                return Ok(true);
            }
        }
        Ok(false)
    };

    // The sink is finalized on every exit path so the encoder is reaped.
    let cancelled = match run() {
        Ok(cancelled) => cancelled,
        Err(e) => {
            match sink.finish() {
                Ok(recording) => RecordingHandle::from_recording(recording).release(),
                Err(fin) => tracing::warn!(error = %fin, "sink finalization also failed"),
            }
            return Err(e);
        }
    };

    let mut handle = RecordingHandle::from_recording(sink.finish()?);

    if cancelled {
        tracing::info!("capture cancelled, discarding partial recording");
        handle.release();
        return Ok(Outcome::Cancelled);
    }

    on_progress(100);
    tracing::info!(
        frames = handle.frames(),
        bytes = handle.len_bytes(),
        "capture completed"
    );
    Ok(Outcome::Completed(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_for_duration_rounds_and_floors_at_one() {
        assert_eq!(frames_for_duration(5.0), 150);
        assert_eq!(frames_for_duration(6.0), 180);
        assert_eq!(frames_for_duration(0.0), 1);
        assert_eq!(frames_for_duration(2.016), 60);
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn frame_clock_does_not_accumulate_debt() {
        let mut clock = FrameClock::new(1000);
        std::thread::sleep(Duration::from_millis(10));
        let start = Instant::now();
        clock.tick();
        // Behind schedule: tick must return promptly instead of sleeping.
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}

use crate::{
    agenda::{Agenda, AgendaItem, SlideContext},
    driver::{self, CancelToken, GenerateOpts, Outcome},
    error::{AgjendaError, AgjendaResult},
    recording::RecordingHandle,
    sink::CaptureSink,
    slide::SlideRenderer,
    surface::{FrameRgba, Surface},
    text::TextShaper,
};

pub const CANVAS_WIDTH: u32 = 1280;
pub const CANVAS_HEIGHT: u32 = 720;

/// Interactive editing and capture state: one agenda, one selected item,
/// at most one recording, and at most one capture run at a time.
pub struct Session {
    agenda: Agenda,
    selected: usize,
    running: bool,
    recording: Option<RecordingHandle>,
    renderer: SlideRenderer,
    surface: Surface,
}

impl Session {
    pub fn new(agenda: Agenda, shaper: TextShaper) -> AgjendaResult<Self> {
        Ok(Self {
            agenda,
            selected: 0,
            running: false,
            recording: None,
            renderer: SlideRenderer::new(shaper),
            surface: Surface::new(CANVAS_WIDTH, CANVAS_HEIGHT)?,
        })
    }

    /// A session seeded with the default agenda.
    pub fn seeded(shaper: TextShaper) -> AgjendaResult<Self> {
        Self::new(Agenda::seed(), shaper)
    }

    pub fn agenda(&self) -> &Agenda {
        &self.agenda
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn recording(&self) -> Option<&RecordingHandle> {
        self.recording.as_ref()
    }

    /// Select the item previewed; out-of-range indices clamp to the last
    /// item.
    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.agenda.len().saturating_sub(1));
    }

    pub fn add_item(
        &mut self,
        title: &str,
        description: &str,
        duration_secs: f64,
    ) -> AgjendaResult<&AgendaItem> {
        self.agenda.push(title, description, duration_secs)
    }

    /// Remove an item by id. The selection clamps so it always points at a
    /// surviving item.
    pub fn remove_item(&mut self, id: &str) -> AgjendaResult<()> {
        self.agenda.remove(id)?;
        self.selected = self.selected.min(self.agenda.len().saturating_sub(1));
        Ok(())
    }

    /// Render the selected item as a still preview frame.
    ///
    /// Returns `None` while a capture run owns the surface.
    pub fn preview(&mut self) -> AgjendaResult<Option<FrameRgba>> {
        if self.running {
            return Ok(None);
        }
        let Some(item) = self.agenda.get(self.selected) else {
            return Err(AgjendaError::EmptyAgenda);
        };
        let ctx = SlideContext {
            item,
            index: self.selected,
            total: self.agenda.len(),
            focus: 0.0,
        };
        self.renderer.render(&mut self.surface, &ctx)?;
        Ok(Some(self.surface.frame()))
    }

    /// Run a full capture into `sink`, replacing any previously held
    /// recording. Rejected while another run is active.
    ///
    /// On completion the recording is retained by the session; fetch it with
    /// [`recording`](Self::recording) or [`take_recording`](Self::take_recording).
    pub fn generate_with<S, F>(
        &mut self,
        sink: &mut S,
        opts: GenerateOpts,
        on_progress: F,
        cancel: &CancelToken,
    ) -> AgjendaResult<SessionOutcome>
    where
        S: CaptureSink + ?Sized,
        F: FnMut(u8),
    {
        if self.running {
            return Err(AgjendaError::validation(
                "a capture run is already in progress",
            ));
        }
        if let Some(mut old) = self.recording.take() {
            old.release();
        }

        self.running = true;
        let result = driver::generate(
            &self.agenda,
            &mut self.renderer,
            &mut self.surface,
            sink,
            opts,
            on_progress,
            cancel,
        );
        self.running = false;

        match result? {
            Outcome::Completed(handle) => {
                self.recording = Some(handle);
                Ok(SessionOutcome::Completed)
            }
            Outcome::Cancelled => Ok(SessionOutcome::Cancelled),
        }
    }

    /// Move the held recording out of the session, if any.
    pub fn take_recording(&mut self) -> Option<RecordingHandle> {
        self.recording.take()
    }

    /// Drop and delete the held recording, if any.
    pub fn discard_recording(&mut self) {
        if let Some(mut rec) = self.recording.take() {
            rec.release();
        }
    }
}

/// How a session capture run ended; a completed run leaves its recording in
/// the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemorySink;

    fn tiny_session() -> Session {
        let mut agenda = Agenda::new();
        agenda.push("First", "One", 2.0).unwrap();
        agenda.push("Second", "Two", 2.0).unwrap();
        Session::new(agenda, TextShaper::new()).unwrap()
    }

    #[test]
    fn select_clamps_to_last_item() {
        let mut session = tiny_session();
        session.select(99);
        assert_eq!(session.selected(), 1);
    }

    #[test]
    fn remove_clamps_selection() {
        let mut session = tiny_session();
        session.select(1);
        let id = session.agenda().items()[1].id.clone();
        session.remove_item(&id).unwrap();
        assert_eq!(session.selected(), 0);
        assert_eq!(session.agenda().len(), 1);
    }

    #[test]
    fn preview_yields_a_canvas_sized_frame() {
        let mut session = tiny_session();
        let frame = session.preview().unwrap().unwrap();
        assert_eq!(frame.width, CANVAS_WIDTH);
        assert_eq!(frame.height, CANVAS_HEIGHT);
    }

    #[test]
    fn generate_retains_the_recording() {
        let mut session = tiny_session();
        let mut sink = InMemorySink::new();
        let outcome = session
            .generate_with(
                &mut sink,
                GenerateOpts::default(),
                |_| {},
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        let rec = session.recording().unwrap();
        assert_eq!(rec.frames(), 120);
    }

    #[test]
    fn pre_cancelled_run_stores_no_recording() {
        let mut session = tiny_session();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut sink = InMemorySink::new();
        let outcome = session
            .generate_with(&mut sink, GenerateOpts::default(), |_| {}, &cancel)
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(session.recording().is_none());
        assert!(sink.frames().is_empty());
    }
}

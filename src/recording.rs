use std::path::{Path, PathBuf};

use crate::error::{AgjendaError, AgjendaResult};

/// File name offered when the recording is saved for download.
pub const SUGGESTED_FILE_NAME: &str = "video-agjenda.webm";

/// Finalized capture-sink output.
///
/// `path` is `None` for sinks that do not materialize a file (tests).
#[derive(Clone, Debug)]
pub struct Recording {
    pub path: Option<PathBuf>,
    pub frames: u64,
    pub bytes: u64,
}

/// Owns a finalized recording resource.
///
/// The handle is revocable: [`release`](Self::release) deletes the backing
/// file, and dropping an unreleased handle releases it, so a handle can
/// never leak its resource. A released handle keeps its metadata but no
/// longer points at playable data.
#[derive(Debug)]
pub struct RecordingHandle {
    path: Option<PathBuf>,
    frames: u64,
    bytes: u64,
    released: bool,
}

impl RecordingHandle {
    pub fn from_recording(recording: Recording) -> Self {
        Self {
            path: recording.path,
            frames: recording.frames,
            bytes: recording.bytes,
            released: false,
        }
    }

    /// Path to the playable file, if still held.
    pub fn path(&self) -> Option<&Path> {
        if self.released {
            None
        } else {
            self.path.as_deref()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn len_bytes(&self) -> u64 {
        self.bytes
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Copy the recording to `dest` (the download affordance).
    pub fn save_as(&self, dest: &Path) -> AgjendaResult<()> {
        let src = self.path().ok_or_else(|| {
            AgjendaError::validation("recording has been released or holds no file")
        })?;
        use anyhow::Context as _;
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
        }
        std::fs::copy(src, dest)
            .with_context(|| format!("failed to copy recording to '{}'", dest.display()))?;
        Ok(())
    }

    /// Revoke the handle and delete the backing file.
    ///
    /// Idempotent; failures to remove an already-missing file are ignored.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(path) = &self.path {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.release();
    }
}

//! Diagnostic raw-audio mirror.
//!
//! When enabled, every chunk the writer transmits (stream header included) is
//! mirrored to a local file, one per adapter instance. Pure side-effect sink:
//! failures are logged and never propagated into the audio path.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub(crate) struct AudioDump {
    path: PathBuf,
    file: File,
}

impl AudioDump {
    /// Open the dump file for one adapter instance. The session id keeps
    /// concurrent instances from clobbering each other's files.
    pub(crate) fn create(dir: &Path, session_id: &str) -> Option<Self> {
        let path = dir.join(format!("audiodump_{session_id}.wav"));
        match File::create(&path) {
            Ok(file) => {
                debug!(path = %path.display(), "audio dump enabled");
                Some(Self { path, file })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open audio dump");
                None
            }
        }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        if let Err(e) = self.file.write_all(bytes) {
            warn!(path = %self.path.display(), error = %e, "audio dump write failed");
        }
    }

    pub(crate) fn finish(mut self) {
        if let Err(e) = self.file.flush() {
            warn!(path = %self.path.display(), error = %e, "audio dump flush failed");
        }
        debug!(path = %self.path.display(), "audio dump closed");
    }
}

//! Backend error taxonomy
//!
//! Unrecoverable setup failures surface as typed errors here; transient
//! transport failures disable the affected subsystem instead of propagating,
//! and unrecognized protocol traffic is logged and dropped by the translator.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The audio device file could not be opened; the audio subsystem stays
    /// unusable for the session.
    #[error("couldn't open audio device {path}")]
    AudioDevice {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The window server refused window creation
    #[error("window creation failed: {0}")]
    WindowCreate(String),

    /// An operation that needs a window was called before the first video
    /// mode was set
    #[error("no window has been created yet")]
    NoWindow,
}

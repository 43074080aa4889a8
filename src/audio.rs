//! Audio output device
//!
//! Raw PCM playback through a write-only device file. The device imposes its
//! own format: stereo, signed 16-bit, 48 kHz, whatever the caller requested.
//! Writes are fire-and-forget; a failed write disables the device for the
//! rest of the session rather than crashing or retrying.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::BackendError;

/// Default playback device path
pub const DEFAULT_DEVICE: &str = "/dev/dsp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    S16,
}

/// Playback format negotiation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub channels: u8,
    pub sample_rate: u32,
    pub format: SampleFormat,
    /// Mix buffer length in sample frames
    pub samples: u16,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48_000,
            format: SampleFormat::S16,
            samples: 1024,
        }
    }
}

/// Check whether a playback device is present by opening it write-only
pub fn probe(path: &Path) -> bool {
    OpenOptions::new().write(true).open(path).is_ok()
}

/// An open playback device with its mix buffer
pub struct AudioDevice {
    file: File,
    path: PathBuf,
    spec: AudioSpec,
    mix: Vec<i16>,
    enabled: bool,
}

impl AudioDevice {
    /// Open the device for playback. The negotiated spec is forced to
    /// stereo/S16/48kHz regardless of the request; only the frame count is
    /// honored.
    pub fn open(path: &Path, requested: &AudioSpec) -> Result<Self, BackendError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| BackendError::AudioDevice {
                path: path.to_path_buf(),
                source,
            })?;

        let spec = AudioSpec {
            channels: 2,
            sample_rate: 48_000,
            format: SampleFormat::S16,
            samples: requested.samples,
        };
        // Silence-filled mix buffer
        let mix = vec![0i16; spec.samples as usize * spec.channels as usize];

        info!(
            "Audio device {} open: {} ch, {} Hz, {} frames",
            path.display(),
            spec.channels,
            spec.sample_rate,
            spec.samples
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            spec,
            mix,
            enabled: true,
        })
    }

    pub fn spec(&self) -> &AudioSpec {
        &self.spec
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mutable access to the mix buffer the host fills between plays
    pub fn buffer(&mut self) -> &mut [i16] {
        &mut self.mix
    }

    /// Write the mix buffer to the device. Fire-and-forget: on failure the
    /// device is disabled for the rest of the session.
    pub fn play(&mut self) {
        if !self.enabled {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(&self.mix);
        if let Err(err) = self.file.write_all(bytes) {
            warn!(
                "Audio write to {} failed, disabling device: {}",
                self.path.display(),
                err
            );
            self.enabled = false;
        }
    }
}

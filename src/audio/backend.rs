use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::info;

/// Local audio I/O attached to a live session
///
/// Device configuration lives outside this crate; implementations only need
/// to route microphone/speaker audio for the duration of a session.
#[async_trait::async_trait]
pub trait AudioIo: Send + Sync {
    /// Attach microphone input and speaker output
    async fn attach(&self) -> Result<()>;

    /// Release the audio devices
    async fn detach(&self) -> Result<()>;

    /// Set local speaker gain (0.0 = silent, 1.0 = full)
    fn set_output_gain(&self, gain: f32);

    /// Check if audio is currently attached
    fn is_attached(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Microphone permission prompt
#[async_trait::async_trait]
pub trait MicrophonePermission: Send + Sync {
    /// Ask for microphone access; `false` means denied
    async fn request(&self) -> bool;
}

/// Permission answered from configuration (used when running headless)
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

#[async_trait::async_trait]
impl MicrophonePermission for StaticPermission {
    async fn request(&self) -> bool {
        self.granted
    }
}

/// Audio I/O for a server process where the devices live on the client
///
/// Tracks attach state and gain so the controller behaves identically.
#[derive(Debug)]
pub struct HeadlessAudio {
    attached: AtomicBool,
    /// f32 gain stored as raw bits
    gain_bits: AtomicU32,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self {
            attached: AtomicBool::new(false),
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    pub fn output_gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::SeqCst))
    }
}

impl Default for HeadlessAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioIo for HeadlessAudio {
    async fn attach(&self) -> Result<()> {
        self.attached.store(true, Ordering::SeqCst);
        info!("Headless audio attached");
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        self.attached.store(false, Ordering::SeqCst);
        info!("Headless audio detached");
        Ok(())
    }

    fn set_output_gain(&self, gain: f32) {
        let gain = gain.clamp(0.0, 1.0);
        self.gain_bits.store(gain.to_bits(), Ordering::SeqCst);
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "headless"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headless_audio_tracks_state() {
        let audio = HeadlessAudio::new();
        assert!(!audio.is_attached());
        assert_eq!(audio.output_gain(), 1.0);

        audio.attach().await.unwrap();
        assert!(audio.is_attached());

        audio.set_output_gain(0.0);
        assert_eq!(audio.output_gain(), 0.0);

        audio.set_output_gain(3.0);
        assert_eq!(audio.output_gain(), 1.0, "gain is clamped");

        audio.detach().await.unwrap();
        assert!(!audio.is_attached());
    }

    #[tokio::test]
    async fn test_static_permission() {
        assert!(StaticPermission::new(true).request().await);
        assert!(!StaticPermission::new(false).request().await);
    }
}

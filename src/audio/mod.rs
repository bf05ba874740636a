pub mod backend;

pub use backend::{AudioIo, HeadlessAudio, MicrophonePermission, StaticPermission};

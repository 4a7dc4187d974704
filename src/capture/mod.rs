//! Stream acquisition
//!
//! Local camera/microphone streams and desktop capture streams, plus the
//! device trait hosts implement to provide them.

pub mod acquirer;
#[cfg(feature = "native-audio")]
pub mod microphone;
pub mod stream;
pub mod traits;

pub use acquirer::{release_stream, StreamAcquirer, StreamState};
pub use stream::{MediaStream, MediaTrack, TrackKind, TrackState};
pub use traits::{AudioDeviceInfo, CaptureSource, MediaConstraints, MediaDevices};

// Transport seam between the playback session and the media engine
// The session only ever talks to `Transport`; events come back over a channel

#[cfg(feature = "audio")]
pub mod player;

#[cfg(feature = "audio")]
pub use player::RodioTransport;

use crate::error::TransportError;

/// Identifies one `load` call. Events carry the ticket of the load that
/// produced them so the session can drop anything from an older load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub locator: String,
}

impl LoadTicket {
    pub fn new(generation: u64, locator: impl Into<String>) -> Self {
        Self {
            generation,
            locator: locator.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    /// Playback position in seconds.
    TimeUpdated(f64),
    /// Total duration in seconds, known once the engine has read the header.
    MetadataLoaded(f64),
    Ended,
    Started,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub ticket: LoadTicket,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(ticket: LoadTicket, kind: TransportEventKind) -> Self {
        Self { ticket, kind }
    }
}

/// Control surface over a single active track.
///
/// Implementations relay only; no playlist logic lives behind this trait.
pub trait Transport {
    /// Replace the current source. Position resets to 0 and nothing plays
    /// until `play` is called.
    fn load(&mut self, ticket: LoadTicket);

    fn play(&mut self) -> Result<(), TransportError>;

    fn pause(&mut self);

    /// Drop the current source and go idle.
    fn stop(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn seek_to(&mut self, seconds: f64);
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
    pub start_muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 0.7,
            start_muted: false,
        }
    }
}

impl From<&crate::config::Config> for AudioConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            volume: config.playback.volume.clamp(0.0, 1.0),
            start_muted: config.playback.start_muted,
        }
    }
}

/// Format seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

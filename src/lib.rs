// lofiplayer - playlist playback core with a terminal front end
// The session owns all playback state; the UI only relays intents and events

pub mod audio;    // transport seam and the rodio-backed engine
pub mod catalog;  // where tracks come from
pub mod config;   // settings and preferences
pub mod error;
pub mod playlist; // filter and shuffle over catalog snapshots
pub mod session;  // the playback state machine
#[cfg(feature = "tui")]
pub mod ui;       // terminal interface

pub use audio::{LoadTicket, Transport, TransportEvent, TransportEventKind};
pub use catalog::{Catalog, CatalogSource, Track, TrackRef};
pub use config::Config;
pub use error::{BindingError, FetchError, SessionError, TransportError};
pub use session::{ActiveListKind, PlaybackSession, SessionState};

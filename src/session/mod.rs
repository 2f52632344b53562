// Playback session - owns the active list, the current track and transport state
// Every intent and every engine event goes through here, in arrival order

use crate::audio::{LoadTicket, Transport, TransportEvent, TransportEventKind};
use crate::catalog::{Catalog, TrackRef};
use crate::error::SessionError;
use crate::playlist;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Ready,
    Playing,
    Paused,
}

/// Which lens on the catalog is currently playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveListKind {
    Catalog,
    Filtered,
    Shuffled,
}

/// Play intent independent of whether a track exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayIntent {
    Ready,
    Playing,
    Paused,
}

pub struct PlaybackSession {
    catalog: Vec<TrackRef>,
    filtered: Vec<TrackRef>,
    shuffled: Vec<TrackRef>,
    shuffle_enabled: bool,
    query: String,

    current_index: Option<usize>,
    transport_state: PlayIntent,
    is_muted: bool,
    position: f64,
    duration: Option<f64>,

    generation: u64,
    loaded: Option<LoadTicket>,
    rng: StdRng,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffle order, for tests and reproducible sessions.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            catalog: Vec::new(),
            filtered: Vec::new(),
            shuffled: Vec::new(),
            shuffle_enabled: false,
            query: String::new(),
            current_index: None,
            transport_state: PlayIntent::Ready,
            is_muted: false,
            position: 0.0,
            duration: None,
            generation: 0,
            loaded: None,
            rng,
        }
    }

    // ---- read side -------------------------------------------------------

    pub fn state(&self) -> SessionState {
        if self.current_index.is_none() {
            return SessionState::Empty;
        }
        match self.transport_state {
            PlayIntent::Ready => SessionState::Ready,
            PlayIntent::Playing => SessionState::Playing,
            PlayIntent::Paused => SessionState::Paused,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    pub fn active_kind(&self) -> ActiveListKind {
        if self.shuffle_enabled {
            ActiveListKind::Shuffled
        } else if self.query.trim().is_empty() {
            ActiveListKind::Catalog
        } else {
            ActiveListKind::Filtered
        }
    }

    pub fn active_tracks(&self) -> &[TrackRef] {
        match self.active_kind() {
            ActiveListKind::Catalog => &self.catalog,
            ActiveListKind::Filtered => &self.filtered,
            ActiveListKind::Shuffled => &self.shuffled,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.current_index.and_then(|i| self.active_tracks().get(i))
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// `None` until the engine reports metadata for the current track.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    // ---- catalog and list lenses -----------------------------------------

    /// Swap in a freshly loaded catalog and recompute every derived list.
    ///
    /// The current track survives the reload if its locator is still
    /// playable; otherwise selection restarts at the top.
    pub fn replace_catalog<T: Transport + ?Sized>(&mut self, catalog: Catalog, transport: &mut T) {
        let previous = self.current_track().map(|t| t.locator.clone());

        self.catalog = catalog.into_tracks();
        self.filtered = playlist::filter(&self.catalog, &self.query);
        if self.shuffle_enabled {
            self.shuffled = playlist::shuffle(&self.catalog, &mut self.rng);
        }
        info!("Session catalog replaced: {} tracks", self.catalog.len());

        self.follow_or_reset(previous, transport);
    }

    pub fn set_query<T: Transport + ?Sized>(&mut self, query: &str, transport: &mut T) {
        if query == self.query {
            return;
        }
        let previous = self.current_track().map(|t| t.locator.clone());

        self.query = query.to_string();
        self.filtered = playlist::filter(&self.catalog, &self.query);
        debug!("Query '{}' matches {} tracks", self.query, self.filtered.len());

        // shuffle mode ignores the query until it is switched off
        if !self.shuffle_enabled {
            self.follow_or_reset(previous, transport);
        }
    }

    pub fn set_shuffle<T: Transport + ?Sized>(&mut self, enabled: bool, transport: &mut T) {
        if enabled == self.shuffle_enabled {
            return;
        }

        self.shuffle_enabled = enabled;
        if enabled {
            self.shuffled = playlist::shuffle(&self.catalog, &mut self.rng);
        }
        debug!("Shuffle {}", if enabled { "on" } else { "off" });

        self.current_index = if self.active_tracks().is_empty() { None } else { Some(0) };
        self.push_current(transport);
    }

    pub fn toggle_shuffle<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.set_shuffle(!self.shuffle_enabled, transport);
    }

    // ---- navigation ------------------------------------------------------

    pub fn select_track<T: Transport + ?Sized>(
        &mut self,
        locator: &str,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        let Some(index) = self.active_tracks().iter().position(|t| t.locator == locator) else {
            warn!("Ignoring selection of unknown track: {}", locator);
            return Err(SessionError::TrackNotFound(locator.to_string()));
        };

        self.current_index = Some(index);
        self.push_current(transport);
        Ok(())
    }

    pub fn next<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.step(1, transport);
    }

    pub fn previous<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.step(-1, transport);
    }

    fn step<T: Transport + ?Sized>(&mut self, delta: isize, transport: &mut T) {
        let len = self.active_tracks().len();
        let Some(current) = self.current_index else {
            return;
        };
        if len == 0 {
            return;
        }

        let next = (current as isize + delta).rem_euclid(len as isize) as usize;
        self.current_index = Some(next);
        self.push_current(transport);
    }

    // ---- transport intents -----------------------------------------------

    pub fn toggle_play<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Empty => Ok(()),
            SessionState::Playing => {
                transport.pause();
                self.transport_state = PlayIntent::Paused;
                Ok(())
            }
            SessionState::Ready | SessionState::Paused => match transport.play() {
                Ok(()) => {
                    self.transport_state = PlayIntent::Playing;
                    Ok(())
                }
                Err(err) => {
                    warn!("Play rejected: {}", err);
                    self.transport_state = PlayIntent::Paused;
                    Err(err.into())
                }
            },
        }
    }

    pub fn toggle_mute<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.is_muted = !self.is_muted;
        transport.set_muted(self.is_muted);
    }

    /// Seek within the current track. Out-of-range targets are clamped.
    pub fn seek<T: Transport + ?Sized>(&mut self, seconds: f64, transport: &mut T) {
        if self.current_index.is_none() {
            return;
        }

        let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if let Some(duration) = self.duration {
            target = target.min(duration);
        }

        self.position = target;
        transport.seek_to(target);
    }

    /// Relative seek, e.g. from arrow keys.
    pub fn seek_by<T: Transport + ?Sized>(&mut self, delta: f64, transport: &mut T) {
        self.seek(self.position + delta, transport);
    }

    // ---- engine events ---------------------------------------------------

    pub fn handle_event<T: Transport + ?Sized>(&mut self, event: TransportEvent, transport: &mut T) {
        if self.loaded.as_ref() != Some(&event.ticket) {
            debug!(
                "Dropping stale {:?} for {} (generation {})",
                event.kind, event.ticket.locator, event.ticket.generation
            );
            return;
        }

        match event.kind {
            TransportEventKind::TimeUpdated(seconds) => {
                self.position = self.clamp_position(seconds);
            }
            TransportEventKind::MetadataLoaded(duration) => {
                if duration.is_finite() && duration >= 0.0 {
                    self.duration = Some(duration);
                    self.position = self.clamp_position(self.position);
                }
            }
            TransportEventKind::Started => {
                self.transport_state = PlayIntent::Playing;
            }
            TransportEventKind::Stopped => {
                if self.transport_state == PlayIntent::Playing {
                    self.transport_state = PlayIntent::Paused;
                }
            }
            TransportEventKind::Ended => {
                debug!("Track ended: {}", event.ticket.locator);
                self.transport_state = PlayIntent::Playing;
                self.next(transport);
            }
        }
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        }
    }

    // ---- internals -------------------------------------------------------

    /// Keep the previously current track selected if the active list still
    /// has it; otherwise start from the top of the new list.
    fn follow_or_reset<T: Transport + ?Sized>(&mut self, previous: Option<String>, transport: &mut T) {
        let found = previous
            .as_deref()
            .and_then(|locator| self.active_tracks().iter().position(|t| t.locator == locator));

        match found {
            Some(index) => {
                // same track, new position in the list: no reload
                self.current_index = Some(index);
            }
            None => {
                self.current_index = if self.active_tracks().is_empty() { None } else { Some(0) };
                self.push_current(transport);
            }
        }
    }

    /// Hand the current track to the transport, or idle it when there is none.
    fn push_current<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.position = 0.0;
        self.duration = None;

        let Some(track) = self.current_track().cloned() else {
            if self.loaded.take().is_some() {
                transport.stop();
            }
            self.transport_state = PlayIntent::Ready;
            return;
        };

        self.generation += 1;
        let ticket = LoadTicket::new(self.generation, track.locator.clone());
        info!("Loading '{}' ({})", track.title, track.locator);
        transport.load(ticket.clone());
        self.loaded = Some(ticket);

        if self.transport_state == PlayIntent::Playing {
            if let Err(err) = transport.play() {
                warn!("Autoplay rejected for '{}': {}", track.title, err);
                self.transport_state = PlayIntent::Paused;
            }
        }
    }

    /// Ticket of the load the session currently listens to.
    pub fn loaded_ticket(&self) -> Option<&LoadTicket> {
        self.loaded.as_ref()
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

use super::{AudioConfig, LoadTicket, Transport, TransportEvent, TransportEventKind};
use crate::error::TransportError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bytes for a remote locator, delivered back from the fetch task.
struct Fetched {
    ticket: LoadTicket,
    result: Result<Vec<u8>, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayStart {
    Now,
    Deferred,
}

/// Per-load bookkeeping: which load is live, whether it is playable and
/// which events it has already reported. Knows nothing about the device.
struct LoadState {
    current: Option<LoadTicket>,
    has_source: bool,
    wants_play: bool,
    ended_sent: bool,
    load_error: Option<String>,
    event_sender: mpsc::UnboundedSender<TransportEvent>,
}

impl LoadState {
    fn new(event_sender: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            current: None,
            has_source: false,
            wants_play: false,
            ended_sent: false,
            load_error: None,
            event_sender,
        }
    }

    fn begin(&mut self, ticket: LoadTicket) {
        self.current = Some(ticket);
        self.has_source = false;
        self.wants_play = false;
        self.ended_sent = false;
        self.load_error = None;
    }

    fn clear(&mut self) {
        self.current = None;
        self.has_source = false;
        self.wants_play = false;
    }

    fn emit(&self, kind: TransportEventKind) {
        if let Some(ticket) = &self.current {
            let _ = self.event_sender.send(TransportEvent::new(ticket.clone(), kind));
        }
    }

    /// Bytes to attach for a finished fetch, or `None` if it was stale or failed.
    fn accept(&mut self, fetched: Fetched) -> Option<Vec<u8>> {
        if self.current.as_ref() != Some(&fetched.ticket) {
            debug!("Discarding bytes for stale load of {}", fetched.ticket.locator);
            return None;
        }
        match fetched.result {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// A decoded source is in the sink. Returns true if the sink should start now.
    fn attached(&mut self, duration: Option<Duration>) -> bool {
        self.has_source = true;

        if let Some(duration) = duration {
            self.emit(TransportEventKind::MetadataLoaded(duration.as_secs_f64()));
        }

        if self.wants_play {
            self.emit(TransportEventKind::Started);
        }
        self.wants_play
    }

    fn fail(&mut self, reason: String) {
        if let Some(ticket) = &self.current {
            warn!("Failed to load {}: {}", ticket.locator, reason);
        }
        self.load_error = Some(reason);
        if self.wants_play {
            self.wants_play = false;
            self.emit(TransportEventKind::Stopped);
        }
    }

    fn request_play(&mut self) -> Result<PlayStart, TransportError> {
        if let Some(err) = &self.load_error {
            return Err(TransportError::Rejected(err.clone()));
        }
        if self.current.is_none() {
            return Err(TransportError::Rejected("nothing loaded".to_string()));
        }

        if !self.has_source {
            // still fetching; start as soon as the bytes arrive
            self.wants_play = true;
            return Ok(PlayStart::Deferred);
        }
        if self.ended_sent {
            return Err(TransportError::Rejected("track already finished".to_string()));
        }

        self.wants_play = true;
        self.emit(TransportEventKind::Started);
        Ok(PlayStart::Now)
    }

    fn paused(&mut self) {
        self.wants_play = false;
        if self.current.is_some() {
            self.emit(TransportEventKind::Stopped);
        }
    }

    /// Report sink progress. `Ended` goes out once per load.
    fn progress(&mut self, drained: bool, paused: bool, position: Duration) {
        if !self.has_source || self.ended_sent {
            return;
        }

        if drained {
            self.ended_sent = true;
            self.emit(TransportEventKind::Ended);
        } else if !paused {
            self.emit(TransportEventKind::TimeUpdated(position.as_secs_f64()));
        }
    }
}

/// rodio-backed transport. Relays intents to the sink and reports what the
/// sink does through the event channel; `poll` must be called every tick.
pub struct RodioTransport {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    config: AudioConfig,
    muted: bool,
    state: LoadState,

    http: reqwest::Client,
    fetched_tx: mpsc::UnboundedSender<Fetched>,
    fetched_rx: mpsc::UnboundedReceiver<Fetched>,
}

impl RodioTransport {
    pub fn new(
        config: AudioConfig,
        event_sender: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| TransportError::Output(e.to_string()))?;
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();

        info!("Audio output ready (volume {:.2})", config.volume);

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
            muted: config.start_muted,
            config,
            state: LoadState::new(event_sender),
            http: reqwest::Client::new(),
            fetched_tx,
            fetched_rx,
        })
    }

    /// Deliver finished fetches and report sink progress.
    pub fn poll(&mut self) {
        while let Ok(fetched) = self.fetched_rx.try_recv() {
            if let Some(bytes) = self.state.accept(fetched) {
                self.attach(bytes);
            }
        }

        if let Some(sink) = self.sink.as_ref() {
            self.state.progress(sink.empty(), sink.is_paused(), sink.get_pos());
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.config.volume
        }
    }

    fn attach(&mut self, bytes: Vec<u8>) {
        if self.sink.is_none() {
            return;
        }

        let source = match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => source,
            Err(e) => {
                self.state.fail(format!("unsupported or corrupted audio: {}", e));
                return;
            }
        };

        let duration = source.total_duration();
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        sink.append(source);

        if self.state.attached(duration) {
            sink.play();
        }
    }

    fn spawn_fetch(&self, ticket: LoadTicket) {
        let client = self.http.clone();
        let tx = self.fetched_tx.clone();

        tokio::spawn(async move {
            let result = async {
                let response = client.get(&ticket.locator).send().await?.error_for_status()?;
                response.bytes().await.map(|b| b.to_vec())
            }
            .await
            .map_err(|e| e.to_string());

            let _ = tx.send(Fetched { ticket, result });
        });
    }
}

impl Transport for RodioTransport {
    fn load(&mut self, ticket: LoadTicket) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        self.state.begin(ticket.clone());

        match Sink::try_new(&self.stream_handle) {
            Ok(sink) => {
                sink.pause();
                sink.set_volume(self.effective_volume());
                self.sink = Some(sink);
            }
            Err(e) => {
                self.state.fail(format!("cannot open sink: {}", e));
                return;
            }
        }

        if is_remote(&ticket.locator) {
            debug!("Fetching remote track {}", ticket.locator);
            self.spawn_fetch(ticket);
        } else {
            match std::fs::read(&ticket.locator) {
                Ok(bytes) => self.attach(bytes),
                Err(e) => self.state.fail(format!("cannot read file: {}", e)),
            }
        }
    }

    fn play(&mut self) -> Result<(), TransportError> {
        if self.state.request_play()? == PlayStart::Now {
            if let Some(sink) = self.sink.as_ref() {
                sink.play();
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        self.state.paused();
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.state.clear();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.effective_volume());
        }
    }

    fn seek_to(&mut self, seconds: f64) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if !self.state.has_source || !seconds.is_finite() {
            return;
        }

        if let Err(e) = sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            warn!("Seek to {:.1}s failed: {}", seconds, e);
        }
    }
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> (LoadState, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LoadState::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn fetched(ticket: &LoadTicket, result: Result<Vec<u8>, String>) -> Fetched {
        Fetched {
            ticket: ticket.clone(),
            result,
        }
    }

    #[test]
    fn test_fetch_for_replaced_load_is_dropped() {
        let (mut state, mut rx) = state();
        let first = LoadTicket::new(1, "http://host/a.mp3");
        let second = LoadTicket::new(2, "http://host/b.mp3");

        state.begin(first.clone());
        state.begin(second.clone());

        assert!(state.accept(fetched(&first, Ok(vec![1, 2, 3]))).is_none());
        assert!(!state.has_source);
        assert_eq!(state.accept(fetched(&second, Ok(vec![4, 5]))), Some(vec![4, 5]));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_stale_failure_does_not_poison_current_load() {
        let (mut state, _rx) = state();
        let first = LoadTicket::new(1, "http://host/a.mp3");
        let second = LoadTicket::new(2, "http://host/a.mp3");

        state.begin(first.clone());
        state.begin(second);

        assert!(state.accept(fetched(&first, Err("404".to_string()))).is_none());
        assert!(state.load_error.is_none());
        assert_eq!(state.request_play().expect("play"), PlayStart::Deferred);
    }

    #[test]
    fn test_play_rejected_without_playable_load() {
        let (mut state, _rx) = state();
        assert!(matches!(state.request_play(), Err(TransportError::Rejected(_))));

        let ticket = LoadTicket::new(1, "http://host/a.mp3");
        state.begin(ticket.clone());
        assert!(state.accept(fetched(&ticket, Err("connection refused".to_string()))).is_none());

        match state.request_play() {
            Err(TransportError::Rejected(reason)) => assert_eq!(reason, "connection refused"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_deferred_play_then_failed_fetch_reports_stopped() {
        let (mut state, mut rx) = state();
        let ticket = LoadTicket::new(1, "http://host/a.mp3");
        state.begin(ticket.clone());

        assert_eq!(state.request_play().expect("play"), PlayStart::Deferred);
        assert!(drain(&mut rx).is_empty());

        state.accept(fetched(&ticket, Err("timeout".to_string())));

        let events = drain(&mut rx);
        assert_eq!(events, vec![TransportEvent::new(ticket, TransportEventKind::Stopped)]);
        assert!(!state.wants_play);
    }

    #[test]
    fn test_deferred_play_starts_when_source_attaches() {
        let (mut state, mut rx) = state();
        let ticket = LoadTicket::new(3, "http://host/a.mp3");
        state.begin(ticket.clone());
        state.request_play().expect("play");

        assert!(state.attached(Some(Duration::from_secs(90))));

        let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TransportEventKind::MetadataLoaded(90.0), TransportEventKind::Started]
        );
    }

    #[test]
    fn test_attach_without_play_stays_quiet() {
        let (mut state, mut rx) = state();
        state.begin(LoadTicket::new(1, "a.mp3"));

        assert!(!state.attached(None));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(state.request_play().expect("play"), PlayStart::Now);
    }

    #[test]
    fn test_ended_is_sent_once_per_load() {
        let (mut state, mut rx) = state();
        let ticket = LoadTicket::new(1, "a.mp3");
        state.begin(ticket.clone());
        state.attached(None);
        state.request_play().expect("play");
        drain(&mut rx);

        state.progress(false, false, Duration::from_secs(2));
        state.progress(true, false, Duration::ZERO);
        state.progress(true, false, Duration::ZERO);

        let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TransportEventKind::TimeUpdated(2.0), TransportEventKind::Ended]
        );
        assert!(matches!(state.request_play(), Err(TransportError::Rejected(_))));

        // a fresh load reports its own end again
        state.begin(LoadTicket::new(2, "a.mp3"));
        state.attached(None);
        state.progress(true, false, Duration::ZERO);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_paused_sink_reports_no_progress() {
        let (mut state, mut rx) = state();
        state.begin(LoadTicket::new(1, "a.mp3"));
        state.attached(None);

        state.progress(false, true, Duration::from_secs(5));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_remote_locators() {
        assert!(is_remote("https://host/a.mp3"));
        assert!(is_remote("http://host/a.mp3"));
        assert!(!is_remote("/music/a.mp3"));
    }
}

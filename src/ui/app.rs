use super::events::{Action, AppEvent, EventHandler, Focus, InputBinder, Intent};
use super::view::{self, PanelView};
use super::TerminalManager;
use crate::audio::{AudioConfig, RodioTransport, Transport, TransportEvent};
use crate::catalog::CatalogSource;
use crate::config::Config;
use crate::session::PlaybackSession;
use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const STATUS_TTL: Duration = Duration::from_secs(4);

pub struct App {
    config: Config,
    terminal: TerminalManager,
    session: PlaybackSession,
    transport: RodioTransport,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    binder: InputBinder,
    event_handler: EventHandler,
    source: CatalogSource,

    // UI state
    focus: Focus,
    show_panel: bool,
    list_state: ListState,
    search_input: String,
    status: Option<(String, Instant)>,
    loading: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let source = config.catalog_source()?;
        let (event_tx, transport_events) = mpsc::unbounded_channel();
        let mut transport = RodioTransport::new(AudioConfig::from(&config), event_tx)?;

        let mut session = PlaybackSession::new();
        if config.playback.start_muted {
            session.toggle_mute(&mut transport);
        }

        let terminal = TerminalManager::new()?;

        Ok(Self {
            show_panel: config.ui.show_panel,
            config,
            terminal,
            session,
            transport,
            transport_events,
            binder: InputBinder::with_defaults(),
            event_handler: EventHandler::new(),
            source,
            focus: Focus::Panel,
            list_state: ListState::default(),
            search_input: String::new(),
            status: None,
            loading: false,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Starting player, catalog from {}", self.source.describe());
        self.reload_catalog();

        let tick = Duration::from_millis(self.config.ui.tick_ms.max(10));

        while !self.should_quit {
            self.render()?;

            // crossterm polling blocks the thread; keep the wait short
            if event::poll(tick)? {
                if let Event::Key(key) = event::read()? {
                    if let Some(intent) = self.binder.resolve(key, self.focus) {
                        self.handle_intent(intent);
                    }
                }
            }

            self.transport.poll();
            relay_transport_events(
                &mut self.session,
                &mut self.transport_events,
                &mut self.transport,
                &mut self.list_state,
            );

            while let Some(event) = self.event_handler.try_next() {
                self.handle_app_event(event);
            }

            // let spawned fetch tasks make progress between ticks
            tokio::task::yield_now().await;
        }

        self.binder.clear();
        info!("Player closed");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        if let Some((_, since)) = &self.status {
            if since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }

        let panel = PanelView {
            session: &self.session,
            search_input: &self.search_input,
            focus: self.focus,
            show_panel: self.show_panel,
            loading: self.loading,
            status: self.status.as_ref().map(|(msg, _)| msg.as_str()),
        };
        let list_state = &mut self.list_state;

        self.terminal.draw(|f| view::render(f, &panel, list_state))
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Action(action) => self.handle_action(action),
            Intent::SearchInput(c) => {
                self.search_input.push(c);
                self.apply_query();
            }
            Intent::SearchBackspace => {
                self.search_input.pop();
                self.apply_query();
            }
            Intent::SearchExit => {
                self.focus = Focus::Panel;
            }
        }
    }

    fn handle_action(&mut self, action: Action) {
        debug!("Action: {}", action);
        match action {
            Action::TogglePlay => {
                if let Err(e) = self.session.toggle_play(&mut self.transport) {
                    self.set_status(format!("Cannot play: {}", e));
                }
            }
            Action::ToggleMute => self.session.toggle_mute(&mut self.transport),
            Action::SeekForward => {
                let step = self.config.playback.seek_step_seconds;
                self.session.seek_by(step, &mut self.transport);
            }
            Action::SeekBackward => {
                let step = self.config.playback.seek_step_seconds;
                self.session.seek_by(-step, &mut self.transport);
            }
            Action::NextTrack => {
                self.session.next(&mut self.transport);
                self.sync_cursor();
            }
            Action::PreviousTrack => {
                self.session.previous(&mut self.transport);
                self.sync_cursor();
            }
            Action::ToggleShuffle => {
                self.session.toggle_shuffle(&mut self.transport);
                self.sync_cursor();
            }
            Action::ReloadCatalog => self.reload_catalog(),
            Action::TogglePanel => self.show_panel = !self.show_panel,
            Action::FocusSearch => {
                if self.show_panel {
                    self.focus = Focus::SearchField;
                }
            }
            Action::CursorUp => self.move_cursor(-1),
            Action::CursorDown => self.move_cursor(1),
            Action::SelectCursor => self.select_cursor(),
            Action::Quit => self.should_quit = true,
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded(Ok(catalog)) => {
                self.loading = false;
                let count = catalog.len();
                self.session.replace_catalog(catalog, &mut self.transport);
                self.sync_cursor();
                self.set_status(format!("Loaded {} tracks", count));
            }
            AppEvent::CatalogLoaded(Err(e)) => {
                self.loading = false;
                error!("Failed to load catalog from {}: {}", self.source.describe(), e);
                self.set_status(format!("Catalog unavailable: {}", e));
            }
        }
    }

    fn reload_catalog(&mut self) {
        if self.loading {
            return;
        }
        self.loading = true;

        let source = self.source.clone();
        let sender = self.event_handler.sender();
        tokio::spawn(async move {
            let result = source.load().await;
            let _ = sender.send(AppEvent::CatalogLoaded(result));
        });
    }

    fn apply_query(&mut self) {
        self.session.set_query(&self.search_input, &mut self.transport);
        self.sync_cursor();
    }

    fn select_cursor(&mut self) {
        let Some(locator) = self
            .list_state
            .selected()
            .and_then(|i| self.session.active_tracks().get(i))
            .map(|track| track.locator.clone())
        else {
            return;
        };

        if let Err(e) = self.session.select_track(&locator, &mut self.transport) {
            warn!("Selection failed: {}", e);
            self.set_status(e.to_string());
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.session.active_tracks().len();
        if len == 0 {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.list_state.select(Some(next));
    }

    /// Point the list cursor at the current track after the list changed.
    fn sync_cursor(&mut self) {
        self.list_state.select(self.session.current_index());
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }
}

/// Feed engine events to the session in arrival order. When one of them
/// moves the current track (a finished track advancing), the list cursor
/// follows it.
fn relay_transport_events<T: Transport + ?Sized>(
    session: &mut PlaybackSession,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    transport: &mut T,
    list_state: &mut ListState,
) {
    let before = session.current_index();
    while let Ok(event) = events.try_recv() {
        session.handle_event(event, transport);
    }

    if session.current_index() != before {
        list_state.select(session.current_index());
    }
}

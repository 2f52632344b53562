use crate::catalog::Catalog;
use crate::error::{BindingError, FetchError};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// Things a bound key can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Transport
    TogglePlay,
    ToggleMute,
    SeekForward,
    SeekBackward,

    // Playlist
    NextTrack,
    PreviousTrack,
    ToggleShuffle,
    ReloadCatalog,

    // Panel
    TogglePanel,
    FocusSearch,
    CursorUp,
    CursorDown,
    SelectCursor,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a key press resolved to, given where focus is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Action(Action),
    SearchInput(char),
    SearchBackspace,
    SearchExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Panel,
    SearchField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }.normalized()
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    // Terminals disagree on whether 'M' carries SHIFT; the char already says it.
    fn normalized(mut self) -> Self {
        if let KeyCode::Char(_) = self.code {
            self.modifiers.remove(KeyModifiers::SHIFT);
        }
        self
    }
}

impl From<KeyEvent> for KeyBinding {
    fn from(key: KeyEvent) -> Self {
        Self::new(key.code, key.modifiers)
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            write!(f, "Alt+")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{}", c),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Key map for the player view. Lives as long as the view; `clear` on teardown.
#[derive(Debug, Default)]
pub struct InputBinder {
    bindings: HashMap<KeyBinding, Action>,
}

impl InputBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut binder = Self::new();
        for (key, action) in default_bindings() {
            if let Err(e) = binder.bind(key, action) {
                warn!("Skipping default binding: {}", e);
            }
        }
        binder
    }

    /// Bind `key` to `action`. A key can only ever mean one action.
    pub fn bind(&mut self, key: KeyBinding, action: Action) -> Result<(), BindingError> {
        let key = key.normalized();
        match self.bindings.get(&key) {
            Some(existing) if *existing == action => Ok(()),
            Some(existing) => Err(BindingError::Conflict {
                key: key.to_string(),
                existing: existing.to_string(),
                requested: action.to_string(),
            }),
            None => {
                self.bindings.insert(key, action);
                Ok(())
            }
        }
    }

    pub fn unbind(&mut self, key: KeyBinding) -> Option<Action> {
        self.bindings.remove(&key.normalized())
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn action_for(&self, key: KeyBinding) -> Option<Action> {
        self.bindings.get(&key.normalized()).copied()
    }

    /// Resolve a terminal key event. Global bindings never fire while the
    /// search field has focus; typing there only edits the query.
    pub fn resolve(&self, key: KeyEvent, focus: Focus) -> Option<Intent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match focus {
            Focus::Panel => self.action_for(key.into()).map(Intent::Action),
            Focus::SearchField => Self::resolve_text_entry(key),
        }
    }

    fn resolve_text_entry(key: KeyEvent) -> Option<Intent> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Intent::Action(Action::Quit)),
            (KeyCode::Esc, _) | (KeyCode::Enter, _) => Some(Intent::SearchExit),
            (KeyCode::Backspace, _) => Some(Intent::SearchBackspace),
            (KeyCode::Char(c), modifiers)
                if !c.is_control()
                    && !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(Intent::SearchInput(c))
            }
            _ => None,
        }
    }
}

fn default_bindings() -> Vec<(KeyBinding, Action)> {
    use KeyCode::*;
    vec![
        (KeyBinding::plain(Char(' ')), Action::TogglePlay),
        (KeyBinding::plain(Char('m')), Action::ToggleMute),
        (KeyBinding::plain(Char('M')), Action::ToggleMute),
        (KeyBinding::plain(Char('z')), Action::TogglePanel),
        (KeyBinding::plain(Char('Z')), Action::TogglePanel),
        (KeyBinding::plain(Char('n')), Action::NextTrack),
        (KeyBinding::plain(Char('p')), Action::PreviousTrack),
        (KeyBinding::plain(Char('s')), Action::ToggleShuffle),
        (KeyBinding::plain(Char('r')), Action::ReloadCatalog),
        (KeyBinding::plain(Char('/')), Action::FocusSearch),
        (KeyBinding::plain(Right), Action::SeekForward),
        (KeyBinding::plain(Left), Action::SeekBackward),
        (KeyBinding::plain(Up), Action::CursorUp),
        (KeyBinding::plain(Down), Action::CursorDown),
        (KeyBinding::plain(Enter), Action::SelectCursor),
        (KeyBinding::plain(Char('q')), Action::Quit),
        (KeyBinding::new(Char('c'), KeyModifiers::CONTROL), Action::Quit),
    ]
}

/// Results of background work, delivered back to the app loop.
#[derive(Debug)]
pub enum AppEvent {
    CatalogLoaded(Result<Catalog, FetchError>),
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    /// Next pending event, without waiting.
    pub fn try_next(&mut self) -> Option<AppEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_default_toggles() {
        let binder = InputBinder::with_defaults();
        let panel = Focus::Panel;

        assert_eq!(binder.resolve(press(KeyCode::Char(' ')), panel), Some(Intent::Action(Action::TogglePlay)));
        assert_eq!(binder.resolve(press(KeyCode::Char('m')), panel), Some(Intent::Action(Action::ToggleMute)));
        assert_eq!(binder.resolve(press(KeyCode::Char('Z')), panel), Some(Intent::Action(Action::TogglePanel)));
    }

    #[test]
    fn test_shifted_letters_resolve_like_plain_ones() {
        let binder = InputBinder::with_defaults();
        let key = KeyEvent::new(KeyCode::Char('M'), KeyModifiers::SHIFT);
        assert_eq!(binder.resolve(key, Focus::Panel), Some(Intent::Action(Action::ToggleMute)));
    }

    #[test]
    fn test_conflicting_binding_is_rejected() {
        let mut binder = InputBinder::with_defaults();
        let err = binder
            .bind(KeyBinding::plain(KeyCode::Char('m')), Action::NextTrack)
            .unwrap_err();
        assert!(matches!(err, BindingError::Conflict { .. }));
        assert_eq!(binder.action_for(KeyBinding::plain(KeyCode::Char('m'))), Some(Action::ToggleMute));

        // same action again is fine
        assert!(binder.bind(KeyBinding::plain(KeyCode::Char('m')), Action::ToggleMute).is_ok());
    }

    #[test]
    fn test_search_focus_suppresses_global_bindings() {
        let binder = InputBinder::with_defaults();
        let search = Focus::SearchField;

        assert_eq!(binder.resolve(press(KeyCode::Char(' ')), search), Some(Intent::SearchInput(' ')));
        assert_eq!(binder.resolve(press(KeyCode::Char('m')), search), Some(Intent::SearchInput('m')));
        assert_eq!(binder.resolve(press(KeyCode::Char('z')), search), Some(Intent::SearchInput('z')));
        assert_eq!(binder.resolve(press(KeyCode::Backspace), search), Some(Intent::SearchBackspace));
        assert_eq!(binder.resolve(press(KeyCode::Esc), search), Some(Intent::SearchExit));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(binder.resolve(ctrl_c, search), Some(Intent::Action(Action::Quit)));
    }

    #[test]
    fn test_release_events_are_ignored() {
        let binder = InputBinder::with_defaults();
        let mut key = press(KeyCode::Char(' '));
        key.kind = KeyEventKind::Release;
        assert_eq!(binder.resolve(key, Focus::Panel), None);
    }

    #[test]
    fn test_unbind_and_clear() {
        let mut binder = InputBinder::with_defaults();
        assert_eq!(binder.unbind(KeyBinding::plain(KeyCode::Char('z'))), Some(Action::TogglePanel));
        assert_eq!(binder.resolve(press(KeyCode::Char('z')), Focus::Panel), None);

        binder.clear();
        assert_eq!(binder.resolve(press(KeyCode::Char(' ')), Focus::Panel), None);
    }
}

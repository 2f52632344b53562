use super::events::Focus;
use crate::audio::format_time;
use crate::session::{ActiveListKind, PlaybackSession, SessionState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

const HELP: &str = "space play/pause  n/p next/prev  s shuffle  m mute  / search  ←/→ seek  z panel  q quit";

/// Everything the panel needs for one frame.
pub struct PanelView<'a> {
    pub session: &'a PlaybackSession,
    pub search_input: &'a str,
    pub focus: Focus,
    pub show_panel: bool,
    pub loading: bool,
    pub status: Option<&'a str>,
}

pub fn render(f: &mut Frame, view: &PanelView, list_state: &mut ListState) {
    let area = f.area();

    if !view.show_panel {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(4), Constraint::Length(1)])
            .split(area);
        render_now_playing(f, chunks[1], view.session);
        render_status(f, chunks[2], view);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(3), // Search
            Constraint::Min(3),    // Track list
            Constraint::Length(4), // Now playing
            Constraint::Length(1), // Status
        ])
        .split(area);

    render_header(f, chunks[0], view);
    render_search(f, chunks[1], view);
    render_track_list(f, chunks[2], view.session, list_state);
    render_now_playing(f, chunks[3], view.session);
    render_status(f, chunks[4], view);
}

fn render_header(f: &mut Frame, area: Rect, view: &PanelView) {
    let session = view.session;
    let on_off = |on: bool| if on { "On" } else { "Off" };

    let mut spans = vec![
        Span::styled("lofiplayer", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {} tracks", session.catalog_len())),
        Span::raw(format!("  Shuffle: {}", on_off(session.is_shuffled()))),
    ];
    if session.is_muted() {
        spans.push(Span::styled("  Muted", Style::default().fg(Color::Red)));
    }
    if view.loading {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_search(f: &mut Frame, area: Rect, view: &PanelView) {
    let focused = view.focus == Focus::SearchField;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut title = String::from(" Search ");
    if view.session.is_shuffled() && !view.search_input.is_empty() {
        title.push_str("(ignored while shuffle is on) ");
    }

    let text = if focused {
        format!("{}_", view.search_input)
    } else {
        view.search_input.to_string()
    };

    let search = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    f.render_widget(search, area);
}

fn render_track_list(f: &mut Frame, area: Rect, session: &PlaybackSession, list_state: &mut ListState) {
    let current = session.current_index();
    let items: Vec<ListItem> = session
        .active_tracks()
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            if Some(idx) == current {
                let marker = if session.is_playing() { "▶ " } else { "■ " };
                ListItem::new(format!("{}{}", marker, track.title)).style(
                    Style::default()
                        .fg(Color::LightCyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ListItem::new(format!("  {}", track.title))
            }
        })
        .collect();

    let title = match session.active_kind() {
        ActiveListKind::Catalog => " Tracks ".to_string(),
        ActiveListKind::Filtered => format!(" Tracks matching '{}' ", session.query()),
        ActiveListKind::Shuffled => " Tracks (shuffled) ".to_string(),
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));

    f.render_stateful_widget(list, area, list_state);
}

fn render_now_playing(f: &mut Frame, area: Rect, session: &PlaybackSession) {
    let block = Block::default().borders(Borders::ALL).title(" Now playing ");

    let Some(track) = session.current_track() else {
        let idle = Paragraph::new("Select an audio file to play").block(block);
        f.render_widget(idle, area);
        return;
    };

    let state = match session.state() {
        SessionState::Playing => "Playing",
        SessionState::Paused => "Paused",
        SessionState::Ready | SessionState::Empty => "Ready",
    };

    let (ratio, total) = match session.duration() {
        Some(duration) if duration > 0.0 => ((session.position() / duration).clamp(0.0, 1.0), format_time(duration)),
        _ => (0.0, "--:--".to_string()),
    };

    let gauge = Gauge::default()
        .block(block.title(format!(" {} - {} ", state, track.title)))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{} / {}", format_time(session.position()), total));

    f.render_widget(gauge, area);
}

fn render_status(f: &mut Frame, area: Rect, view: &PanelView) {
    let line = match view.status {
        Some(message) => Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Yellow))),
        None => Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    };
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{LoadTicket, Transport};
    use crate::catalog::{Catalog, Track};
    use crate::error::TransportError;
    use ratatui::{backend::TestBackend, Terminal};

    struct Silent;

    impl Transport for Silent {
        fn load(&mut self, _ticket: LoadTicket) {}
        fn play(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn stop(&mut self) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn seek_to(&mut self, _seconds: f64) {}
    }

    fn screen(view: &PanelView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).expect("terminal");
        let mut list_state = ListState::default();
        terminal.draw(|f| render(f, view, &mut list_state)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_panel_lists_tracks_and_current() {
        let mut session = PlaybackSession::with_seed(1);
        session.replace_catalog(
            Catalog::new(vec![Track::new("Rainy Night", "a"), Track::new("Coffee Shop", "b")]),
            &mut Silent,
        );

        let text = screen(&PanelView {
            session: &session,
            search_input: "",
            focus: Focus::Panel,
            show_panel: true,
            loading: false,
            status: None,
        });

        assert!(text.contains("Rainy Night"));
        assert!(text.contains("Coffee Shop"));
        assert!(text.contains("Shuffle: Off"));
        assert!(text.contains("--:--"));
    }

    #[test]
    fn test_hidden_panel_only_shows_now_playing() {
        let session = PlaybackSession::with_seed(1);

        let text = screen(&PanelView {
            session: &session,
            search_input: "",
            focus: Focus::Panel,
            show_panel: false,
            loading: false,
            status: Some("Catalog unavailable"),
        });

        assert!(text.contains("Select an audio file to play"));
        assert!(text.contains("Catalog unavailable"));
        assert!(!text.contains("Search"));
    }
}

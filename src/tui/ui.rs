//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::compose;
use super::help;
use super::messages;
use super::sidebar;

/// Returns status indicator symbol and color based on connection state
fn status_indicator(connected: bool) -> (&'static str, Color) {
    if connected {
        ("*", Color::Green)
    } else {
        ("o", Color::Red)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Layout: header (1 line) + main content + status bar (1 line)
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    // Split main area: sidebar (26 cols) + content
    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(26), Constraint::Fill(1)]).areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.roster,
        &app.sidebar,
        app.active_contact(),
        app.active_pane == Pane::Sidebar,
    );

    // Split content area: messages (fill) + compose box
    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    let title = app.active_contact_label();
    let typing = app.typing_from.clone();
    let messages_focused = app.active_pane == Pane::Messages;
    let user_id = app.user.id;

    let view = messages::MessagesView {
        conversation: app.conversation.as_ref(),
        user_id,
        title: &title,
        typing: typing.as_deref(),
    };
    messages::render(
        messages_area,
        frame.buffer_mut(),
        &view,
        &mut app.messages,
        messages_focused,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        &title,
        app.active_pane == Pane::Compose,
    );

    render_status(status_area, frame.buffer_mut(), app);

    if app.show_help {
        help::render_help_popup(frame);
    }
}

/// Render the header bar
fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = Span::styled(
        " CondoChat",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let help_indicator = Span::styled(" [?] Help ", Style::default().fg(Color::Gray));

    let (status_symbol, status_color) = status_indicator(app.connected);
    let connection = Span::styled(
        format!(
            " {} {} ",
            status_symbol,
            if app.connected { "online" } else { "offline" }
        ),
        Style::default().fg(status_color),
    );

    let user_name = Span::styled(
        format!(" {} ", app.user.display_name()),
        Style::default().fg(Color::Cyan),
    );

    // Right-align the trailing elements.
    let left_width = " CondoChat".len();
    let right_content = format!(
        "[?] Help  {} {}  {} ",
        status_symbol,
        if app.connected { "online" } else { "offline" },
        app.user.display_name()
    );
    let padding_width = area
        .width
        .saturating_sub((left_width + right_content.len()) as u16) as usize;
    let padding = Span::raw(" ".repeat(padding_width));

    let header_line = Line::from(vec![title, padding, help_indicator, connection, user_name]);

    Paragraph::new(header_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Render the status bar
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    // If there's a status message, show it prominently.
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).bg(Color::DarkGray)
        };
        let line = Line::from(Span::styled(format!(" {} ", msg), style));
        Paragraph::new(line)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let (conn_symbol, conn_color) = status_indicator(app.connected);
    let connection = Span::styled(
        format!(
            " {} {} ",
            conn_symbol,
            if app.connected {
                "Connected"
            } else {
                "Connecting..."
            }
        ),
        Style::default().fg(conn_color),
    );

    let sep_style = Style::default().fg(Color::DarkGray);

    let conversation = Span::styled(
        app.active_contact_label(),
        Style::default().fg(Color::Yellow),
    );

    let unread = Span::styled(
        format!("{} unread", app.roster.unread_total()),
        if app.roster.has_unread() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        },
    );

    let pane = Span::styled(
        format!("Tab: {}", app.active_pane.as_str()),
        Style::default().fg(Color::Cyan),
    );

    let help_hint = Span::styled("?: help", Style::default().fg(Color::Gray));

    let mut spans = vec![
        connection,
        Span::styled(" | ", sep_style),
        conversation,
        Span::styled(" | ", sep_style),
        unread,
        Span::styled(" | ", sep_style),
        pane,
        Span::styled(" | ", sep_style),
        help_hint,
    ];

    if app.is_sending() {
        spans.push(Span::styled(" | ", sep_style));
        spans.push(Span::styled(
            format!("{} sending...", app.pending_sends()),
            Style::default().fg(Color::Yellow),
        ));
    }

    // Trailing slot: the most recent captured log line, dimmed.
    if let Some(log) = app.logs.last() {
        spans.push(Span::styled(" | ", sep_style));
        spans.push(Span::styled(
            log,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
        ));
    }

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

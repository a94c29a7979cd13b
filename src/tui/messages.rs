//! Messages pane: renders the active conversation with sent/received
//! alignment, pending markers for optimistic sends, and the typing
//! indicator.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::store::ConversationStore;

/// Scroll state for the messages pane.
pub struct MessagesState {
    /// Vertical scroll offset in rendered lines (0 = top).
    pub scroll_offset: usize,
    /// Stick to the bottom as new messages arrive.
    pub follow: bool,
}

impl Default for MessagesState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            follow: true,
        }
    }
}

impl MessagesState {
    /// Reset for a newly opened conversation.
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
        self.follow = true;
    }

    /// Scroll up one line; leaves follow mode.
    pub fn scroll_up(&mut self) {
        self.follow = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// Scroll down one line; render re-enters follow mode at the bottom.
    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(1);
    }

    /// Jump to the newest message and follow again.
    pub fn jump_to_bottom(&mut self) {
        self.follow = true;
    }
}

/// What the pane needs from the app each frame.
pub struct MessagesView<'a> {
    pub conversation: Option<&'a ConversationStore>,
    pub user_id: u64,
    /// Header text, usually the contact's display name.
    pub title: &'a str,
    /// Name to show in the typing indicator row, when someone is typing.
    pub typing: Option<&'a str>,
}

/// Render the messages pane into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    view: &MessagesView,
    state: &mut MessagesState,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // First line is the conversation header.
    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let header_text = match view.conversation {
        Some(conv) if !conv.is_empty() => {
            format!("{} \u{00B7} {} messages", view.title, conv.len())
        }
        _ => view.title.to_string(),
    };
    render_header(header_area, buf, &header_text);

    let messages_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if messages_area.height == 0 {
        return;
    }

    let Some(conversation) = view.conversation else {
        center_notice(messages_area, buf, "Select a contact to start chatting");
        return;
    };

    if conversation.is_empty() && view.typing.is_none() {
        center_notice(messages_area, buf, "No messages yet. Say hello!");
        return;
    }

    let all_lines = build_message_lines(conversation, view, messages_area.width as usize);
    let total_lines = all_lines.len();
    let visible_height = messages_area.height as usize;

    // Clamp the scroll offset, or pin to the bottom in follow mode.
    let max_scroll = total_lines.saturating_sub(visible_height);
    if state.follow || state.scroll_offset > max_scroll {
        state.scroll_offset = max_scroll;
    }
    if state.scroll_offset == max_scroll {
        state.follow = true;
    }
    let scroll = state.scroll_offset;

    for (row, line_idx) in (scroll..total_lines).take(visible_height).enumerate() {
        let line_area = Rect::new(
            messages_area.x,
            messages_area.y + row as u16,
            messages_area.width,
            1,
        );
        Paragraph::new(all_lines[line_idx].clone()).render(line_area, buf);
    }

    // Scroll indicators.
    if total_lines > visible_height {
        let indicator_x = messages_area.x + messages_area.width.saturating_sub(1);
        if scroll > 0 {
            let cell = &mut buf[(indicator_x, messages_area.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if scroll + visible_height < total_lines {
            let bottom_y = messages_area.y + messages_area.height.saturating_sub(1);
            let cell = &mut buf[(indicator_x, bottom_y)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

fn render_header(area: Rect, buf: &mut Buffer, title: &str) {
    let line = Line::from(vec![Span::styled(
        format!(" {} ", title),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn center_notice(area: Rect, buf: &mut Buffer, text: &str) {
    let y = area.y + area.height / 2;
    let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
    Paragraph::new(line)
        .alignment(ratatui::layout::Alignment::Center)
        .render(Rect::new(area.x, y, area.width, 1), buf);
}

/// Build the flat line buffer for all messages plus the typing row.
fn build_message_lines(
    conversation: &ConversationStore,
    view: &MessagesView,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let content_width = width.saturating_sub(4).max(10);

    for msg in conversation.messages() {
        let sent = msg.is_from(view.user_id);
        let time = msg.sent_at.format("%H:%M");

        let mut meta = if sent {
            format!("me \u{00B7} {}", time)
        } else {
            format!("{} \u{00B7} {}", view.title, time)
        };
        if msg.is_pending() {
            meta.push_str(" (sending...)");
        } else if sent && msg.read {
            meta.push_str(" \u{2713}\u{2713}");
        }

        let meta_style = if msg.is_pending() {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        } else if sent {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Green)
        };

        push_aligned(&mut lines, &meta, width, sent, meta_style);

        let body_style = if msg.is_pending() {
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM)
        } else {
            Style::default().fg(Color::White)
        };
        for wrapped in wrap_text(&msg.content, content_width) {
            push_aligned(&mut lines, &wrapped, width, sent, body_style);
        }

        lines.push(Line::from(""));
    }

    if let Some(name) = view.typing {
        lines.push(Line::from(Span::styled(
            format!(" {} is typing...", name),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Push one line, right-aligned for sent messages, left-aligned otherwise.
fn push_aligned(
    lines: &mut Vec<Line<'static>>,
    text: &str,
    width: usize,
    right: bool,
    style: Style,
) {
    let text_width = unicode_width::UnicodeWidthStr::width(text);
    if right {
        let pad = width.saturating_sub(text_width + 1);
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(pad)),
            Span::styled(text.to_string(), style),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::raw(" "),
            Span::styled(text.to_string(), style),
        ]));
    }
}

/// Simple word-wrapping: split content by newlines first, then wrap long
/// lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.len() <= max_width {
            result.push(line.to_string());
        } else {
            let words: Vec<&str> = line.split_whitespace().collect();
            let mut current = String::new();
            for word in words {
                if current.is_empty() {
                    current = word.to_string();
                } else if current.len() + 1 + word.len() <= max_width {
                    current.push(' ');
                    current.push_str(word);
                } else {
                    result.push(current);
                    current = word.to_string();
                }
            }
            if !current.is_empty() {
                result.push(current);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_respects_width() {
        let wrapped = wrap_text("one two three four five", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn test_wrap_text_keeps_existing_newlines() {
        let wrapped = wrap_text("hello\nworld", 20);
        assert_eq!(wrapped, vec!["hello", "world"]);
    }

    #[test]
    fn test_scroll_state_follow_transitions() {
        let mut state = MessagesState::default();
        assert!(state.follow);

        state.scroll_up();
        assert!(!state.follow);

        state.jump_to_bottom();
        assert!(state.follow);
    }
}

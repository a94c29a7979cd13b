//! Sidebar widget: the contact list, ordered by recency with unread badges
//! and online dots.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::store::Roster;

/// Sidebar navigation state. Rows come from `Roster::ordered` at render
/// time; only the cursor lives here.
pub struct SidebarState {
    /// Index into the recency-ordered contact list.
    pub selected: usize,
    /// Whether the directory fetch is still in flight.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            selected: 0,
            loading: true,
        }
    }
}

impl SidebarState {
    /// Move selection up.
    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Move selection down.
    pub fn move_down(&mut self, count: usize) {
        if count > 0 && self.selected < count - 1 {
            self.selected += 1;
        }
    }

    /// Clamp selected index to valid range after the list changes.
    pub fn clamp(&mut self, count: usize) {
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }
}

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    roster: &Roster,
    state: &SidebarState,
    active_contact: Option<u64>,
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
        .border_style(border_style)
        .title(" Contacts ");

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if state.loading && roster.is_empty() {
        let line = Line::from(Span::styled(
            " Loading...",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let contacts = roster.ordered();
    if contacts.is_empty() {
        let line = Line::from(Span::styled(
            " (no contacts)",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let available_height = inner.height as usize;
    let scroll_offset = compute_scroll_offset(state.selected, available_height, contacts.len());

    for (row_idx, contact_idx) in (scroll_offset..contacts.len())
        .take(available_height)
        .enumerate()
    {
        let contact = contacts[contact_idx];
        let row_area = Rect::new(inner.x, inner.y + row_idx as u16, inner.width, 1);

        let is_cursor = contact_idx == state.selected;
        let is_active = active_contact == Some(contact.id);
        let unread = roster.unread_count(contact.id);

        let cursor = if is_cursor { "\u{25BA}" } else { " " };
        let marker = if is_active { "=" } else { " " };
        let label = format!("{}{} {}", cursor, marker, contact.display_name());
        let preview = roster.preview(contact.id).unwrap_or("");

        let badge = if unread > 0 {
            format!("{}", unread)
        } else if contact.online {
            "*".to_string()
        } else {
            String::new()
        };

        let style = item_style(is_cursor, unread > 0);
        let bstyle = if unread > 0 {
            badge_style(is_cursor)
        } else if contact.online {
            Style::default().fg(Color::Green)
        } else {
            style
        };

        render_row(buf, row_area, &label, preview, &badge, style, bstyle);
    }
}

/// Simple scroll offset: keep the cursor row visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    selected.saturating_sub(height - 1).min(max_offset)
}

/// Style for a contact row based on cursor and unread state.
fn item_style(selected: bool, has_unread: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if has_unread {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

/// Style for the unread badge.
fn badge_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Yellow)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }
}

/// Render a row: name, a dimmed last-message preview, and an optional
/// right-aligned badge.
fn render_row(
    buf: &mut Buffer,
    area: Rect,
    left: &str,
    preview: &str,
    badge: &str,
    text_style: Style,
    badge_style: Style,
) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    let badge_len = badge.len();
    let max_left = if badge_len > 0 {
        width.saturating_sub(badge_len + 1)
    } else {
        width
    };

    let left_truncated: String = left.chars().take(max_left).collect();
    let left_len = left_truncated.chars().count();

    // Preview squeezes into whatever is left between name and badge.
    let preview_room = max_left.saturating_sub(left_len + 2);
    let preview_truncated: String = preview
        .chars()
        .take_while(|c| *c != '\n')
        .take(preview_room)
        .collect();
    let preview_len = preview_truncated.chars().count();
    let preview_span = if preview_len > 0 {
        format!("  {}", preview_truncated)
    } else {
        String::new()
    };

    let pad = width.saturating_sub(left_len + preview_span.chars().count() + badge_len);

    let line = Line::from(vec![
        Span::styled(left_truncated, text_style),
        Span::styled(
            preview_span,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        ),
        Span::styled(" ".repeat(pad), text_style),
        Span::styled(badge.to_string(), badge_style),
    ]);

    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement_clamps() {
        let mut state = SidebarState::default();
        state.move_up();
        assert_eq!(state.selected, 0);

        state.move_down(3);
        state.move_down(3);
        state.move_down(3);
        assert_eq!(state.selected, 2);

        state.clamp(2);
        assert_eq!(state.selected, 1);

        state.clamp(0);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_scroll_offset_keeps_cursor_visible() {
        assert_eq!(compute_scroll_offset(0, 5, 10), 0);
        assert_eq!(compute_scroll_offset(4, 5, 10), 0);
        assert_eq!(compute_scroll_offset(7, 5, 10), 3);
        assert_eq!(compute_scroll_offset(9, 5, 10), 5);
    }
}

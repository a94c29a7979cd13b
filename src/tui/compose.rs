//! Compose box: single-line text input with cursor handling and
//! horizontal scrolling.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position (character offset into `input`).
    pub cursor_pos: usize,
}

impl ComposeState {
    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert(byte_pos, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let prev_byte_pos = self.char_to_byte(self.cursor_pos - 1);
            self.input.drain(prev_byte_pos..byte_pos);
            self.cursor_pos -= 1;
        }
    }

    /// Delete the character at the cursor (delete key).
    pub fn delete(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor_pos < char_count {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let next_byte_pos = self.char_to_byte(self.cursor_pos + 1);
            self.input.drain(byte_pos..next_byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
        }
    }

    pub fn move_right(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor_pos < char_count {
            self.cursor_pos += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.input.chars().count();
    }

    /// Clear all input text (Ctrl+U).
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    /// Take the trimmed text for sending and clear the box.
    /// Returns None if the input is empty or whitespace-only.
    pub fn take(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.clear();
        Some(text)
    }

    /// Restore a draft after a failed send, unless the user already typed
    /// something new.
    pub fn restore(&mut self, draft: &str) {
        if self.input.is_empty() {
            self.input = draft.to_string();
            self.cursor_pos = self.input.chars().count();
        }
    }

    /// Convert a char-based cursor position to a byte offset.
    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Height of the compose box: border + input line + border.
pub const COMPOSE_HEIGHT: u16 = 3;

/// Render the compose box.
///
/// Uses `Frame` directly so we can both write to the buffer and set the
/// cursor.
pub fn render(
    area: Rect,
    frame: &mut Frame,
    state: &ComposeState,
    recipient: &str,
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
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let cursor = compute_cursor_position(input_area, state, focused);

    render_input(input_area, frame.buffer_mut(), state, recipient);

    if let Some((cx, cy)) = cursor {
        frame.set_cursor_position((cx, cy));
    }
}

/// Compute the cursor position if the compose box is focused.
fn compute_cursor_position(
    input_area: Rect,
    state: &ComposeState,
    focused: bool,
) -> Option<(u16, u16)> {
    if !focused {
        return None;
    }

    if state.input.is_empty() {
        Some((input_area.x + 1, input_area.y))
    } else {
        let w = input_area.width as usize;
        let display = display_text(&state.input, state.cursor_pos, w);
        Some((input_area.x + 1 + display.cursor_offset as u16, input_area.y))
    }
}

/// Render the input line (with placeholder or text).
fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, recipient: &str) {
    let w = area.width as usize;

    if state.input.is_empty() {
        let placeholder = format!(" Message {}... (Enter to send)", recipient);
        let truncated: String = placeholder.chars().take(w).collect();
        let line = Line::from(Span::styled(
            truncated,
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(area, buf);
    } else {
        let display = display_text(&state.input, state.cursor_pos, w);
        let line = Line::from(Span::styled(
            format!(" {}", display.visible),
            Style::default().fg(Color::White),
        ));
        Paragraph::new(line).render(area, buf);
    }
}

/// The visible slice of the input and where the cursor falls in it.
struct DisplayText {
    visible: String,
    cursor_offset: usize,
}

/// Horizontal scrolling keeps the cursor inside the visible window.
fn display_text(input: &str, cursor_pos: usize, width: usize) -> DisplayText {
    // One column margin for the leading space.
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return DisplayText {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= avail {
        return DisplayText {
            visible: input.to_string(),
            cursor_offset: cursor_pos,
        };
    }

    let scroll_start = if cursor_pos < avail {
        0
    } else {
        cursor_pos - avail + 1
    };
    let end = (scroll_start + avail).min(chars.len());

    DisplayText {
        visible: chars[scroll_start..end].iter().collect(),
        cursor_offset: cursor_pos - scroll_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_take() {
        let mut state = ComposeState::default();
        for c in "  hola  ".chars() {
            state.insert_char(c);
        }
        assert_eq!(state.take().as_deref(), Some("hola"));
        assert!(state.input.is_empty());
        assert!(state.take().is_none());
    }

    #[test]
    fn test_backspace_and_delete_multibyte() {
        let mut state = ComposeState::default();
        for c in "niño".chars() {
            state.insert_char(c);
        }
        state.move_left();
        state.backspace(); // removes 'ñ'
        assert_eq!(state.input, "nio");

        state.move_home();
        state.delete(); // removes 'n'
        assert_eq!(state.input, "io");
    }

    #[test]
    fn test_restore_keeps_newer_input() {
        let mut state = ComposeState::default();
        state.restore("old draft");
        assert_eq!(state.input, "old draft");

        state.clear();
        state.insert_char('x');
        state.restore("old draft");
        assert_eq!(state.input, "x");
    }

    #[test]
    fn test_display_text_scrolls_to_cursor() {
        let input = "abcdefghij";
        // Width 6 leaves 5 columns: cursor at the end scrolls the window.
        let d = display_text(input, 10, 6);
        assert_eq!(d.visible, "ghij");
        assert_eq!(d.cursor_offset, 4);

        let d = display_text(input, 0, 6);
        assert_eq!(d.cursor_offset, 0);
        assert_eq!(d.visible, "abcde");
    }
}

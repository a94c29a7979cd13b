//! Help popup overlay: keyboard shortcuts organized by category.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget},
    Frame,
};

const POPUP_WIDTH: u16 = 56;
const POPUP_HEIGHT: u16 = 20;

/// A shortcut entry: key binding and its description.
struct Shortcut {
    key: &'static str,
    desc: &'static str,
}

/// A category of shortcuts with a title.
struct Category {
    title: &'static str,
    shortcuts: &'static [Shortcut],
}

const CATEGORIES: &[Category] = &[
    Category {
        title: "NAVIGATION",
        shortcuts: &[
            Shortcut {
                key: "Tab / Shift+Tab",
                desc: "Cycle focus between panes",
            },
            Shortcut {
                key: "Up/Down",
                desc: "Move cursor / scroll",
            },
            Shortcut {
                key: "G",
                desc: "Jump to newest message",
            },
            Shortcut {
                key: "Esc",
                desc: "Back to contact list",
            },
        ],
    },
    Category {
        title: "CHAT",
        shortcuts: &[
            Shortcut {
                key: "Enter (contacts)",
                desc: "Open conversation",
            },
            Shortcut {
                key: "Enter (compose)",
                desc: "Send message",
            },
            Shortcut {
                key: "Ctrl+U",
                desc: "Clear compose input",
            },
            Shortcut {
                key: "r",
                desc: "Refresh contact list",
            },
        ],
    },
    Category {
        title: "GENERAL",
        shortcuts: &[
            Shortcut {
                key: "?",
                desc: "Toggle this help",
            },
            Shortcut {
                key: "q / Ctrl+C",
                desc: "Quit",
            },
        ],
    },
];

/// Render the help popup centered on the frame.
pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();
    let width = POPUP_WIDTH.min(area.width);
    let height = POPUP_HEIGHT.min(area.height);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    Clear.render(popup, frame.buffer_mut());

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines: Vec<Line> = Vec::new();
    for category in CATEGORIES {
        lines.push(Line::from(Span::styled(
            category.title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
        for shortcut in category.shortcuts {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<18}", shortcut.key),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(shortcut.desc, Style::default().fg(Color::Gray)),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "Press any key to close",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}

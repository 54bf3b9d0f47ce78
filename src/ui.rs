pub mod charting;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::{ui::screen::current_screen, App};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

pub(crate) fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub(crate) fn italic_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Clip `text` to `width` terminal columns, marking the cut with an ellipsis
pub(crate) fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        let next = format!("{out}{c}");
        if next.width() + 1 > width {
            break;
        }
        out = next;
    }
    out.push('…');
    out
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let screen = current_screen(&self.state);
        let banner_lines = if self.focus_losses > 0 { 1 } else { 0 };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(banner_lines),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let width = chunks[0].width as usize;
        let status = screen.status(self);
        let title = fit_width(screen.title(), width.saturating_sub(status.width() + 1));
        let gap = width.saturating_sub(title.width() + status.width());
        Paragraph::new(Line::from(vec![
            Span::styled(title, bold_style().fg(Color::Cyan)),
            Span::raw(" ".repeat(gap)),
            Span::styled(status, bold_style()),
        ]))
        .render(chunks[0], buf);

        if self.focus_losses > 0 {
            let notice = format!(
                "The assessment window lost focus ({}×). Timers keep running.",
                self.focus_losses
            );
            Paragraph::new(Span::styled(
                fit_width(&notice, width),
                bold_style().fg(Color::Black).bg(Color::Yellow),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }

        screen.render(self, chunks[3], buf);

        Paragraph::new(Span::styled(
            fit_width(screen.legend(self), width),
            italic_style(),
        ))
        .render(chunks[4], buf);
    }
}

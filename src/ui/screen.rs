use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use reckon::{
    challenge::Phase,
    remote::{protocol::tile_glyph, Position, RemoteStatus},
    results::ReportOutcome,
    util::format_clock,
};

use super::{bold_style, charting, fit_width, italic_style};
use crate::{App, AppState};

/// A UI Screen boundary: what sits between the header and the key legend
pub trait Screen {
    fn title(&self) -> &'static str;
    /// Right-aligned header text, usually the running timers
    fn status(&self, _app: &App) -> String {
        String::new()
    }
    fn legend(&self, app: &App) -> &'static str;
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Operator gate shown before anything is timed
pub struct ChecksScreen;

impl Screen for ChecksScreen {
    fn title(&self) -> &'static str {
        "Pre-checks"
    }

    fn legend(&self, app: &App) -> &'static str {
        if reckon::checks::all_passed(&app.checks) {
            "(enter) continue / (c) run checks again / (esc)ape"
        } else {
            "(c) run checks again / (esc)ape"
        }
    }

    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        if app.checks.is_empty() {
            Paragraph::new(Span::styled("Press c to run the pre-checks.", italic_style()))
                .render(area, buf);
            return;
        }

        let name_width = app.checks.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let lines = app
            .checks
            .iter()
            .map(|c| {
                let (mark, color) = if c.passed {
                    ("✓", Color::Green)
                } else {
                    ("✗", Color::Red)
                };
                Line::from(vec![
                    Span::styled(format!("{mark} "), bold_style().fg(color)),
                    Span::styled(format!("{:name_width$}  ", c.name), bold_style()),
                    Span::raw(c.detail.clone()),
                ])
            })
            .collect::<Vec<_>>();

        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

/// Local ordering challenge: instructions, the 3x3 board, then a summary
pub struct BubblesScreen;

impl Screen for BubblesScreen {
    fn title(&self) -> &'static str {
        "Ordering challenge"
    }

    fn status(&self, app: &App) -> String {
        let challenge = &app.challenge;
        match (challenge.phase(), challenge.round()) {
            (Phase::Playing, Some(round)) => format!(
                "round {}/{}   {} left   session {}",
                round.index,
                challenge.settings().total_rounds,
                format_clock(challenge.clock().remaining_round_secs()),
                format_clock(challenge.clock().remaining_session_secs()),
            ),
            _ => String::new(),
        }
    }

    fn legend(&self, app: &App) -> &'static str {
        match app.challenge.phase() {
            Phase::Instructions => "(enter) begin / (esc)ape",
            Phase::Playing => "(1-9) pick a bubble / (s)ubmit early / (esc)ape",
            Phase::Complete => "(n)ext challenge / (esc)ape",
        }
    }

    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        match app.challenge.phase() {
            Phase::Instructions => render_instructions(app, area, buf),
            Phase::Playing => render_board(app, area, buf),
            Phase::Complete => render_summary(app, area, buf),
        }
    }
}

fn render_instructions(app: &App, area: Rect, buf: &mut Buffer) {
    let settings = app.challenge.settings();
    let text = vec![
        Line::from(Span::styled("How it works", bold_style())),
        Line::from(""),
        Line::from(
            "Each round shows a few arithmetic expressions on a 3x3 board. Pick them \
             from the lowest value to the highest using keys 1-9 (1 is top-left, 9 is \
             bottom-right).",
        ),
        Line::from(
            "Wrong picks count against you and are not announced. A round ends when \
             every bubble is gone or its timer runs out.",
        ),
        Line::from(""),
        Line::from(format!(
            "{} rounds, {} per round, {} in total.",
            settings.total_rounds,
            format_clock(settings.round_limit.as_secs()),
            format_clock(settings.session_limit.as_secs()),
        )),
    ];
    Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_board(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(round) = app.challenge.round() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    for (r, row_area) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(*row_area);

        for (c, cell_area) in cells.iter().enumerate() {
            let stimulus = round.stimuli().iter().find(|s| {
                usize::from(s.slot.row) == r
                    && usize::from(s.slot.col) == c
                    && !round.is_consumed(s.id)
            });
            let Some(stimulus) = stimulus else {
                continue;
            };

            let board_key = r * 3 + c + 1;
            let inner_width = cell_area.width.saturating_sub(2) as usize;
            let expression = fit_width(&stimulus.display_expression, inner_width);
            let top_pad = cell_area.height.saturating_sub(3) / 2;
            let mut lines = vec![Line::from(""); top_pad as usize];
            lines.push(Line::from(Span::styled(expression, bold_style())));

            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Magenta))
                        .title(Span::styled(board_key.to_string(), italic_style())),
                )
                .render(*cell_area, buf);
        }
    }
}

fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let summary = app.challenge.summary();
    let mean = summary
        .mean_round_secs
        .map_or_else(|| "-".to_string(), |m| format!("{m:.1}s"));
    let text = vec![
        Line::from(Span::styled(
            "Ordering challenge complete",
            bold_style().fg(Color::Green),
        )),
        Line::from(""),
        Line::from(format!(
            "rounds played {}   rounds cleared {}   mean round time {}",
            summary.rounds_played, summary.rounds_cleared, mean
        )),
        Line::from(Span::styled(
            format!("net score {}", summary.total_net_score),
            bold_style(),
        )),
    ];
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .render(area, buf);
}

/// Remote grid puzzle
pub struct GridScreen;

impl Screen for GridScreen {
    fn title(&self) -> &'static str {
        "Grid challenge"
    }

    fn status(&self, app: &App) -> String {
        match app.grid.status() {
            RemoteStatus::Playing | RemoteStatus::Animating => {
                format!("time {}", format_clock(app.grid.countdown().remaining_secs()))
            }
            _ => String::new(),
        }
    }

    fn legend(&self, app: &App) -> &'static str {
        match app.grid.status() {
            RemoteStatus::Idle | RemoteStatus::Unavailable => "(enter) start / (esc)ape",
            RemoteStatus::Playing => {
                "(arrows) move / (enter) select / (r)otate / (f)lip / (s)ubmit / (esc)ape"
            }
            RemoteStatus::Won | RemoteStatus::Lost => "(n)ext / (esc)ape",
            RemoteStatus::Starting | RemoteStatus::Animating => "(esc)ape",
        }
    }

    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let grid = &app.grid;
        let message = match grid.status() {
            RemoteStatus::Idle => Some("Press enter to start the grid challenge.".to_string()),
            RemoteStatus::Starting => Some("Contacting the puzzle service…".to_string()),
            RemoteStatus::Unavailable => Some(format!(
                "The puzzle service is unavailable ({}). Press enter to try again.",
                grid.last_error().unwrap_or("no response")
            )),
            _ => None,
        };
        if let Some(message) = message {
            Paragraph::new(message)
                .wrap(Wrap { trim: true })
                .render(area, buf);
            return;
        }

        let (start, end) = grid.endpoints();
        let revealed = grid.revealed_path();
        let mut lines: Vec<Line> = grid
            .grid()
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let spans = row
                    .iter()
                    .enumerate()
                    .map(|(c, tile)| {
                        let pos = Position::new(r, c);
                        let mut style = Style::default();
                        if Some(pos) == start {
                            style = style.fg(Color::Green);
                        } else if Some(pos) == end {
                            style = style.fg(Color::Magenta);
                        }
                        if revealed.contains(&pos) {
                            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                        }
                        if grid.selected() == Some(pos) {
                            style = style.bg(Color::Yellow).fg(Color::Black);
                        }
                        if app.cursor == pos && grid.status() == RemoteStatus::Playing {
                            style = style.add_modifier(Modifier::REVERSED);
                        }
                        Span::styled(format!(" {} ", tile_glyph(tile)), style)
                    })
                    .collect::<Vec<_>>();
                Line::from(spans)
            })
            .collect();

        let counters = grid.counters();
        lines.push(Line::from(""));
        lines.push(Line::from(
            [
                format!("moves {}", counters.moves),
                format!("rotations {}", counters.rotations),
                format!("flips {}", counters.flips),
                format!("submissions {}", grid.submit_attempts()),
            ]
            .iter()
            .join("   "),
        ));
        if grid.is_waiting() {
            lines.push(Line::from(Span::styled("waiting for the service…", italic_style())));
        } else if let Some(err) = grid.last_error() {
            lines.push(Line::from(Span::styled(
                format!("last move failed: {err}"),
                Style::default().fg(Color::Red),
            )));
        }
        match grid.status() {
            RemoteStatus::Won => lines.push(Line::from(Span::styled(
                "Solved.",
                bold_style().fg(Color::Green),
            ))),
            RemoteStatus::Lost => lines.push(Line::from(Span::styled(
                "Time is up.",
                bold_style().fg(Color::Red),
            ))),
            _ => {}
        }

        Paragraph::new(lines).render(area, buf);
    }
}

/// Net score per round, session totals, and where the results went
pub struct ReportScreen;

impl Screen for ReportScreen {
    fn title(&self) -> &'static str {
        "Results"
    }

    fn legend(&self, _app: &App) -> &'static str {
        "(esc)ape"
    }

    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(4)])
            .split(area);

        let points = charting::net_score_points(app.challenge.results());
        let (x_bounds, y_bounds) = charting::compute_chart_params(&points);
        let datasets = vec![Dataset::default()
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("round")
                    .bounds(x_bounds)
                    .labels(vec![
                        Span::styled("1", bold_style()),
                        Span::styled(charting::format_label(x_bounds[1]), bold_style()),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("net")
                    .bounds(y_bounds)
                    .labels(vec![
                        Span::styled(charting::format_label(y_bounds[0]), bold_style()),
                        Span::styled(charting::format_label(y_bounds[1]), bold_style()),
                    ]),
            )
            .render(chunks[0], buf);

        let summary = app.challenge.summary();
        let grid = match app.grid.status() {
            RemoteStatus::Won => "solved",
            RemoteStatus::Lost => "not solved",
            _ => "not played",
        };
        let delivery = match &app.report {
            None => "Uploading results…".to_string(),
            Some(ReportOutcome::Posted { id, .. }) => match id {
                Some(id) => format!("Results uploaded ({id})."),
                None => "Results uploaded.".to_string(),
            },
            Some(ReportOutcome::StoredLocally { path, .. }) => format!(
                "Upload failed; results kept in {} for a later --resend-pending.",
                path.display()
            ),
            Some(ReportOutcome::Dropped { reason }) => {
                format!("Results could not be saved: {reason}")
            }
        };

        Paragraph::new(vec![
            Line::from(Span::styled(
                format!(
                    "ordering: net {} over {} rounds   grid: {}",
                    summary.total_net_score, summary.rounds_played, grid
                ),
                bold_style(),
            )),
            Line::from(Span::styled(delivery, italic_style())),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Checks => Box::new(ChecksScreen),
        AppState::Bubbles => Box::new(BubblesScreen),
        AppState::Grid => Box::new(GridScreen),
        AppState::Report => Box::new(ReportScreen),
    }
}

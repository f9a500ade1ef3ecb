pub mod charting;
pub mod history;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

use crate::session::{Outcome, Phase, Session};
use crate::{App, SaveStatus};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.session.has_finished() {
            render_results(self, area, buf);
        } else {
            render_typing(self, area, buf);
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;

    let dim_bold_style = Style::default().add_modifier(Modifier::BOLD | Modifier::DIM);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let passage_lines = passage_spans(session);
    let mut prompt_occupied_lines = passage_lines.len() as u16;
    if passage_lines.len() == 1 && session.target.width() > max_chars_per_line as usize {
        // single-line word passages wrap
        prompt_occupied_lines =
            ((session.target.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(
                    (area.height.saturating_sub(prompt_occupied_lines + 4) / 2).max(1),
                ),
                Constraint::Length(2), // snippet title
                Constraint::Length(2), // countdown / idle hint
                Constraint::Length(prompt_occupied_lines),
                Constraint::Min(2), // live stats
            ]
            .as_ref(),
        )
        .split(area);

    if let Some(title) = &session.title {
        let title_widget = Paragraph::new(Span::styled(
            format!("Snippet: {}", title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        title_widget.render(chunks[1], buf);
    }

    match session.phase() {
        Phase::Idle => {
            let hint = Paragraph::new(Span::styled(
                "Start typing to begin!",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center);
            hint.render(chunks[2], buf);
        }
        _ => {
            // countdown turns red for the last stretch
            let timer_style = if session.time_remaining() < 10 {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                dim_bold_style
            };
            let timer = Paragraph::new(Span::styled(
                format!("{}", session.time_remaining()),
                timer_style,
            ))
            .alignment(Alignment::Center);
            timer.render(chunks[2], buf);
        }
    }

    let single_line = passage_lines.len() == 1 && prompt_occupied_lines == 1;
    let passage = Paragraph::new(passage_lines)
        .alignment(if single_line {
            // when the passage fits on one line, centering gives a
            // nice zen feeling
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false });
    passage.render(chunks[3], buf);

    if session.has_started() {
        let live = session.live_stats();
        let stats = Paragraph::new(Span::styled(
            format!("{} wpm   {}% acc", live.wpm, live.accuracy),
            dim_bold_style,
        ))
        .alignment(Alignment::Center);
        stats.render(chunks[4], buf);
    }
}

/// Per-character styling of the target passage: correct input green,
/// incorrect input red (the mistyped character is shown, whitespace as
/// `·`), the caret underlined, untyped text dim. Literal newlines in
/// code passages break lines.
fn passage_spans(session: &Session) -> Vec<Line<'static>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);

    let mut lines = Vec::new();
    let mut spans: Vec<Span> = Vec::new();

    for (idx, expected) in session.target.chars().enumerate() {
        let is_cursor = idx == session.cursor_pos();

        let (symbol, style) = match session.outcome_at(idx) {
            Some(Outcome::Correct) => (visible(expected), green_bold_style),
            Some(Outcome::Incorrect) => {
                let typed = session.typed()[idx];
                let shown = match typed {
                    ' ' | '\n' | '\t' => "·".to_owned(),
                    c => c.to_string(),
                };
                (shown, red_bold_style)
            }
            None => {
                let style = if is_cursor {
                    underlined_dim_bold_style
                } else {
                    dim_bold_style
                };
                (visible(expected), style)
            }
        };

        if expected == '\n' {
            // a marker keeps mistyped or caret newlines visible
            if session.outcome_at(idx) == Some(Outcome::Incorrect) || is_cursor {
                spans.push(Span::styled("·", style));
            }
            lines.push(Line::from(std::mem::take(&mut spans)));
            continue;
        }

        spans.push(Span::styled(symbol, style));
    }
    lines.push(Line::from(spans));
    lines
}

fn visible(c: char) -> String {
    match c {
        '\n' => String::new(),
        '\t' => "    ".to_owned(),
        c => c.to_string(),
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),    // chart
                Constraint::Length(1), // stats
                Constraint::Length(1), // save status
                Constraint::Length(3), // settings info
                Constraint::Length(1), // padding
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(area);

    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(session.wpm_series(), session.duration_secs);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(session.wpm_series())];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        );
    chart.render(chunks[0], buf);

    let stats = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {:.2} sd",
            session.wpm(),
            session.accuracy(),
            session.consistency()
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let status = match &app.save_status {
        Some(SaveStatus::Saved(receipt)) if receipt.is_new_high_score => Span::styled(
            "★ new high score!",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Some(SaveStatus::Saved(receipt)) => Span::styled(
            format!("score saved · best {} wpm", receipt.high_score),
            Style::default().fg(Color::Cyan).patch(italic_style),
        ),
        Some(SaveStatus::Failed(reason)) => Span::styled(
            format!("warning: could not save score ({})", reason),
            Style::default().fg(Color::Red).patch(italic_style),
        ),
        None => Span::styled(
            "score history unavailable",
            Style::default().fg(Color::Gray).patch(italic_style),
        ),
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let settings_text = format!(
        "Mode: {} | Time: {}s | Words: {}\n(m) mode  (d) duration  (h) history",
        app.settings.mode.as_str(),
        app.settings.duration_secs,
        app.settings.number_of_words,
    );
    let settings_widget = Paragraph::new(settings_text)
        .style(Style::default().fg(Color::Gray).patch(italic_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    settings_widget.render(chunks[3], buf);

    let legend = Paragraph::new(Span::styled(
        String::from(if Browser::is_available() {
            "(r)etry / (n)ew / (h)istory / (t)weet / (esc)ape"
        } else {
            "(r)etry / (n)ew / (h)istory / (esc)ape"
        }),
        italic_style,
    ));
    legend.render(chunks[5], buf);
}

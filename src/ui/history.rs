use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::score::ScoreRecord;
use crate::App;

/// Render the score history screen: recent sessions newest first,
/// with the all-time best in the title.
pub fn render_history(app: &App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // History table
            Constraint::Length(3), // Instructions
        ])
        .split(area);

    let title_text = match app.high_score {
        Some(best) => format!("Score History (best: {} wpm)", best),
        None => "Score History".to_string(),
    };
    let title = Paragraph::new(title_text)
        .block(Block::default().borders(Borders::ALL).title("keydash"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.history.is_empty() {
        let no_data = Paragraph::new("No scores yet.\nFinish a timed session to start your history!")
            .block(Block::default().borders(Borders::ALL).title("No Data"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[1]);
    } else {
        let header = Row::new(vec![
            Cell::from("When"),
            Cell::from("WPM"),
            Cell::from("Accuracy"),
            Cell::from("Mode"),
            Cell::from("Time"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let best = app.high_score.unwrap_or(0);
        let rows: Vec<Row> = app.history.iter().map(|r| history_row(r, best)).collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Length(20),
                Constraint::Length(6),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Recent Sessions ({})", app.history.len())),
        );

        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("(b)ack to results | (r)etry | (n)ew | (esc)ape")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

fn history_row(record: &ScoreRecord, best: u32) -> Row<'static> {
    let age = Local::now()
        .signed_duration_since(record.timestamp)
        .to_std()
        .unwrap_or_default();
    let when = HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past);

    let wpm_style = if record.wpm >= best && record.wpm > 0 {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    };

    Row::new(vec![
        Cell::from(when),
        Cell::from(record.wpm.to_string()).style(wpm_style),
        Cell::from(format!("{}%", record.accuracy)),
        Cell::from(record.mode.as_str()),
        Cell::from(format!("{}s", record.duration_secs)),
    ])
}

//! Transport bar widget - shows BPM, play state, position and session info

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::Screen;

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, screen: &Screen) {
    let block = Block::default().title(" polyrhythm ").borders(Borders::ALL);

    let clock = screen.ensemble.clock();
    let is_playing = clock.is_running();

    // Bar and beat from tick position, in the clock's meter
    let time_signature = clock.time_signature();
    let ticks = clock.position_ticks();
    let ticks_per_bar = time_signature.bar_ticks(clock.ppq());
    let ticks_per_beat = ticks_per_bar / time_signature.numerator.max(1) as f64;
    let current_bar = (ticks / ticks_per_bar).floor() as u64 + 1;
    let current_beat = ((ticks % ticks_per_bar) / ticks_per_beat).floor() as u64 + 1;

    let play_symbol = if is_playing { "▶" } else { "■" };
    let play_state_str = if is_playing { "Playing" } else { "Stopped" };

    let mode = match (screen.interactive, screen.sample_rate) {
        (true, _) => "Interactive".to_string(),
        (false, Some(rate)) => format!("{:.1}kHz", rate as f64 / 1000.0),
        (false, None) => "Silent".to_string(),
    };

    let mut spans = vec![
        Span::styled(
            format!(" BPM: {:.0}  ", clock.tempo()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if is_playing { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(
            format!(
                "{} | Bar {} | Beat {}  ",
                time_signature, current_bar, current_beat
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(
                "Rhythms: {}  x{}  ",
                screen.ensemble.len(),
                screen.ensemble.instance_count()
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{}  ", mode), Style::default().fg(Color::Magenta)),
    ];
    if screen.late_notes > 0 {
        spans.push(Span::styled(
            format!("late: {}  ", screen.late_notes),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(message) = screen.message {
        spans.push(Span::styled(message.to_string(), Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

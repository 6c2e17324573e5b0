//! Measure view - one row of beat markers per rhythm with a shared playhead

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use polyrhythm::rhythm::{beat_markers, Ensemble, MeasureCursor};
use polyrhythm::sequencing::{note_name, Subdivision};

/// How long a marker stays lit after its beat
const FLASH: Subdivision = Subdivision::note(8);

pub fn render_measures(frame: &mut Frame, area: Rect, ensemble: &Ensemble) {
    if area.height < 2 || area.width < 20 {
        return;
    }

    let label_width = 10u16;
    let row_width = area.width.saturating_sub(label_width + 2) as usize;
    let clock = ensemble.clock();

    let mut lines = Vec::new();
    let mut playhead = 0.0;

    for rhythm in ensemble.rhythms() {
        let rhythm = rhythm.borrow();
        let beats = rhythm.beat_count();
        let cursor = MeasureCursor::from_clock(clock, beats, FLASH);
        playhead = cursor.playhead;
        let color = Color::Rgb(rhythm.color().r, rhythm.color().g, rhythm.color().b);

        let mut spans = Vec::new();
        spans.push(Span::styled(
            format!("{:>2} {:<5}  ", beats, note_name(rhythm.note())),
            Style::default().fg(Color::White),
        ));

        let mut cells: Vec<char> = vec!['·'; row_width];
        for (beat, offset) in beat_markers(beats).into_iter().enumerate() {
            let at = (offset * row_width as f64) as usize;
            let lit = cursor.flashing && cursor.active_beat == Some(beat);
            if let Some(cell) = cells.get_mut(at) {
                *cell = if lit { '●' } else { '○' };
            }
        }
        spans.push(Span::styled(
            cells.into_iter().collect::<String>(),
            Style::default().fg(color),
        ));
        lines.push(Line::from(spans));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "  no session - press Space",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let at = (playhead * row_width as f64) as usize;
        let mut playhead_str = " ".repeat(label_width as usize);
        for i in 0..row_width {
            playhead_str.push(if i == at { '▲' } else { ' ' });
        }
        lines.push(Line::from(Span::styled(
            playhead_str,
            Style::default().fg(Color::Yellow),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

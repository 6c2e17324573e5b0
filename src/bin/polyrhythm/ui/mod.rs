//! TUI module for polyrhythm
//!
//! Draws the transport bar, then either the kaleidoscope or the measure rows.

mod kaleidoscope;
mod timeline;
mod transport;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polyrhythm::render::DrawnCircle;
use polyrhythm::rhythm::Ensemble;

use kaleidoscope::render_kaleidoscope;
use timeline::render_measures;
use transport::render_transport;

/// Which picture fills the main area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Kaleidoscope,
    Measures,
}

impl View {
    pub fn toggle(self) -> Self {
        match self {
            View::Kaleidoscope => View::Measures,
            View::Measures => View::Kaleidoscope,
        }
    }
}

/// Everything one frame shows
pub struct Screen<'a> {
    pub ensemble: &'a Ensemble,
    /// Circles of this frame, in scene units
    pub scene: &'a [DrawnCircle],
    /// Side of the square scene
    pub extent: f64,
    pub view: View,
    pub interactive: bool,
    /// None when running silent
    pub sample_rate: Option<u32>,
    pub late_notes: u64,
    pub message: Option<&'a str>,
}

pub fn render(frame: &mut Frame, screen: &Screen) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(6),    // Kaleidoscope or measures
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_transport(frame, chunks[0], screen);

    let title = match screen.view {
        View::Kaleidoscope => " Kaleidoscope ",
        View::Measures => " Measures ",
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);
    match screen.view {
        View::Kaleidoscope => render_kaleidoscope(frame, inner, screen.scene, screen.extent),
        View::Measures => render_measures(frame, inner, screen.ensemble),
    }

    let help = Paragraph::new(
        " [Space] New  [S] Stop  [V] View  [I] Interactive  [1-9] Play  [+/-] Tempo  [Q] Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}

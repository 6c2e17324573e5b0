//! Kaleidoscope widget - the frame's circles on a braille canvas

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::canvas::{Canvas, Circle},
    Frame,
};

use polyrhythm::render::{DrawnCircle, Rgb};

/// Concentric rings drawn per circle, at most
const MAX_RINGS: usize = 48;

pub fn render_kaleidoscope(frame: &mut Frame, area: Rect, circles: &[DrawnCircle], extent: f64) {
    if area.width < 4 || area.height < 2 {
        return;
    }

    // Braille cells are 2x4 dots; widen the x range so circles stay round
    let dots_wide = area.width as f64 * 2.0;
    let dots_high = area.height as f64 * 4.0;
    let half_width = extent / 2.0 * dots_wide / dots_high;
    let center = extent / 2.0;
    // Scene units per dot, the spacing that fills a disc without gaps
    let ring_step = extent / dots_high;

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([center - half_width, center + half_width])
        .y_bounds([0.0, extent])
        .paint(move |ctx| {
            for circle in circles {
                let color = terminal_color(circle.color);
                let rings = ((circle.radius / ring_step).ceil() as usize).clamp(1, MAX_RINGS);
                for ring in 0..rings {
                    let radius = circle.radius * (rings - ring) as f64 / rings as f64;
                    ctx.draw(&Circle {
                        x: circle.center.x,
                        y: circle.center.y,
                        radius,
                        color,
                    });
                }
            }
        });
    frame.render_widget(canvas, area);
}

fn terminal_color(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

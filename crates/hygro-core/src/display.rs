//! Display rendering for the readout and the startup sequence.
//!
//! Two screens only: a startup screen (small font status line plus one
//! progress dot per join poll) and the steady-state readout (large-font
//! temperature and humidity). No error detail is ever rendered; the
//! panel shows last-known-good readings or startup status, and failure
//! detail stays in the log.

use core::fmt::Write as _;

use embedded_graphics::{
    Drawable as EgDrawable,
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::Rgb565,
    prelude::*,
    text::{Alignment, Text},
};
use heapless::String;

use crate::reading::Reading;

/// Left margin for startup text, in pixels.
const STARTUP_MARGIN: i32 = 8;
/// Baseline of the startup status line.
const STARTUP_STATUS_Y: i32 = 24;
/// Baseline of the startup progress dots.
const STARTUP_DOTS_Y: i32 = 44;

/// What the pipeline needs from a display.
///
/// The concrete implementation below renders to any
/// `DrawTarget<Color = Rgb565>`; tests substitute a recording mock.
pub trait Presenter {
    type Error: core::fmt::Debug;

    /// Clear and render the steady-state readout for `reading`.
    /// Idempotent: redrawing the same reading yields the same frame.
    fn show_reading(&mut self, reading: &Reading) -> Result<(), Self::Error>;

    /// Clear and render a small-font startup status line.
    fn show_startup_status(&mut self, message: &str) -> Result<(), Self::Error>;

    /// Append one progress glyph below the status line, without
    /// clearing. Called once per join poll.
    fn append_startup_dot(&mut self) -> Result<(), Self::Error>;

    /// Render the terminal join-failure screen.
    fn show_join_failure(&mut self) -> Result<(), Self::Error>;
}

/// Temperature readout line, one decimal, Fahrenheit.
pub fn format_temperature(fahrenheit: f32) -> String<16> {
    let mut line: String<16> = String::new();
    // 16 chars always fits a formatted f32 with one decimal.
    let _ = write!(line, "{:.1} F", fahrenheit);
    line
}

/// Humidity readout line, one decimal, percent.
pub fn format_humidity(percent: f32) -> String<16> {
    let mut line: String<16> = String::new();
    let _ = write!(line, "{:.1} %", percent);
    line
}

/// Renders to an `embedded-graphics` draw target.
///
/// Holds no state beyond what is currently drawn (and the running dot
/// column during startup).
pub struct DisplayPresenter<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    display: D,
    size: Size,
    dots: u32,
}

impl<D> DisplayPresenter<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(display: D, size: Size) -> Self {
        Self {
            display,
            size,
            dots: 0,
        }
    }

    fn center_x(&self) -> i32 {
        (self.size.width / 2) as i32
    }
}

impl<D> Presenter for DisplayPresenter<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    fn show_reading(&mut self, reading: &Reading) -> Result<(), Self::Error> {
        self.display.clear(Rgb565::BLACK)?;
        self.dots = 0;

        let style = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
        let center_x = self.center_x();
        let third = (self.size.height / 3) as i32;

        if let Some(fahrenheit) = reading.temperature_fahrenheit() {
            EgDrawable::draw(
                &Text::with_alignment(
                    &format_temperature(fahrenheit),
                    Point::new(center_x, third),
                    style,
                    Alignment::Center,
                ),
                &mut self.display,
            )?;
        }
        if let Some(percent) = reading.relative_humidity_percent {
            EgDrawable::draw(
                &Text::with_alignment(
                    &format_humidity(percent),
                    Point::new(center_x, third * 2),
                    style,
                    Alignment::Center,
                ),
                &mut self.display,
            )?;
        }
        Ok(())
    }

    fn show_startup_status(&mut self, message: &str) -> Result<(), Self::Error> {
        self.display.clear(Rgb565::BLACK)?;
        self.dots = 0;

        EgDrawable::draw(
            &Text::new(
                message,
                Point::new(STARTUP_MARGIN, STARTUP_STATUS_Y),
                MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE),
            ),
            &mut self.display,
        )?;
        Ok(())
    }

    fn append_startup_dot(&mut self) -> Result<(), Self::Error> {
        let glyph_width = FONT_6X10.character_size.width as i32;
        let x = STARTUP_MARGIN + self.dots as i32 * glyph_width;
        // Wrap rather than draw off-panel on a very long join.
        if x + glyph_width > self.size.width as i32 {
            self.dots = 0;
            return self.append_startup_dot();
        }
        EgDrawable::draw(
            &Text::new(
                ".",
                Point::new(x, STARTUP_DOTS_Y),
                MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE),
            ),
            &mut self.display,
        )?;
        self.dots += 1;
        Ok(())
    }

    fn show_join_failure(&mut self) -> Result<(), Self::Error> {
        self.display.clear(Rgb565::BLACK)?;
        EgDrawable::draw(
            &Text::with_alignment(
                "Not connected",
                Point::new(self.center_x(), (self.size.height / 2) as i32),
                MonoTextStyle::new(&FONT_10X20, Rgb565::RED),
                Alignment::Center,
            ),
            &mut self.display,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readout_lines_use_one_decimal() {
        assert_eq!(format_temperature(70.7).as_str(), "70.7 F");
        assert_eq!(format_temperature(32.0).as_str(), "32.0 F");
        assert_eq!(format_temperature(-4.25).as_str(), "-4.2 F");
        assert_eq!(format_humidity(48.0).as_str(), "48.0 %");
        assert_eq!(format_humidity(100.0).as_str(), "100.0 %");
    }
}

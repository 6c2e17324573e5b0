use std::fmt;

use super::duration::Duration;

/// Time signature of the shared transport
///
/// Only the bar length matters for timing: it decides how long a `"1m"` or
/// `"1:0"` subdivision lasts. Note-value tokens like `"4n"` are independent of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSignature {
    /// Number of beats per bar
    pub numerator: u8,
    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub denominator: u8,
}

impl TimeSignature {
    pub const FOUR_FOUR: TimeSignature = TimeSignature::new(4, 4);
    pub const THREE_FOUR: TimeSignature = TimeSignature::new(3, 4);
    pub const SIX_EIGHT: TimeSignature = TimeSignature::new(6, 8);

    pub const fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// One bar as a fraction of a whole note
    pub const fn bar(&self) -> Duration {
        Duration {
            numerator: self.numerator as u32,
            denominator: self.denominator as u32,
        }
    }

    /// Length of one bar in quarter notes (4/4 = 4, 6/8 = 3)
    pub fn quarters_per_bar(&self) -> f64 {
        self.bar().quarters()
    }

    /// Length of one bar in fractional ticks
    pub fn bar_ticks(&self, ppq: u32) -> f64 {
        self.bar().to_ticks(ppq)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_four_bar() {
        let ts = TimeSignature::FOUR_FOUR;
        assert_eq!(ts.quarters_per_bar(), 4.0);
        assert_eq!(ts.bar_ticks(480), 1920.0);
    }

    #[test]
    fn test_compound_bar() {
        // 6/8 = six eighths = three quarters
        let ts = TimeSignature::SIX_EIGHT;
        assert_eq!(ts.quarters_per_bar(), 3.0);
        assert_eq!(ts.bar_ticks(480), 1440.0);
        assert_eq!(ts.to_string(), "6/8");
    }

    #[test]
    fn test_waltz_bar() {
        assert_eq!(TimeSignature::THREE_FOUR.bar_ticks(480), 1440.0);
    }
}

/// Musical note duration represented as a rational fraction of a whole note.
/// Tick conversion stays exact until the final division, so odd tuplets
/// like sevenths don't accumulate rounding across a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, 7 = seventh, etc.)
    pub denominator: u32,
}

impl Duration {
    pub const WHOLE: Duration = Duration::of(1);
    pub const HALF: Duration = Duration::of(2);
    pub const QUARTER: Duration = Duration::of(4);
    pub const EIGHTH: Duration = Duration::of(8);
    pub const SIXTEENTH: Duration = Duration::of(16);
    pub const THIRTY_SECOND: Duration = Duration::of(32);

    /// One `1/division` of a whole note, the `"Nn"` token.
    ///
    /// `Duration::of(5)` is a fifth of a whole note: five of them fill a 4/4 bar.
    pub const fn of(division: u32) -> Self {
        Duration {
            numerator: 1,
            denominator: division,
        }
    }

    /// Apply a dot: multiply duration by 3/2
    pub const fn dotted(self) -> Self {
        Duration {
            numerator: self.numerator.saturating_mul(3),
            denominator: self.denominator.saturating_mul(2),
        }
    }

    /// Three notes in the time of two
    pub const fn triplet(self) -> Self {
        Duration {
            numerator: self.numerator.saturating_mul(2),
            denominator: self.denominator.saturating_mul(3),
        }
    }

    /// Scale by a whole number of repetitions (`3 × 1/4` = `3/4`)
    pub const fn times(self, count: u32) -> Self {
        Duration {
            numerator: self.numerator.saturating_mul(count),
            denominator: self.denominator,
        }
        .reduce()
    }

    /// Reduce the fraction to lowest terms using GCD
    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        if gcd == 0 {
            return self;
        }
        Duration {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// True when the duration spans no time at all (or is malformed with a zero denominator)
    pub const fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    /// Length in quarter notes
    pub fn quarters(&self) -> f64 {
        (self.numerator as f64 * 4.0) / self.denominator as f64
    }

    /// Fractional ticks at the given resolution
    /// Formula: ticks = (numerator * 4 * ppq) / denominator
    pub fn to_ticks(&self, ppq: u32) -> f64 {
        (self.numerator as f64 * 4.0 * ppq as f64) / self.denominator as f64
    }
}

/// Greatest common divisor (Euclidean algorithm)
const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_durations_to_ticks() {
        let ppq = 480;
        assert_eq!(Duration::WHOLE.to_ticks(ppq), 1920.0);
        assert_eq!(Duration::QUARTER.to_ticks(ppq), 480.0);
        assert_eq!(Duration::THIRTY_SECOND.to_ticks(ppq), 60.0);
    }

    #[test]
    fn test_odd_divisions_keep_fractional_ticks() {
        let ppq = 480;
        // 7 sevenths fill exactly one whole note
        let seventh = Duration::of(7).to_ticks(ppq);
        assert!((seventh * 7.0 - 1920.0).abs() < 1e-9);
        assert!(seventh.fract() > 0.0);
    }

    #[test]
    fn test_dotted_and_triplet_quarters() {
        assert_eq!(Duration::QUARTER.dotted().quarters(), 1.5);
        let triplet = Duration::QUARTER.triplet().quarters();
        assert!((triplet - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_times_reduces() {
        let three_quarters = Duration::QUARTER.times(3);
        assert_eq!(three_quarters, Duration { numerator: 3, denominator: 4 });
        assert_eq!(Duration::EIGHTH.times(2), Duration::QUARTER);
    }

    #[test]
    fn test_zero_detection() {
        assert!(Duration { numerator: 0, denominator: 4 }.is_zero());
        assert!(Duration { numerator: 1, denominator: 0 }.is_zero());
        assert!(!Duration::HALF.is_zero());
    }

    #[test]
    fn test_const_evaluation() {
        const DOTTED_EIGHTH_TRIPLET: Duration = Duration::EIGHTH.dotted().triplet().reduce();
        assert_eq!(DOTTED_EIGHTH_TRIPLET, Duration::EIGHTH);
    }
}

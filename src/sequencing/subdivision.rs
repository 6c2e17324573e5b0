/*
Subdivision Tokens
==================

A subdivision names a span of musical time. It serves as the period of a
repeating schedule ("fire every 5n") and as a note length ("play for 32n").

Token grammar (whitespace around the token is ignored):

  Nn      1/N of a whole note           4n = quarter, 7n = seventh
  Nn.     dotted 1/N                    8n. = three sixteenths
  Nt      triplet 1/N                   8t  = a third of a quarter
  Nm      N whole measures              1m  = one bar of the time signature
  B:Q     bars and quarters             0:3 = three quarter notes
  B:Q:S   bars, quarters, sixteenths    0:1:2 = a quarter plus two sixteenths
  X       plain seconds                 0.5 = half a second

Note values don't depend on the time signature. Measure and bar tokens do. Seconds
are resolved to ticks at the tempo current when they are converted, so a
seconds-based schedule keeps its tick period if the tempo changes afterwards.
*/

use std::fmt;
use std::str::FromStr;

use super::duration::Duration;
use super::time_signature::TimeSignature;

/// A named span of musical time, resolved against a tempo and time signature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subdivision {
    /// A note value (`4n`, `8n.`, `8t`)
    Note(Duration),
    /// Whole measures (`1m`)
    Measures(u32),
    /// Bars:quarters:sixteenths transport notation (`0:3`)
    BarsBeats {
        bars: u32,
        quarters: u32,
        sixteenths: u32,
    },
    /// Absolute seconds (`0.5`)
    Seconds(f64),
}

impl Subdivision {
    /// `1/division` of a whole note, the period that fits `division` beats in a 4/4 bar
    pub const fn note(division: u32) -> Self {
        Subdivision::Note(Duration::of(division))
    }

    /// Length in quarter notes at the given tempo
    pub fn quarters(&self, time_signature: TimeSignature, bpm: f64) -> f64 {
        match *self {
            Subdivision::Note(duration) => duration.quarters(),
            Subdivision::Measures(count) => count as f64 * time_signature.quarters_per_bar(),
            Subdivision::BarsBeats {
                bars,
                quarters,
                sixteenths,
            } => {
                bars as f64 * time_signature.quarters_per_bar()
                    + quarters as f64
                    + sixteenths as f64 / 4.0
            }
            Subdivision::Seconds(seconds) => seconds * bpm / 60.0,
        }
    }

    /// Length in fractional ticks
    pub fn to_ticks(&self, time_signature: TimeSignature, ppq: u32, bpm: f64) -> f64 {
        self.quarters(time_signature, bpm) * ppq as f64
    }

    /// Length in seconds at the given tempo
    pub fn to_seconds(&self, time_signature: TimeSignature, bpm: f64) -> f64 {
        match *self {
            Subdivision::Seconds(seconds) => seconds,
            _ => self.quarters(time_signature, bpm) * 60.0 / bpm,
        }
    }

    /// Whether the subdivision spans a positive, finite amount of time
    pub fn is_positive(&self) -> bool {
        match *self {
            Subdivision::Note(duration) => !duration.is_zero(),
            Subdivision::Measures(count) => count > 0,
            Subdivision::BarsBeats {
                bars,
                quarters,
                sixteenths,
            } => bars > 0 || quarters > 0 || sixteenths > 0,
            Subdivision::Seconds(seconds) => seconds.is_finite() && seconds > 0.0,
        }
    }
}

/// Errors produced when parsing a subdivision token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubdivisionError {
    /// The token was empty or whitespace
    Empty,
    /// The token doesn't match any known form
    Malformed(String),
    /// The token parses but spans no time
    ZeroLength(String),
}

impl fmt::Display for SubdivisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubdivisionError::Empty => write!(f, "empty subdivision token"),
            SubdivisionError::Malformed(token) => {
                write!(f, "unrecognized subdivision token '{}'", token)
            }
            SubdivisionError::ZeroLength(token) => {
                write!(f, "subdivision '{}' has zero length", token)
            }
        }
    }
}

impl std::error::Error for SubdivisionError {}

impl FromStr for Subdivision {
    type Err = SubdivisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(SubdivisionError::Empty);
        }
        let malformed = || SubdivisionError::Malformed(token.to_string());
        let division = |digits: &str| digits.parse::<u32>().map_err(|_| malformed());

        let parsed = if token.contains(':') {
            let parts = token
                .split(':')
                .map(division)
                .collect::<Result<Vec<_>, _>>()?;
            match parts.as_slice() {
                &[bars, quarters] => Subdivision::BarsBeats {
                    bars,
                    quarters,
                    sixteenths: 0,
                },
                &[bars, quarters, sixteenths] => Subdivision::BarsBeats {
                    bars,
                    quarters,
                    sixteenths,
                },
                _ => return Err(malformed()),
            }
        } else if let Some(digits) = token.strip_suffix("n.") {
            Subdivision::Note(Duration::of(division(digits)?).dotted())
        } else if let Some(digits) = token.strip_suffix('n') {
            Subdivision::Note(Duration::of(division(digits)?))
        } else if let Some(digits) = token.strip_suffix('t') {
            Subdivision::Note(Duration::of(division(digits)?).triplet())
        } else if let Some(digits) = token.strip_suffix('m') {
            Subdivision::Measures(division(digits)?)
        } else {
            let seconds = token.parse::<f64>().map_err(|_| malformed())?;
            Subdivision::Seconds(seconds)
        };

        if parsed.is_positive() {
            Ok(parsed)
        } else {
            Err(SubdivisionError::ZeroLength(token.to_string()))
        }
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Subdivision::Note(duration) => {
                let d = duration.reduce();
                if d.numerator == 1 {
                    write!(f, "{}n", d.denominator)
                } else if d.numerator == 3 && d.denominator % 2 == 0 {
                    write!(f, "{}n.", d.denominator / 2)
                } else {
                    write!(f, "{}/{}", d.numerator, d.denominator)
                }
            }
            Subdivision::Measures(count) => write!(f, "{}m", count),
            Subdivision::BarsBeats {
                bars,
                quarters,
                sixteenths: 0,
            } => write!(f, "{}:{}", bars, quarters),
            Subdivision::BarsBeats {
                bars,
                quarters,
                sixteenths,
            } => write!(f, "{}:{}:{}", bars, quarters, sixteenths),
            Subdivision::Seconds(seconds) => write!(f, "{}", seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR_FOUR: TimeSignature = TimeSignature::FOUR_FOUR;

    fn parse(token: &str) -> Subdivision {
        token.parse().expect("token should parse")
    }

    #[test]
    fn test_note_values() {
        assert_eq!(parse("4n"), Subdivision::note(4));
        assert_eq!(parse(" 32n "), Subdivision::note(32));
        assert_eq!(parse("8n."), Subdivision::Note(Duration::EIGHTH.dotted()));
        assert_eq!(parse("8t"), Subdivision::Note(Duration::EIGHTH.triplet()));
    }

    #[test]
    fn test_quarter_note_lasts_one_beat() {
        // 60 bpm: one quarter note per second
        let seconds = parse("4n").to_seconds(FOUR_FOUR, 60.0);
        assert!((seconds - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_n_beats_fill_one_bar() {
        // The polyrhythm property: N repetitions of "Nn" span exactly one 4/4 bar
        let bar = parse("1m").to_seconds(FOUR_FOUR, 45.0);
        for n in 2..=7 {
            let beat = Subdivision::note(n).to_seconds(FOUR_FOUR, 45.0);
            assert!((beat * n as f64 - bar).abs() < 1e-9, "{}n", n);
        }
    }

    #[test]
    fn test_bars_beats_notation() {
        assert_eq!(
            parse("0:3"),
            Subdivision::BarsBeats {
                bars: 0,
                quarters: 3,
                sixteenths: 0,
            }
        );
        assert_eq!(parse("0:3").quarters(FOUR_FOUR, 120.0), 3.0);
        assert_eq!(parse("1:0:2").quarters(FOUR_FOUR, 120.0), 4.5);
        // Bars follow the time signature
        assert_eq!(parse("1:0").quarters(TimeSignature::THREE_FOUR, 120.0), 3.0);
    }

    #[test]
    fn test_seconds_token() {
        let sub = parse("0.5");
        assert_eq!(sub, Subdivision::Seconds(0.5));
        assert_eq!(sub.to_seconds(FOUR_FOUR, 200.0), 0.5);
        // At 120 bpm half a second is one quarter note
        assert!((sub.to_ticks(FOUR_FOUR, 480, 120.0) - 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_tokens() {
        assert_eq!("".parse::<Subdivision>(), Err(SubdivisionError::Empty));
        assert!(matches!(
            "xn".parse::<Subdivision>(),
            Err(SubdivisionError::Malformed(_))
        ));
        assert!(matches!(
            "1:2:3:4".parse::<Subdivision>(),
            Err(SubdivisionError::Malformed(_))
        ));
        assert!(matches!(
            "0n".parse::<Subdivision>(),
            Err(SubdivisionError::ZeroLength(_))
        ));
        assert!(matches!(
            "0:0".parse::<Subdivision>(),
            Err(SubdivisionError::ZeroLength(_))
        ));
        assert!(matches!(
            "-1".parse::<Subdivision>(),
            Err(SubdivisionError::ZeroLength(_))
        ));
    }

    #[test]
    fn test_display_matches_token() {
        for token in ["4n", "7n", "8n.", "2m", "0:3", "1:0:2", "0.5"] {
            assert_eq!(parse(token).to_string(), token);
        }
    }
}

/*
Note Names
==========

Rhythms are voiced from chords written as bare pitch classes ("A", "C", "E")
with the octave picked separately, so the two halves of a scientific pitch
name are kept apart here:

  PitchClass   C, C#, Db, ... B       (12 semitones, no octave)
  octave       -1 ..= 9
  MIDI note    12 * (octave + 1) + semitone

Middle C (C4) = MIDI note 60. A4 = 69 = 440 Hz.
Sharps and flats are spelled with '#' / 's' and 'b'; they alias the same
semitone (C# == Db).
*/

use std::fmt;
use std::str::FromStr;

/// One of the twelve pitch classes, stored as semitones above C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);
    pub const D: PitchClass = PitchClass(2);
    pub const E: PitchClass = PitchClass(4);
    pub const F: PitchClass = PitchClass(5);
    pub const G: PitchClass = PitchClass(7);
    pub const A: PitchClass = PitchClass(9);
    pub const B: PitchClass = PitchClass(11);

    /// Build from semitones above C (wraps modulo 12)
    pub const fn from_semitone(semitone: u8) -> Self {
        PitchClass(semitone % 12)
    }

    pub const fn semitone(&self) -> u8 {
        self.0
    }

    /// MIDI note number of this pitch class in the given octave
    pub fn in_octave(&self, octave: i8) -> Result<u8, NoteError> {
        let value = 12 * (octave as i32 + 1) + self.0 as i32;
        if (0..=127).contains(&value) {
            Ok(value as u8)
        } else {
            Err(NoteError::OutOfRange(value))
        }
    }
}

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SHARP_NAMES[self.0 as usize])
    }
}

impl FromStr for PitchClass {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, rest) = split_pitch_class(s.trim())?;
        if !rest.is_empty() {
            return Err(NoteError::Malformed(s.to_string()));
        }
        Ok(class)
    }
}

/// Errors from parsing note names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    /// Not a recognizable note name
    Malformed(String),
    /// Parsed, but outside MIDI 0..=127
    OutOfRange(i32),
}

impl fmt::Display for NoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteError::Malformed(name) => write!(f, "invalid note name '{}'", name),
            NoteError::OutOfRange(value) => {
                write!(f, "note {} is outside the MIDI range 0..=127", value)
            }
        }
    }
}

impl std::error::Error for NoteError {}

/// Split a leading pitch class (letter plus accidentals) from the remainder
fn split_pitch_class(name: &str) -> Result<(PitchClass, &str), NoteError> {
    let malformed = || NoteError::Malformed(name.to_string());
    let mut chars = name.char_indices();
    let (_, letter) = chars.next().ok_or_else(malformed)?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(malformed()),
    };

    let mut offset = 0i32;
    let mut rest_start = letter.len_utf8();
    for (idx, c) in chars {
        match c {
            '#' | 's' => offset += 1,
            'b' => offset -= 1,
            _ => {
                rest_start = idx;
                break;
            }
        }
        rest_start = idx + c.len_utf8();
    }

    let class = PitchClass::from_semitone((base + offset).rem_euclid(12) as u8);
    Ok((class, &name[rest_start..]))
}

/// Parse a scientific pitch name like `"A4"`, `"C#5"` or `"Bb3"` into a MIDI note
pub fn parse_note(name: &str) -> Result<u8, NoteError> {
    let trimmed = name.trim();
    let (class, octave) = split_pitch_class(trimmed)?;
    let octave: i8 = octave
        .parse()
        .map_err(|_| NoteError::Malformed(trimmed.to_string()))?;
    // B#4 is C5, Cb4 is B3: fix up wrap-around across the octave boundary
    let letter_octave_shift = match trimmed.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('B') if class.semitone() < 11 && trimmed.contains(['#', 's']) => 1,
        Some('C') if class.semitone() > 0 && trimmed[1..].contains('b') => -1,
        _ => 0,
    };
    class.in_octave(octave.saturating_add(letter_octave_shift))
}

/// Name a MIDI note with sharps (`60` -> `"C4"`)
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", SHARP_NAMES[(note % 12) as usize], octave)
}

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_60() {
        assert_eq!(parse_note("C4"), Ok(60));
        assert_eq!(PitchClass::C.in_octave(4), Ok(60));
    }

    #[test]
    fn a440_is_69() {
        assert_eq!(parse_note("A4"), Ok(69));
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn octaves_are_12_apart() {
        let a4 = PitchClass::A.in_octave(4).unwrap();
        let a6 = PitchClass::A.in_octave(6).unwrap();
        assert_eq!(a6 - a4, 24);
    }

    #[test]
    fn sharps_and_flats_are_equal() {
        assert_eq!(parse_note("C#4"), parse_note("Db4"));
        assert_eq!(parse_note("Fs4"), parse_note("Gb4"));
        assert_eq!("A#".parse::<PitchClass>(), "Bb".parse::<PitchClass>());
    }

    #[test]
    fn enharmonics_across_octave_boundary() {
        assert_eq!(parse_note("B#4"), parse_note("C5"));
        assert_eq!(parse_note("Cb4"), parse_note("B3"));
    }

    #[test]
    fn pitch_class_parsing() {
        assert_eq!("e".parse::<PitchClass>(), Ok(PitchClass::E));
        assert!("H".parse::<PitchClass>().is_err());
        assert!("C4".parse::<PitchClass>().is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(PitchClass::G.in_octave(9), Ok(127));
        assert_eq!(PitchClass::A.in_octave(9), Err(NoteError::OutOfRange(129)));
        assert!(parse_note("C").is_err());
    }

    #[test]
    fn names_round_trip() {
        for note in [21u8, 60, 61, 69, 108] {
            assert_eq!(parse_note(&note_name(note)), Ok(note));
        }
    }
}

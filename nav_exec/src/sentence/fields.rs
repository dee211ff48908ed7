//! Field splitting and typed field parsers.
//!
//! Nothing in here allocates, fields are borrowed slices of the input sentence.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::time::hms_to_seconds;

use super::{FixQuality, SentenceError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cursor over the comma separated fields of a sentence body.
///
/// The sentence ID is field 0.
pub(crate) struct Fields<'a> {
    rest: Option<&'a [u8]>,
    index: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Fields<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            rest: Some(body),
            index: 0,
        }
    }

    /// Index the next call to `next_field` will return.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The next field, or `None` once the body is exhausted.
    pub fn next_field(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;

        let field = match rest.iter().position(|b| *b == b',') {
            Some(i) => {
                self.rest = Some(&rest[i + 1..]);
                &rest[..i]
            }
            None => {
                self.rest = None;
                rest
            }
        };

        self.index += 1;
        Some(field)
    }

    /// The next field, which must be present and non-empty.
    pub fn required(&mut self) -> Result<&'a [u8], SentenceError> {
        let index = self.index;
        match self.next_field() {
            Some(f) if !f.is_empty() => Ok(f),
            _ => Err(SentenceError::FieldError(index)),
        }
    }

    /// The next field parsed with `parse`, where a missing or empty field is `None`.
    pub fn optional<T, F>(&mut self, parse: F) -> Result<Option<T>, SentenceError>
    where
        F: Fn(&[u8]) -> Option<T>,
    {
        let index = self.index;
        match self.next_field() {
            None => Ok(None),
            Some(f) if f.is_empty() => Ok(None),
            Some(f) => parse(f).map(Some).ok_or(SentenceError::FieldError(index)),
        }
    }

    /// The next field parsed with `parse`, which must be present and valid.
    pub fn parse_required<T, F>(&mut self, parse: F) -> Result<T, SentenceError>
    where
        F: Fn(&[u8]) -> Option<T>,
    {
        let index = self.index;
        parse(self.required()?).ok_or(SentenceError::FieldError(index))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a finite decimal number.
pub(crate) fn parse_f64(field: &[u8]) -> Option<f64> {
    let v: f64 = std::str::from_utf8(field).ok()?.parse().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Parse an unsigned integer which fits in a `u8`.
pub(crate) fn parse_u8(field: &[u8]) -> Option<u8> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// Parse a `hhmmss[.ss]` UTC time of day into seconds since midnight.
pub(crate) fn parse_time(field: &[u8]) -> Option<f64> {
    if field.len() < 6 || !field[..6].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let hours = two_digits(&field[0..2]);
    let minutes = two_digits(&field[2..4]);
    let seconds = parse_f64(&field[4..])?;

    if hours > 23 || minutes > 59 || !(0.0..61.0).contains(&seconds) {
        return None;
    }

    Some(hms_to_seconds(hours, minutes, seconds))
}

/// Parse a `[d]ddmm.mmmm` angle and its hemisphere letter into signed decimal degrees.
///
/// `positive` and `negative` are the hemisphere letters, for example `N` and `S`.
pub(crate) fn parse_angle(
    value: &[u8],
    hemisphere: &[u8],
    positive: u8,
    negative: u8,
    max_deg: f64,
) -> Option<f64> {
    let raw = parse_f64(value)?;
    if raw < 0.0 {
        return None;
    }

    let degrees = (raw / 100.0).floor();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return None;
    }

    let angle = degrees + minutes / 60.0;
    if angle > max_deg {
        return None;
    }

    match hemisphere {
        [h] if *h == positive => Some(angle),
        [h] if *h == negative => Some(-angle),
        _ => None,
    }
}

/// Parse a fix quality code.
pub(crate) fn parse_quality(field: &[u8]) -> Option<FixQuality> {
    match field {
        b"0" => Some(FixQuality::NoFix),
        b"1" => Some(FixQuality::GpsFix),
        b"2" => Some(FixQuality::Dgps),
        b"4" => Some(FixQuality::RtkFixed),
        b"5" => Some(FixQuality::RtkFloat),
        _ => None,
    }
}

fn two_digits(d: &[u8]) -> u32 {
    (d[0] - b'0') as u32 * 10 + (d[1] - b'0') as u32
}

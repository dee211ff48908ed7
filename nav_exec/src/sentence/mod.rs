//! # Positioning sentence parser
//!
//! Parses the `$PANDA` and `$PAOGI` sentences produced by the positioning receiver bridge into a
//! [`PositionFix`]. Both sentences share one layout, `PAOGI` carries a dual antenna heading while
//! `PANDA` carries a single antenna one:
//!
//! ```text
//! $PANDA,time,lat,N,lon,E,quality,sats,hdop,alt,age,speed_kn,heading,roll,pitch,yaw_rate*HH
//! ```
//!
//! The parser works on borrowed bytes and never allocates. A sentence is only decoded once its
//! checksum (XOR of every byte between `$` and `*`) has been verified, so a corrupt sentence can
//! never produce a partial fix.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod fields;
pub mod framer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::fields::{parse_angle, parse_f64, parse_quality, parse_time, parse_u8, Fields};

pub use self::framer::SentenceFramer;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Metres per second in one knot.
pub const MS_PER_KNOT: f64 = 1852.0 / 3600.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position fix decoded from a sentence.
///
/// `easting_m` and `northing_m` are zero when produced by the parser, they are filled in by the
/// pose store's local plane projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// UTC time of day in seconds since midnight.
    pub time_of_day_s: f64,

    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,

    pub easting_m: f64,
    pub northing_m: f64,

    /// Heading clockwise from true north.
    pub heading_deg: f64,

    /// Speed over ground.
    pub speed_ms: f64,

    pub quality: FixQuality,
    pub num_satellites: u8,
    pub hdop: f64,

    /// Age of the differential corrections, `None` when the receiver has none.
    pub correction_age_s: Option<f64>,

    pub imu_roll_deg: Option<f64>,
    pub imu_pitch_deg: Option<f64>,
    pub imu_yaw_rate_degs: Option<f64>,
}

/// Counters of parse outcomes, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub num_fixes: u64,
    pub num_unsupported: u64,
    pub num_checksum_errors: u64,
    pub num_field_errors: u64,
    pub num_framing_errors: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Quality of a position fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixQuality {
    NoFix,
    GpsFix,
    Dgps,
    RtkFloat,
    RtkFixed,
}

/// Successfully parsed sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sentence<'a> {
    /// A position fix.
    Fix(PositionFix),

    /// A well formed sentence with a valid checksum but an ID this parser does not decode.
    Unsupported { id: &'a [u8] },
}

/// Reasons a sentence could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SentenceError {
    #[error("No '$' start character found")]
    NoStart,

    #[error("No '*' checksum delimiter followed by two characters found")]
    NoChecksum,

    #[error("The checksum characters are not hexadecimal digits")]
    InvalidChecksumDigits,

    #[error("Unexpected data after the checksum")]
    TrailingData,

    #[error("Checksum mismatch, sentence gives {expected:02X} but computed {computed:02X}")]
    ChecksumError { expected: u8, computed: u8 },

    #[error("Field {0} is missing or invalid")]
    FieldError(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FixQuality {
    /// Human readable name of the quality.
    pub fn as_str(&self) -> &'static str {
        match self {
            FixQuality::NoFix => "No Fix",
            FixQuality::GpsFix => "GPS Fix",
            FixQuality::Dgps => "DGPS",
            FixQuality::RtkFloat => "RTK Float",
            FixQuality::RtkFixed => "RTK Fixed",
        }
    }
}

impl PositionFix {
    /// Returns `true` if the fix has a position solution.
    pub fn has_valid_fix(&self) -> bool {
        self.quality != FixQuality::NoFix
    }

    pub fn has_rtk_fix(&self) -> bool {
        self.quality == FixQuality::RtkFixed
    }
}

impl ParseStats {
    /// Count the outcome of one parse.
    pub fn record(&mut self, result: &Result<Sentence, SentenceError>) {
        match result {
            Ok(Sentence::Fix(_)) => self.num_fixes += 1,
            Ok(Sentence::Unsupported { .. }) => self.num_unsupported += 1,
            Err(SentenceError::ChecksumError { .. }) => self.num_checksum_errors += 1,
            Err(SentenceError::FieldError(_)) => self.num_field_errors += 1,
            Err(_) => self.num_framing_errors += 1,
        }
    }

    /// Total number of rejected sentences.
    pub fn num_errors(&self) -> u64 {
        self.num_checksum_errors + self.num_field_errors + self.num_framing_errors
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse one sentence.
///
/// Leading bytes before the `$` and a trailing `\r\n` are ignored.
pub fn parse(buf: &[u8]) -> Result<Sentence<'_>, SentenceError> {
    let body = checked_body(buf)?;

    let mut fields = Fields::new(body);
    let id = fields.next_field().unwrap_or(&[]);

    match id {
        b"PANDA" | b"PAOGI" => parse_fix(&mut fields).map(Sentence::Fix),
        _ => Ok(Sentence::Unsupported { id }),
    }
}

/// XOR checksum of a sentence body.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Verify the framing and checksum of a sentence, returning the body between `$` and `*`.
fn checked_body(buf: &[u8]) -> Result<&[u8], SentenceError> {
    let start = buf
        .iter()
        .position(|b| *b == b'$')
        .ok_or(SentenceError::NoStart)?;

    let after_start = &buf[start + 1..];

    let star = after_start
        .iter()
        .position(|b| *b == b'*')
        .ok_or(SentenceError::NoChecksum)?;

    let body = &after_start[..star];
    let tail = &after_start[star + 1..];

    if tail.len() < 2 {
        return Err(SentenceError::NoChecksum);
    }

    if !tail[2..].iter().all(|b| *b == b'\r' || *b == b'\n') {
        return Err(SentenceError::TrailingData);
    }

    let expected = match (hex_value(tail[0]), hex_value(tail[1])) {
        (Some(hi), Some(lo)) => (hi << 4) | lo,
        _ => return Err(SentenceError::InvalidChecksumDigits),
    };

    let computed = checksum(body);

    if expected != computed {
        return Err(SentenceError::ChecksumError { expected, computed });
    }

    Ok(body)
}

/// Decode the fields of a `PANDA`/`PAOGI` sentence after the ID.
fn parse_fix(fields: &mut Fields) -> Result<PositionFix, SentenceError> {
    let time_of_day_s = fields.parse_required(parse_time)?;

    let lat_index = fields.index();
    let lat = fields.required()?;
    let lat_hemi = fields.required()?;
    let latitude_deg = parse_angle(lat, lat_hemi, b'N', b'S', 90.0)
        .ok_or(SentenceError::FieldError(lat_index))?;

    let lon_index = fields.index();
    let lon = fields.required()?;
    let lon_hemi = fields.required()?;
    let longitude_deg = parse_angle(lon, lon_hemi, b'E', b'W', 180.0)
        .ok_or(SentenceError::FieldError(lon_index))?;

    let quality = fields.parse_required(parse_quality)?;
    let num_satellites = fields.parse_required(parse_u8)?;
    let hdop = fields.parse_required(parse_f64)?;
    let altitude_m = fields.parse_required(parse_f64)?;
    let correction_age_s = fields.optional(parse_f64)?;
    let speed_kn = fields.parse_required(parse_f64)?;
    let heading_deg = fields.parse_required(parse_f64)?;

    let imu_roll_deg = fields.optional(parse_f64)?;
    let imu_pitch_deg = fields.optional(parse_f64)?;
    let imu_yaw_rate_degs = fields.optional(parse_f64)?;

    Ok(PositionFix {
        time_of_day_s,
        latitude_deg,
        longitude_deg,
        altitude_m,
        easting_m: 0.0,
        northing_m: 0.0,
        heading_deg,
        speed_ms: speed_kn * MS_PER_KNOT,
        quality,
        num_satellites,
        hdop,
        correction_age_s,
        imu_roll_deg,
        imu_pitch_deg,
        imu_yaw_rate_degs,
    })
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const PANDA_BODY: &str =
        "PANDA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,1.2,5.5,270.5,1.2,-0.5,0.1";

    /// Frame a body with `$`, `*` and its checksum.
    pub(crate) fn frame(body: &str) -> String {
        format!("${}*{:02X}", body, checksum(body.as_bytes()))
    }

    #[test]
    fn test_parse_panda() {
        let s = frame(PANDA_BODY);
        let fix = match parse(s.as_bytes()) {
            Ok(Sentence::Fix(f)) => f,
            r => panic!("Expected a fix, got {:?}", r),
        };

        assert_eq!(fix.quality, FixQuality::RtkFixed);
        assert!(fix.has_rtk_fix());
        assert!(fix.has_valid_fix());
        assert_eq!(fix.time_of_day_s, 45319.0);
        assert!((fix.latitude_deg - 48.1173).abs() < 1e-9);
        assert!((fix.longitude_deg - (11.0 + 31.0 / 60.0)).abs() < 1e-9);
        assert_eq!(fix.num_satellites, 8);
        assert_eq!(fix.hdop, 0.9);
        assert_eq!(fix.altitude_m, 545.4);
        assert_eq!(fix.correction_age_s, Some(1.2));
        assert!((fix.speed_ms - 5.5 * 1852.0 / 3600.0).abs() < 1e-12);
        assert_eq!(fix.heading_deg, 270.5);
        assert_eq!(fix.imu_roll_deg, Some(1.2));
        assert_eq!(fix.imu_pitch_deg, Some(-0.5));
        assert_eq!(fix.imu_yaw_rate_degs, Some(0.1));
    }

    #[test]
    fn test_checksum_rejected() {
        let s = frame(PANDA_BODY);
        let good = checksum(PANDA_BODY.as_bytes());
        let bad = format!("${}*{:02X}", PANDA_BODY, good ^ 0x01);

        assert_eq!(
            parse(bad.as_bytes()),
            Err(SentenceError::ChecksumError { expected: good ^ 0x01, computed: good })
        );

        // A corrupted body byte is caught too
        let corrupt = s.replacen("545.4", "545.5", 1);
        assert!(matches!(
            parse(corrupt.as_bytes()),
            Err(SentenceError::ChecksumError { .. })
        ));
    }

    #[test]
    fn test_framing() {
        let s = frame(PANDA_BODY);

        // Lower case hex and line endings are accepted
        let lower = format!("${}*{:02x}\r\n", PANDA_BODY, checksum(PANDA_BODY.as_bytes()));
        assert!(matches!(parse(lower.as_bytes()), Ok(Sentence::Fix(_))));

        // Leading noise before the start character is skipped
        let noisy = format!("\0\0{}", s);
        assert!(matches!(parse(noisy.as_bytes()), Ok(Sentence::Fix(_))));

        assert_eq!(parse(b"PANDA,1,2*00"), Err(SentenceError::NoStart));
        assert_eq!(parse(b"$PANDA,1,2"), Err(SentenceError::NoChecksum));
        assert_eq!(parse(b"$PANDA,1,2*4"), Err(SentenceError::NoChecksum));
        assert_eq!(parse(b"$PANDA,1,2*ZZ"), Err(SentenceError::InvalidChecksumDigits));
        assert_eq!(
            parse(format!("{}xx", s).as_bytes()),
            Err(SentenceError::TrailingData)
        );
    }

    #[test]
    fn test_unsupported() {
        let s = frame("GPGGA,123519,4807.038,N");
        assert_eq!(parse(s.as_bytes()), Ok(Sentence::Unsupported { id: b"GPGGA" }));

        // PAOGI shares the PANDA layout
        let s = frame(&PANDA_BODY.replacen("PANDA", "PAOGI", 1));
        assert!(matches!(parse(s.as_bytes()), Ok(Sentence::Fix(_))));
    }

    #[test]
    fn test_field_errors() {
        // Unknown quality code
        let s = frame(&PANDA_BODY.replacen(",E,4,", ",E,3,", 1));
        assert_eq!(parse(s.as_bytes()), Err(SentenceError::FieldError(6)));

        // Bad hemisphere is reported against the latitude
        let s = frame(&PANDA_BODY.replacen(",N,", ",X,", 1));
        assert_eq!(parse(s.as_bytes()), Err(SentenceError::FieldError(2)));

        // Missing heading
        let s = frame(&PANDA_BODY.replacen(",270.5,", ",,", 1));
        assert_eq!(parse(s.as_bytes()), Err(SentenceError::FieldError(12)));

        // Truncated sentence
        let s = frame("PANDA,123519,4807.038,N");
        assert_eq!(parse(s.as_bytes()), Err(SentenceError::FieldError(4)));
    }

    #[test]
    fn test_optional_imu_fields() {
        let s = frame("PANDA,123519,4807.038,N,01131.000,E,1,05,1.5,545.4,,5.5,270.5,,,");
        let fix = match parse(s.as_bytes()) {
            Ok(Sentence::Fix(f)) => f,
            r => panic!("Expected a fix, got {:?}", r),
        };

        assert_eq!(fix.quality, FixQuality::GpsFix);
        assert_eq!(fix.correction_age_s, None);
        assert_eq!(fix.imu_roll_deg, None);
        assert_eq!(fix.imu_pitch_deg, None);
        assert_eq!(fix.imu_yaw_rate_degs, None);

        // Fields may also be left off entirely
        let s = frame("PANDA,123519,4807.038,N,01131.000,E,1,05,1.5,545.4,0.0,5.5,270.5");
        assert!(matches!(parse(s.as_bytes()), Ok(Sentence::Fix(_))));
    }

    #[test]
    fn test_parse_stats() {
        let mut stats = ParseStats::default();
        let s = frame(PANDA_BODY);

        stats.record(&parse(s.as_bytes()));
        stats.record(&parse(b"$PANDA*00"));
        stats.record(&parse(b"garbage"));
        stats.record(&parse(frame("GPVTG").as_bytes()));

        assert_eq!(stats.num_fixes, 1);
        assert_eq!(stats.num_checksum_errors, 1);
        assert_eq!(stats.num_framing_errors, 1);
        assert_eq!(stats.num_unsupported, 1);
        assert_eq!(stats.num_errors(), 2);
    }
}

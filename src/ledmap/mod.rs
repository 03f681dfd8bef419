//! LED map extraction
//!
//! Converts WS2812 footprint positions from a KiCad PCB file into the binary
//! lookup table the firmware loads: consecutive little-endian `f32` pairs
//! `(x, y)`, ordered by the numeric suffix of the `D<n>` reference designator.
//! Coordinates are centered on the dome origin and Y is flipped (KiCad's Y axis
//! points down, the map's points up).

use regex::Regex;
use thiserror::Error;

/// Dome origin in KiCad coordinates
pub const DEFAULT_CENTER: Center = Center {
    x: 99.937,
    y: 100.001,
};

/// LED count of the reference board
pub const EXPECTED_LEDS: usize = 160;

/// Maximum per-axis deviation accepted by [`verify`]
pub const VERIFY_TOLERANCE: f64 = 0.002;

/// Bytes per LED record (two `f32`)
pub const RECORD_SIZE: usize = 8;

const FOOTPRINT_PATTERN: &str = r#"(?s)\(footprint\s+"[^"]*WS2812[^"]*"\s*(.*?)\n\s*\)\s*\n"#;
const AT_PATTERN: &str = r"\(at\s+([\d.\-]+)\s+([\d.\-]+)";
const REFERENCE_PATTERN: &str = r#"\(property\s+"Reference"\s+"D(\d+)""#;

#[derive(Debug, Error)]
pub enum LedMapError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid coordinate '{value}' for D{number}")]
    Coordinate { number: u32, value: String },

    #[error("invalid reference designator D{0}")]
    Reference(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub x: f64,
    pub y: f64,
}

/// One LED footprint in KiCad board coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct LedFootprint {
    /// Numeric suffix of the reference designator (`D12` -> 12)
    pub number: u32,
    pub x: f64,
    pub y: f64,
}

impl LedFootprint {
    /// Position in map coordinates (centered, Y up)
    pub fn to_map(&self, center: Center) -> (f64, f64) {
        (self.x - center.x, -(self.y - center.y))
    }
}

/// Extract WS2812 footprints from PCB text, sorted by designator number.
///
/// Footprints lacking a position or a `D<n>` reference are skipped.
pub fn extract_leds(pcb: &str) -> Result<Vec<LedFootprint>, LedMapError> {
    let footprint_re = Regex::new(FOOTPRINT_PATTERN)?;
    let at_re = Regex::new(AT_PATTERN)?;
    let reference_re = Regex::new(REFERENCE_PATTERN)?;

    let mut leds = Vec::new();
    for block in footprint_re.captures_iter(pcb) {
        let body = block.get(1).map_or("", |m| m.as_str());
        let (Some(at), Some(reference)) = (at_re.captures(body), reference_re.captures(body))
        else {
            continue;
        };

        let number: u32 = reference[1]
            .parse()
            .map_err(|_| LedMapError::Reference(reference[1].to_string()))?;
        let parse = |value: &str| {
            value.parse::<f64>().map_err(|_| LedMapError::Coordinate {
                number,
                value: value.to_string(),
            })
        };
        leds.push(LedFootprint {
            number,
            x: parse(&at[1])?,
            y: parse(&at[2])?,
        });
    }

    leds.sort_by_key(|led| led.number);
    Ok(leds)
}

/// Encode footprints as the firmware's binary table
pub fn encode(leds: &[LedFootprint], center: Center) -> Vec<u8> {
    let mut out = Vec::with_capacity(leds.len() * RECORD_SIZE);
    for led in leds {
        let (x, y) = led.to_map(center);
        #[allow(clippy::cast_possible_truncation)]
        {
            out.extend_from_slice(&(x as f32).to_le_bytes());
            out.extend_from_slice(&(y as f32).to_le_bytes());
        }
    }
    out
}

/// A record deviating from the expected position by more than the tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// Record index in the binary table
    pub index: usize,
    /// Designator number of the footprint expected at `index`
    pub number: u32,
    pub error: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub max_error: f64,
    pub mismatches: Vec<Mismatch>,
    /// Records expected but missing from the end of the table
    pub missing: usize,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty() && self.missing == 0
    }
}

/// Compare an existing binary table against the footprints
pub fn verify(leds: &[LedFootprint], center: Center, table: &[u8]) -> VerifyReport {
    let mut report = VerifyReport::default();
    let mut records = table.chunks_exact(RECORD_SIZE);

    for (index, led) in leds.iter().enumerate() {
        let Some(record) = records.next() else {
            report.missing = leds.len() - index;
            break;
        };
        let (bx, by) = decode_record(record);
        let (x, y) = led.to_map(center);
        let error = (x - bx).abs().max((y - by).abs());

        report.max_error = report.max_error.max(error);
        if error > VERIFY_TOLERANCE {
            report.mismatches.push(Mismatch {
                index,
                number: led.number,
                error,
            });
        }
    }
    report
}

fn decode_record(record: &[u8]) -> (f64, f64) {
    let mut x = [0u8; 4];
    let mut y = [0u8; 4];
    x.copy_from_slice(&record[..4]);
    y.copy_from_slice(&record[4..RECORD_SIZE]);
    (
        f64::from(f32::from_le_bytes(x)),
        f64::from(f32::from_le_bytes(y)),
    )
}

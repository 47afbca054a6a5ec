//! Sample wire formats.
//!
//! ```text
//! JSON: {"id":1234,"accelerometer":{"x":..,"y":..,"z":..},"gyroscope":{"x":..,"y":..,"z":..}}
//! CSV:  ax,ay,az,gx,gy,gz          (two decimals, no line terminator)
//! ```

use core::fmt::Write;

use heapless::String;

use crate::config::ENCODED_CAPACITY;
use crate::error::Error;
use crate::sample::{Sample, Vector3};

/// Encoder output sized for the largest sample either format produces.
pub type Encoded = String<ENCODED_CAPACITY>;

/// Text encoding used for each sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadFormat {
    Json,
    Csv,
}

/// Encode `sample` in the given format.
pub fn encode(sample: &Sample, format: PayloadFormat) -> Result<Encoded, Error> {
    match format {
        PayloadFormat::Json => encode_json(sample),
        PayloadFormat::Csv => encode_csv(sample),
    }
}

/// Serialize as a JSON object with nested `accelerometer`/`gyroscope`.
pub fn encode_json<const N: usize>(sample: &Sample) -> Result<String<N>, Error> {
    serde_json_core::to_string::<_, N>(sample).map_err(Error::from)
}

/// Serialize as six comma-separated values. The timestamp is not sent.
pub fn encode_csv<const N: usize>(sample: &Sample) -> Result<String<N>, Error> {
    let mut out = String::new();
    for (i, value) in sample.values().iter().enumerate() {
        if i > 0 {
            out.push(',').map_err(|_| Error::Encode)?;
        }
        write!(out, "{:.2}", value)?;
    }
    Ok(out)
}

/// Parse a complete JSON sample. Trailing bytes after the object are rejected.
pub fn decode_json(text: &str) -> Option<Sample> {
    match serde_json_core::from_str::<Sample>(text) {
        Ok((sample, used)) if text[used..].trim().is_empty() => Some(sample),
        _ => None,
    }
}

/// Parse a CSV line into (acceleration, angular velocity).
pub fn decode_csv(text: &str) -> Option<(Vector3, Vector3)> {
    let mut values = [0f32; 6];
    let mut fields = text.trim().split(',');
    for slot in values.iter_mut() {
        *slot = fields.next()?.trim().parse().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }
    let [ax, ay, az, gx, gy, gz] = values;
    Some((Vector3::new(ax, ay, az), Vector3::new(gx, gy, gz)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample::new(
            1234,
            Vector3::new(0.5, -1.0, 0.25),
            Vector3::new(12.5, 0.0, -3.75),
        )
    }

    #[test]
    fn json_layout_matches_wire_names() {
        let json = encode_json::<192>(&sample()).unwrap();
        assert!(json.starts_with("{\"id\":1234,\"accelerometer\":{\"x\":"));
        assert!(json.contains("\"gyroscope\":{\"x\":"));
        assert!(json.ends_with("}}"));
    }

    #[test]
    fn json_decodes_back_to_same_sample() {
        let json = encode_json::<192>(&sample()).unwrap();
        assert_eq!(decode_json(&json), Some(sample()));
    }

    #[test]
    fn json_too_small_buffer_is_encode_error() {
        assert_eq!(encode_json::<16>(&sample()), Err(Error::Encode));
    }

    #[test]
    fn decode_json_rejects_truncated_object() {
        let json = encode_json::<192>(&sample()).unwrap();
        assert_eq!(decode_json(&json[..20]), None);
    }

    #[test]
    fn decode_json_rejects_trailing_garbage() {
        let mut json = encode_json::<192>(&sample()).unwrap();
        json.push_str("xx").unwrap();
        assert_eq!(decode_json(&json), None);
    }

    #[test]
    fn csv_is_six_values_two_decimals() {
        let csv = encode_csv::<64>(&sample()).unwrap();
        assert_eq!(csv.as_str(), "0.50,-1.00,0.25,12.50,0.00,-3.75");
    }

    #[test]
    fn csv_too_small_buffer_is_encode_error() {
        assert_eq!(encode_csv::<8>(&sample()), Err(Error::Encode));
    }

    #[test]
    fn csv_decodes_vectors() {
        let (a, g) = decode_csv("0.50,-1.00,0.25,12.50,0.00,-3.75").unwrap();
        assert_eq!(a, Vector3::new(0.5, -1.0, 0.25));
        assert_eq!(g, Vector3::new(12.5, 0.0, -3.75));
    }

    #[test]
    fn csv_decode_rejects_wrong_field_count() {
        assert!(decode_csv("1,2,3,4,5").is_none());
        assert!(decode_csv("1,2,3,4,5,6,7").is_none());
        assert!(decode_csv("").is_none());
    }

    #[test]
    fn csv_decode_rejects_non_numbers() {
        assert!(decode_csv("1,2,x,4,5,6").is_none());
    }

    #[test]
    fn encode_dispatches_on_format() {
        let csv = encode(&sample(), PayloadFormat::Csv).unwrap();
        assert!(!csv.starts_with('{'));
        let json = encode(&sample(), PayloadFormat::Json).unwrap();
        assert!(json.starts_with('{'));
    }
}

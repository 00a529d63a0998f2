use crate::error::CodecError;

pub const DEFAULT_PRECISION: u32 = 5;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: u64 = 0x1f;
const CONTINUATION: u64 = 0x20;
const ASCII_OFFSET: u8 = 63;
const MAX_CHAR: u8 = 126;

/// Encodes `(lat, lng)` pairs as a delta, zig-zag, 5-bit varint string.
pub fn encode(points: &[(f64, f64)], precision: u32) -> String {
    let factor = scale_factor(precision);
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for &(lat, lng) in points {
        let lat = (lat * factor).round() as i64;
        let lng = (lng * factor).round() as i64;
        encode_value(lat.wrapping_sub(prev_lat), &mut out);
        encode_value(lng.wrapping_sub(prev_lng), &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

pub fn decode(text: &str, precision: u32) -> Result<Vec<(f64, f64)>, CodecError> {
    let factor = scale_factor(precision);
    let mut bytes = text.bytes().enumerate().peekable();
    let mut points = Vec::new();
    let mut lat = 0i64;
    let mut lng = 0i64;

    while bytes.peek().is_some() {
        lat = accumulate(lat, decode_value(&mut bytes)?)?;
        if bytes.peek().is_none() {
            return Err(CodecError::MalformedPolyline(
                "latitude without a matching longitude".to_string(),
            ));
        }
        lng = accumulate(lng, decode_value(&mut bytes)?)?;
        points.push((lat as f64 / factor, lng as f64 / factor));
    }

    Ok(points)
}

pub fn encode_default(points: &[(f64, f64)]) -> String {
    encode(points, DEFAULT_PRECISION)
}

pub fn decode_default(text: &str) -> Result<Vec<(f64, f64)>, CodecError> {
    decode(text, DEFAULT_PRECISION)
}

fn accumulate(coordinate: i64, delta: i64) -> Result<i64, CodecError> {
    coordinate
        .checked_add(delta)
        .ok_or_else(|| CodecError::MalformedPolyline("coordinate overflows 64 bits".to_string()))
}

fn scale_factor(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = ((delta << 1) ^ (delta >> 63)) as u64;
    while value >= CONTINUATION {
        let chunk = (CONTINUATION | (value & CHUNK_MASK)) as u8;
        out.push((chunk + ASCII_OFFSET) as char);
        value >>= CHUNK_BITS;
    }
    out.push((value as u8 + ASCII_OFFSET) as char);
}

fn decode_value<I>(bytes: &mut I) -> Result<i64, CodecError>
where
    I: Iterator<Item = (usize, u8)>,
{
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let (pos, byte) = bytes.next().ok_or_else(|| {
            CodecError::MalformedPolyline("input ends in the middle of a value".to_string())
        })?;
        if !(ASCII_OFFSET..=MAX_CHAR).contains(&byte) {
            return Err(CodecError::MalformedPolyline(format!(
                "invalid character {:?} at position {}",
                byte as char, pos
            )));
        }
        if shift >= u64::BITS {
            return Err(CodecError::MalformedPolyline(format!(
                "value starting before position {} overflows 64 bits",
                pos
            )));
        }

        let chunk = (byte - ASCII_OFFSET) as u64;
        // Only the low 4 bits of the 13th chunk fit in a u64.
        if shift == 60 && (chunk & CHUNK_MASK) >> 4 != 0 {
            return Err(CodecError::MalformedPolyline(format!(
                "value ending at position {} overflows 64 bits",
                pos
            )));
        }
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    Ok(((result >> 1) as i64) ^ -((result & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reference_route() {
        let points = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(encode_default(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn decodes_reference_route() {
        let points = decode_default("_p~iF~ps|U_ulLnnqC_mqNvxq`@").expect("decode");
        assert_eq!(points, vec![(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)]);
    }

    #[test]
    fn five_decimal_points_survive_exactly() {
        let points = vec![
            (52.52001, 13.40495),
            (52.52013, 13.40512),
            (-33.86882, 151.20929),
            (0.0, 0.0),
            (-0.00001, 179.99999),
        ];
        assert_eq!(decode_default(&encode_default(&points)).expect("decode"), points);
    }

    #[test]
    fn quantization_error_is_bounded() {
        let points = vec![(45.123456789, -122.987654321), (45.1234, -122.9876)];
        for precision in [5, 6] {
            let decoded = decode(&encode(&points, precision), precision).expect("decode");
            let tolerance = 0.5 * 10f64.powi(-(precision as i32)) + 1e-12;
            for (original, restored) in points.iter().zip(&decoded) {
                assert!((original.0 - restored.0).abs() <= tolerance);
                assert!((original.1 - restored.1).abs() <= tolerance);
            }
        }
    }

    #[test]
    fn empty_input_round_trips() {
        assert_eq!(encode_default(&[]), "");
        assert!(decode_default("").expect("decode").is_empty());
    }

    #[test]
    fn truncated_value_is_rejected() {
        // "_p~iF" is a complete latitude; drop its final chunk.
        let err = decode_default("_p~i").unwrap_err();
        assert!(matches!(err, CodecError::MalformedPolyline(_)));
    }

    #[test]
    fn missing_longitude_is_rejected() {
        assert!(matches!(
            decode_default("_p~iF"),
            Err(CodecError::MalformedPolyline(_))
        ));
    }

    #[test]
    fn value_wider_than_64_bits_is_rejected() {
        let wide = format!("{0}?{0}?", "~".repeat(12) + "^");
        assert!(matches!(
            decode_default(&wide),
            Err(CodecError::MalformedPolyline(_))
        ));
    }

    #[test]
    fn accumulated_coordinate_overflow_is_rejected() {
        // Decodes to a delta of i64::MAX; two of them overflow the latitude.
        let max_delta = "}".to_string() + &"~".repeat(11) + "N";
        let text = format!("{0}?{0}?", max_delta);
        assert!(matches!(
            decode_default(&text),
            Err(CodecError::MalformedPolyline(_))
        ));
        assert_eq!(decode_default(&format!("{}?", max_delta)).map(|p| p.len()), Ok(1));
    }

    #[test]
    fn encoding_extreme_values_does_not_panic() {
        let encoded = encode_default(&[(1e300, 1.0), (-1e300, 1.0), (f64::NAN, f64::INFINITY)]);
        assert!(!encoded.is_empty());
    }

    #[test]
    fn characters_outside_alphabet_are_rejected() {
        assert!(decode_default("_p~iF ps|U").is_err());
        assert!(decode_default("_p~iF~ps|U\u{7f}").is_err());
    }
}

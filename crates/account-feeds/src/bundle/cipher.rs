use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::DecodeError;

/// Letters are shifted this many positions back when decoding.
pub const SHIFT: u8 = 3;

// Browser `atob` semantics: padding optional, trailing bits discarded.
static FORGIVING: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
});

#[inline]
fn unshift(c: char) -> char {
    let base = match c {
        'a'..='z' => b'a',
        'A'..='Z' => b'A',
        _ => return c,
    };
    ((c as u8 - base + 26 - SHIFT) % 26 + base) as char
}

/// Decodes one layer of obfuscation: base64, then a Caesar shift of
/// [`SHIFT`] letters backwards, then reversal.
///
/// Every decoded byte is taken as one character (Latin-1), so any valid
/// base64 input yields a string.
pub fn decode(input: &str) -> Result<String, DecodeError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = FORGIVING.decode(compact)?;

    Ok(bytes
        .iter()
        .map(|&b| unshift(b as char))
        .rev()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use proptest::prelude::*;

    fn shift(c: char) -> char {
        let base = match c {
            'a'..='z' => b'a',
            'A'..='Z' => b'A',
            _ => return c,
        };
        ((c as u8 - base + SHIFT) % 26 + base) as char
    }

    fn encode(plain: &str) -> String {
        let shifted: String = plain.chars().rev().map(shift).collect();
        STANDARD.encode(shifted.as_bytes())
    }

    #[test]
    fn test_unshift_wraps_within_case() {
        assert_eq!(unshift('a'), 'x');
        assert_eq!(unshift('c'), 'z');
        assert_eq!(unshift('d'), 'a');
        assert_eq!(unshift('A'), 'X');
        assert_eq!(unshift('D'), 'A');
        assert_eq!(unshift('5'), '5');
        assert_eq!(unshift('|'), '|');
    }

    #[test]
    fn test_decode_known_vector() {
        // "dse" unshifts to "apb", reversed to "bpa"
        let input = STANDARD.encode("dse");
        assert_eq!(decode(&input).unwrap(), "bpa");
    }

    #[test]
    fn test_decode_accepts_missing_padding_and_whitespace() {
        let padded = encode("example_com-api");
        let unpadded = padded.trim_end_matches('=');
        let wrapped = format!("{}\n{}", &unpadded[..4], &unpadded[4..]);
        assert_eq!(decode(&wrapped).unwrap(), "example_com-api");
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(matches!(
            decode("not*base64!"),
            Err(DecodeError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_decode_empty_input() {
        assert_eq!(decode("").unwrap(), "");
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(plain in "[ -~]{0,64}") {
            prop_assert_eq!(decode(&encode(&plain)).unwrap(), plain);
        }
    }
}

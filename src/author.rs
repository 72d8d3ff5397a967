//! Author ID encoding
//!
//! Numeric user ids are rendered as short strings using a positional encoding
//! over a fixed alphabet of printable ASCII (radix = alphabet length, most
//! significant digit first). The alphabet excludes space, `"` and `\` so that
//! an author ID can sit after the space in a composite key and inside JSON
//! without escaping.

/// Digits of the encoding, lowest value first. `0` encodes as `!`.
pub const AUTHOR_ALPHABET: &str =
    "!#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Encode a numeric user id.
///
/// # Examples
///
/// ```
/// use tilestamp::author::encode_author_id;
///
/// assert_eq!(encode_author_id(0), "!");
/// assert_eq!(encode_author_id(92), "#!");
/// ```
pub fn encode_author_id(user_id: u64) -> String {
    let digits = AUTHOR_ALPHABET.as_bytes();
    let radix = digits.len() as u64;

    if user_id == 0 {
        return (digits[0] as char).to_string();
    }

    let mut value = user_id;
    let mut encoded = Vec::new();
    while value > 0 {
        encoded.push(digits[(value % radix) as usize]);
        value /= radix;
    }
    encoded.iter().rev().map(|&b| b as char).collect()
}

/// Decode an author ID back into the numeric user id.
///
/// Returns `None` for empty input, characters outside the alphabet, or values
/// that overflow `u64`.
pub fn decode_author_id(author_id: &str) -> Option<u64> {
    if author_id.is_empty() {
        return None;
    }
    let radix = AUTHOR_ALPHABET.len() as u64;
    author_id.chars().try_fold(0u64, |acc, c| {
        let digit = AUTHOR_ALPHABET.find(c)? as u64;
        acc.checked_mul(radix)?.checked_add(digit)
    })
}

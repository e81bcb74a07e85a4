//! Digit-pair literals used to keep symmetric key material out of plain sight.
//! Every two decimal digits encode one code point, so `"6567"` reads as `"AC"`.
//! This is obfuscation only; the decoded values are still compiled in.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiteralError {
    #[error("literal length {0} is odd; expected digit pairs")]
    OddLength(usize),
    #[error("non-digit pair {pair:?} at offset {offset}")]
    NonDigit { offset: usize, pair: String },
    #[error("character {0:?} has a code point above 99 and cannot be encoded")]
    Unencodable(char),
}

/// Decodes a digit-pair literal into the string it hides.
pub fn decode_literal(literal: &str) -> Result<String, LiteralError> {
    let bytes = literal.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(LiteralError::OddLength(bytes.len()));
    }

    let mut decoded = String::with_capacity(bytes.len() / 2);
    for (index, pair) in bytes.chunks_exact(2).enumerate() {
        let offset = index * 2;
        if !pair.iter().all(u8::is_ascii_digit) {
            return Err(LiteralError::NonDigit {
                offset,
                pair: String::from_utf8_lossy(pair).into_owned(),
            });
        }
        let code_point = (pair[0] - b'0') * 10 + (pair[1] - b'0');
        decoded.push(char::from(code_point));
    }
    Ok(decoded)
}

/// Inverse of [`decode_literal`] for text made only of code points below 100.
pub fn encode_literal(text: &str) -> Result<String, LiteralError> {
    let mut encoded = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let code_point = u32::from(ch);
        if code_point > 99 {
            return Err(LiteralError::Unencodable(ch));
        }
        encoded.push_str(&format!("{code_point:02}"));
    }
    Ok(encoded)
}

//! Request identifiers in the shape the remote service issues from its web
//! client: 32 lowercase hex digits with a version marker at index 14, a variant
//! digit at index 19 and positions 8, 13 and 18 mirroring position 23.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const REQUEST_ID_LEN: usize = 32;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";
const VERSION_INDEX: usize = 14;
const VARIANT_INDEX: usize = 19;
const MIRROR_SOURCE: usize = 23;
const MIRROR_TARGETS: [usize; 3] = [8, 13, 18];

/// How the random digit at the variant index is read before `(v & 3) | 8` is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonceVariant {
    /// Decimal coercion: `0-9` keep their value, `a-f` read as zero.
    /// This is what the service's own client produces.
    #[default]
    Decimal,
    /// Hex value of the digit, as in the UUIDv4 variant convention.
    Hex,
}

impl NonceVariant {
    fn coerce(self, digit: u8) -> u8 {
        match self {
            NonceVariant::Decimal if digit.is_ascii_digit() => digit - b'0',
            NonceVariant::Decimal => 0,
            NonceVariant::Hex => match digit {
                b'0'..=b'9' => digit - b'0',
                b'a'..=b'f' => digit - b'a' + 10,
                _ => 0,
            },
        }
    }
}

/// Generates a fresh request id from the thread-local random source.
pub fn new_request_id() -> String {
    new_request_id_with(&mut rand::thread_rng(), NonceVariant::default())
}

/// Generates a request id from an explicit random source.
pub fn new_request_id_with<R: Rng + ?Sized>(rng: &mut R, variant: NonceVariant) -> String {
    let mut digits = [0u8; REQUEST_ID_LEN];
    for digit in digits.iter_mut() {
        *digit = HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())];
    }

    digits[VERSION_INDEX] = b'4';
    let value = variant.coerce(digits[VARIANT_INDEX]);
    digits[VARIANT_INDEX] = HEX_DIGITS[usize::from((value & 3) | 8)];
    let mirrored = digits[MIRROR_SOURCE];
    for index in MIRROR_TARGETS {
        digits[index] = mirrored;
    }

    digits.iter().copied().map(char::from).collect()
}

//! Semi-octet (BCD) dialling numbers
//!
//! Numbers on the SIM are stored two digits per byte, low nibble first, with
//! `0xF` as filler. Nibble values above 9 stand for `*`, `#`, `p` (pause),
//! `w` (wait) and `e` (expansion).

use heapless::String;

const DIGITS: &[u8; 15] = b"0123456789*#pwe";

const FILLER: u8 = 0x0F;

/// Type-of-number bits of the TON/NPI byte
pub const TON_MASK: u8 = 0x70;

/// Type-of-number value for international numbers
pub const TON_INTERNATIONAL: u8 = 0x10;

/// Append the digits in `bytes` to `out`, stopping at the first filler nibble
///
/// Digits that do not fit in `out` are dropped.
pub fn append_digits<const N: usize>(out: &mut String<N>, bytes: &[u8]) {
    for &byte in bytes {
        for nibble in [byte & 0x0F, byte >> 4] {
            if nibble == FILLER {
                return;
            }
            let digit = DIGITS[usize::from(nibble)];
            out.push(char::from(digit)).ok();
        }
    }
}

/// Decode a dialling number: `+` for international numbers, then the digits
#[must_use]
pub fn decode_number<const N: usize>(ton_npi: u8, bytes: &[u8]) -> String<N> {
    let mut number = String::new();
    if ton_npi & TON_MASK == TON_INTERNATIONAL {
        number.push('+').ok();
    }
    append_digits(&mut number, bytes);
    number
}

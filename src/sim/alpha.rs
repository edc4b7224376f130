//! SIM alpha identifier decoding
//!
//! Alpha identifiers (contact names, e-mail addresses, second names) use one
//! of four encodings, selected by the first byte:
//!
//! | First byte | Encoding                                                      |
//! |------------|---------------------------------------------------------------|
//! | `0x80`     | UCS2 big-endian                                               |
//! | `0x81`     | length, 8-bit base (bits 15-7), then GSM or base-offset bytes |
//! | `0x82`     | length, 16-bit base, then GSM or base-offset bytes            |
//! | otherwise  | GSM 7-bit default alphabet, one character per byte            |
//!
//! Unused trailing bytes are `0xFF`.

use heapless::String;

const UNUSED: u8 = 0xFF;
const ESCAPE: u8 = 0x1B;

/// GSM 03.38 default alphabet
const GSM_DEFAULT: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', ' ', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

fn gsm_extension(code: u8) -> Option<char> {
    match code {
        0x0A => Some('\u{0C}'),
        0x14 => Some('^'),
        0x28 => Some('{'),
        0x29 => Some('}'),
        0x2F => Some('\\'),
        0x3C => Some('['),
        0x3D => Some('~'),
        0x3E => Some(']'),
        0x40 => Some('|'),
        0x65 => Some('€'),
        _ => None,
    }
}

/// Decode an alpha identifier into `N` bytes of UTF-8
///
/// Returns `None` if the field is not valid in its encoding. Characters that
/// do not fit are dropped.
#[must_use]
pub fn decode<const N: usize>(data: &[u8]) -> Option<String<N>> {
    let mut out = String::new();
    match data.first() {
        None => {}
        Some(0x80) => decode_ucs2(&data[1..], &mut out)?,
        Some(0x81) => {
            let count = usize::from(*data.get(1)?);
            let base = u32::from(*data.get(2)?) << 7;
            decode_with_base(data.get(3..)?, count, base, &mut out)?;
        }
        Some(0x82) => {
            let count = usize::from(*data.get(1)?);
            let base = u32::from(u16::from_be_bytes([*data.get(2)?, *data.get(3)?]));
            decode_with_base(data.get(4..)?, count, base, &mut out)?;
        }
        Some(_) => decode_gsm(data, &mut out)?,
    }
    Some(out)
}

fn decode_gsm<const N: usize>(data: &[u8], out: &mut String<N>) -> Option<()> {
    let mut bytes = data.iter().copied().take_while(|&b| b != UNUSED);
    while let Some(byte) = bytes.next() {
        let c = if byte == ESCAPE {
            match bytes.next() {
                Some(code) if code < 0x80 => {
                    gsm_extension(code).unwrap_or(GSM_DEFAULT[usize::from(code)])
                }
                Some(_) => return None,
                None => ' ',
            }
        } else {
            *GSM_DEFAULT.get(usize::from(byte))?
        };
        out.push(c).ok();
    }
    Some(())
}

fn decode_ucs2<const N: usize>(data: &[u8], out: &mut String<N>) -> Option<()> {
    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0xFFFF);
    for c in char::decode_utf16(units) {
        out.push(c.ok()?).ok();
    }
    Some(())
}

fn decode_with_base<const N: usize>(
    data: &[u8],
    count: usize,
    base: u32,
    out: &mut String<N>,
) -> Option<()> {
    let mut bytes = data.iter().copied().take(count);
    while let Some(byte) = bytes.next() {
        let c = if byte & 0x80 != 0 {
            char::from_u32(base + u32::from(byte & 0x7F))?
        } else if byte == ESCAPE {
            let code = bytes.next()?;
            gsm_extension(code).unwrap_or(*GSM_DEFAULT.get(usize::from(code))?)
        } else {
            GSM_DEFAULT[usize::from(byte)]
        };
        out.push(c).ok();
    }
    Some(())
}

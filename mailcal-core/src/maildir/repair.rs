//! Repair of calendar bodies that were UTF-8 encoded twice.
//!
//! Some senders take UTF-8 text, read it as Windows-1252 and encode it as
//! UTF-8 again, so `ä` arrives as `Ã¤`. Encoding the text back to single
//! bytes and decoding those as UTF-8 undoes this, except where the middle
//! step lost bytes; those known cases are patched first.

use encoding_rs::WINDOWS_1252;

/// Lead character of every double-encoded Latin-1 letter.
const MARKER: &str = "\u{c3}";

/// Damaged sequences and the intact double-encoded form they came from.
const REPAIRS: &[(&str, &str)] = &[
    // à: the no-break space was turned into a plain space
    ("\u{c3} ", "\u{c3}\u{a0}"),
    // Í: 0x8D is unassigned in Windows-1252 and came out as '?'
    ("\u{c3}?", "\u{c3}\u{8d}"),
    // Á: 0x81 is unassigned too and came out as U+FFFD
    ("\u{c3}\u{fffd}", "\u{c3}\u{81}"),
];

/// Whether a body declared as `charset` should be run through
/// [`repair_double_encoding`].
pub fn needs_repair(charset: &str, text: &str) -> bool {
    let utf8 = charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8");
    utf8 && text.contains(MARKER)
}

pub fn repair_double_encoding(text: &str) -> String {
    let mut fixed = text.to_string();
    for (damaged, intact) in REPAIRS {
        fixed = fixed.replace(damaged, intact);
    }

    for encode in [encode_windows_1252, encode_latin1] {
        if let Some(bytes) = encode(&fixed) {
            if let Ok(repaired) = String::from_utf8(bytes) {
                return repaired;
            }
        }
    }

    tracing::debug!("Double-encoding repair failed, decoding lossily");
    let bytes: Vec<u8> = fixed
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn encode_windows_1252(text: &str) -> Option<Vec<u8>> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    (!had_errors).then(|| bytes.into_owned())
}

fn encode_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

//! Interleaved 2 of 5 symbology
//!
//! Reference: <http://en.wikipedia.org/wiki/Interleaved_2_of_5>
//!
//! This format always encodes an even number of digits. Digits are paired:
//! the bars carry the first digit of a pair and the spaces the second.
//! The start code is "1111"; the stop code is "211". Bar strings list
//! element widths alternating bar, space, bar, ... with `1` for narrow and
//! `2` for wide.

use crate::{RecogError, RecogResult};

/// Symbol patterns for digits 0-9
const DIGITS: [&str; 10] = [
    "11221", // 0
    "21112", // 1
    "12112", // 2
    "22111", // 3
    "11212", // 4
    "21211", // 5
    "12211", // 6
    "11122", // 7
    "21121", // 8
    "12121", // 9
];

const START: &str = "1111";
const STOP: &str = "211";

/// Number of elements in a symbol carrying `digits` digits
pub fn symbol_len(digits: usize) -> usize {
    START.len() + digits * 5 + STOP.len()
}

/// Encode an even-length digit string as a bar string.
pub fn encode_bar_string(digits: &str) -> RecogResult<String> {
    if digits.is_empty() || digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecogError::Format(format!(
            "Interleaved 2 of 5 needs a non-empty even number of digits, got {:?}",
            digits
        )));
    }
    let mut out = String::with_capacity(symbol_len(digits.len()));
    out.push_str(START);
    let bytes = digits.as_bytes();
    for pair in bytes.chunks(2) {
        let bars = DIGITS[(pair[0] - b'0') as usize].as_bytes();
        let spaces = DIGITS[(pair[1] - b'0') as usize].as_bytes();
        for j in 0..5 {
            out.push(bars[j] as char);
            out.push(spaces[j] as char);
        }
    }
    out.push_str(STOP);
    Ok(out)
}

fn has_frame(barstr: &str) -> bool {
    barstr.len() >= symbol_len(2) && barstr.starts_with(START) && barstr.ends_with(STOP)
}

fn digit_for(code: &[u8]) -> Option<char> {
    DIGITS
        .iter()
        .position(|p| p.as_bytes() == code)
        .and_then(|d| char::from_digit(d as u32, 10))
}

/// Decode a bar string read in either direction.
pub fn decode_bar_string(barstr: &str) -> RecogResult<String> {
    let forward = if has_frame(barstr) {
        barstr.to_string()
    } else {
        let reversed: String = barstr.chars().rev().collect();
        if !has_frame(&reversed) {
            return Err(RecogError::Barcode(
                "bar string not in Interleaved 2 of 5 format".to_string(),
            ));
        }
        reversed
    };

    let len = forward.len();
    if (len - START.len() - STOP.len()) % 10 != 0 {
        return Err(RecogError::Barcode(format!(
            "{} elements do not form whole digit pairs",
            len
        )));
    }

    let body = &forward.as_bytes()[START.len()..len - STOP.len()];
    let mut data = String::with_capacity(body.len() / 5);
    for chunk in body.chunks(10) {
        let bars: Vec<u8> = chunk.iter().step_by(2).copied().collect();
        let spaces: Vec<u8> = chunk.iter().skip(1).step_by(2).copied().collect();
        match (digit_for(&bars), digit_for(&spaces)) {
            (Some(a), Some(b)) => {
                data.push(a);
                data.push(b);
            }
            _ => {
                return Err(RecogError::Barcode(
                    "invalid Interleaved 2 of 5 digit pattern".to_string(),
                ));
            }
        }
    }
    Ok(data)
}

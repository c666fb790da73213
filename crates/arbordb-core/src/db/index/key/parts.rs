use crate::db::index::key::OrderedFieldDecodeError;

const ESCAPE: u8 = 0x01;
const ESCAPED_ZERO: u8 = 0x01;
const ESCAPED_ESCAPE: u8 = 0x02;

// 0x00 -> 01 01, 0x01 -> 01 02. The code is prefix-free and monotone per
// byte, so escaped payloads compare exactly like the raw bytes did.
pub(super) fn push_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        match byte {
            0x00 => out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => out.push(other),
        }
    }
}

pub(super) fn unescape(payload: &[u8]) -> Result<Vec<u8>, OrderedFieldDecodeError> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.iter();

    while let Some(&byte) = bytes.next() {
        if byte != ESCAPE {
            out.push(byte);
            continue;
        }

        match bytes.next() {
            Some(&ESCAPED_ZERO) => out.push(0x00),
            Some(&ESCAPED_ESCAPE) => out.push(ESCAPE),
            Some(&other) => return Err(OrderedFieldDecodeError::InvalidEscape { byte: other }),
            None => return Err(OrderedFieldDecodeError::DanglingEscape),
        }
    }

    Ok(out)
}

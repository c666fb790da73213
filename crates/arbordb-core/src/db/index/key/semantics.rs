//! Module: index::key::semantics
//! Responsibility: fixed-width scalar byte transforms preserving order.
//! Does not own: field framing or escaping.

use crate::db::index::key::OrderedFieldDecodeError;

pub(super) const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = value.cast_unsigned() ^ (1u64 << 63);
    biased.to_be_bytes()
}

pub(super) fn i64_from_ordered(raw: &[u8]) -> Result<i64, OrderedFieldDecodeError> {
    let bytes = fixed::<8>("int", raw)?;
    let biased = u64::from_be_bytes(bytes) ^ (1u64 << 63);

    Ok(biased.cast_signed())
}

pub(super) fn u64_from_be(raw: &[u8]) -> Result<u64, OrderedFieldDecodeError> {
    fixed::<8>("uint", raw).map(u64::from_be_bytes)
}

pub(super) const fn expect_width(
    kind: &'static str,
    raw: &[u8],
    expected: usize,
) -> Result<(), OrderedFieldDecodeError> {
    if raw.len() == expected {
        Ok(())
    } else {
        Err(OrderedFieldDecodeError::InvalidWidth {
            kind,
            expected,
            found: raw.len(),
        })
    }
}

fn fixed<const N: usize>(
    kind: &'static str,
    raw: &[u8],
) -> Result<[u8; N], OrderedFieldDecodeError> {
    raw.try_into()
        .map_err(|_| OrderedFieldDecodeError::InvalidWidth {
            kind,
            expected: N,
            found: raw.len(),
        })
}

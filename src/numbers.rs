//! Two's complement helpers for the 16-bit LC-3 word.

/// Implements sign extension as described at [Sign extension](https://en.wikipedia.org/wiki/Sign_extension).
///
/// Only the low `bit_width` bits of `value` are considered, higher bits are ignored.
/// If bit `bit_width - 1` is set the result is 1-extended, otherwise 0-extended.
///
/// # Panics
/// - asserts (in debug builds) that `bit_width` is in `1..=16`
#[must_use]
pub const fn sign_extend(value: u16, bit_width: u8) -> u16 {
    debug_assert!(bit_width >= 1 && bit_width <= 16, "bit width out of range");
    if bit_width >= 16 {
        return value;
    }
    let field = value & ((1 << bit_width) - 1);
    if field >> (bit_width - 1) == 1 {
        // negative: 1-extend
        field | (0xFFFF << bit_width)
    } else {
        // positive, already 0-extended
        field
    }
}

/// Widens an unsigned field, e.g. `trapvect8`, without looking at its top bit.
#[must_use]
pub fn zero_extend(value: u8) -> u16 {
    u16::from(value)
}

/// Interprets a word as two's complement, used for diagnostics only.
#[must_use]
pub const fn as_signed(bin_rep: u16) -> i16 {
    bin_rep.cast_signed()
}

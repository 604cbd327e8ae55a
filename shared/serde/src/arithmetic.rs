/// Maps signed values onto unsigned ones so small magnitudes stay small:
/// 0, -1, 1, -2, 2 become 0, 1, 2, 3, 4.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Integer division rounding towards positive infinity. A zero divisor
/// yields zero.
pub fn ceiling_div(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    numerator / denominator + u64::from(numerator % denominator != 0)
}

/// Number of little-endian bytes needed to hold `value`, never less than one.
pub fn used_byte_count(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    ceiling_div(bits as u64, 8).max(1) as usize
}

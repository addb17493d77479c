/// Clamp a signed integer into the `0..=255` range and return it as `u8`.
///
/// Equivalent to the reference implementation's `CLIP256` macro.
pub fn clip8(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

//! Integer PCM <-> double conversion for the byte-level processing path.
//!
//! Samples are little-endian. 8-bit PCM is unsigned, wider formats are
//! signed. Decoding maps full scale to `[-1.0, 1.0)` without loss; encoding
//! rounds half away from zero and clamps to the representable range.

use crate::error::CenterCutError;

/// Whether `bits_per_sample` is a byte multiple between 8 and 32.
pub fn bits_per_sample_is_valid(bits_per_sample: u16) -> bool {
    (8..=32).contains(&bits_per_sample) && bits_per_sample % 8 == 0
}

/// Bytes occupied by one sample, validating the bit depth.
///
/// # Errors
/// Returns [`CenterCutError::InvalidFormat`] for unsupported depths.
pub fn bytes_per_sample(bits_per_sample: u16) -> Result<usize, CenterCutError> {
    if !bits_per_sample_is_valid(bits_per_sample) {
        return Err(CenterCutError::InvalidFormat(format!(
            "{} bits per sample is not a multiple of 8 in [8, 32]",
            bits_per_sample
        )));
    }
    Ok(bits_per_sample as usize / 8)
}

fn full_scale(bits_per_sample: u16) -> f64 {
    (1_i64 << (bits_per_sample.clamp(1, 32) - 1)) as f64
}

/// Map a signed `bits_per_sample`-bit integer sample to `[-1.0, 1.0)`.
pub fn int_to_float(value: i32, bits_per_sample: u16) -> f64 {
    value as f64 / full_scale(bits_per_sample)
}

/// Quantize to a signed `bits_per_sample`-bit integer sample.
///
/// Rounds half away from zero after clamping to the representable range.
pub fn float_to_int(sample: f64, bits_per_sample: u16) -> i32 {
    let scale = full_scale(bits_per_sample);
    (sample * scale).clamp(-scale, scale - 1.0).round() as i32
}

/// Decode packed PCM bytes into `out`, one double per sample.
///
/// # Returns
/// Number of samples decoded (limited by both `bytes` and `out`).
///
/// # Errors
/// Returns [`CenterCutError::InvalidFormat`] for unsupported depths.
pub fn decode(bytes: &[u8], bits_per_sample: u16, out: &mut [f64]) -> Result<usize, CenterCutError> {
    let width = bytes_per_sample(bits_per_sample)?;
    let sign_flip: i32 = if width == 1 { i32::MIN } else { 0 };
    let shift = 32 - bits_per_sample as u32;

    let mut count = 0;
    for (chunk, sample) in bytes.chunks_exact(width).zip(out.iter_mut()) {
        let mut raw = [0_u8; 4];
        raw[4 - width..].copy_from_slice(chunk);
        let value = (i32::from_le_bytes(raw) ^ sign_flip) >> shift;
        *sample = int_to_float(value, bits_per_sample);
        count += 1;
    }
    Ok(count)
}

/// Encode doubles into packed PCM bytes.
///
/// # Returns
/// Number of samples encoded (limited by both `samples` and `bytes`).
///
/// # Errors
/// Returns [`CenterCutError::InvalidFormat`] for unsupported depths.
pub fn encode(samples: &[f64], bits_per_sample: u16, bytes: &mut [u8]) -> Result<usize, CenterCutError> {
    let width = bytes_per_sample(bits_per_sample)?;
    let sign_flip: i32 = if width == 1 { i32::MIN } else { 0 };
    let shift = 32 - bits_per_sample as u32;

    let mut count = 0;
    for (sample, chunk) in samples.iter().zip(bytes.chunks_exact_mut(width)) {
        let value = (float_to_int(*sample, bits_per_sample) << shift) ^ sign_flip;
        chunk.copy_from_slice(&value.to_le_bytes()[4 - width..]);
        count += 1;
    }
    Ok(count)
}

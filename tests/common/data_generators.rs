#![allow(dead_code)]

use half::f16;

pub fn make_f64_data(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64 * 0.1).collect()
}
pub fn make_f32_data(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32 * 0.1).collect()
}
pub fn make_f16_data(n: usize) -> Vec<f16> {
    (0..n).map(|i| f16::from_f32(i as f32 * 0.5)).collect()
}
pub fn make_i64_data(n: usize) -> Vec<i64> {
    (0..n).map(|i| i as i64 - (n / 2) as i64).collect()
}
pub fn make_i32_data(n: usize) -> Vec<i32> {
    (0..n).map(|i| i as i32 - (n / 2) as i32).collect()
}
pub fn make_i16_data(n: usize) -> Vec<i16> {
    (0..n).map(|i| (i as i16).wrapping_mul(7)).collect()
}
pub fn make_i8_data(n: usize) -> Vec<i8> {
    (0..n).map(|i| (i % 128) as i8 - 64).collect()
}
pub fn make_u8_data(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 256) as u8).collect()
}
pub fn make_bool_data(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 2) as u8).collect()
}

/// Little-endian bytes of a slice of fixed-width values.
pub fn le_bytes<T: Copy, const N: usize>(values: &[T], to_bytes: fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|&v| to_bytes(v)).collect()
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    le_bytes(values, f32::to_le_bytes)
}

/// TFLite string tensor layout: count, start offsets, then the payload.
pub fn string_tensor(values: &[&str]) -> Vec<u8> {
    let header = 4 + 4 * values.len();
    let mut data = Vec::new();
    data.extend_from_slice(&(values.len() as i32).to_le_bytes());
    let mut offset = header;
    for value in values {
        data.extend_from_slice(&(offset as i32).to_le_bytes());
        offset += value.len();
    }
    for value in values {
        data.extend_from_slice(value.as_bytes());
    }
    data
}

//! Tensor types and constant tensor values.
//!
//! [`TensorType`] resolves a tensor record's type code and shape. [`decode`]
//! turns a raw little-endian buffer into a nested [`TensorValue`] following
//! the tensor's dimensions, stopping at an element cutoff so display-oriented
//! access stays bounded.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use half::f16;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::Error;
use crate::schema::TensorRecord;

/// Cutoff for a full value request.
pub const VALUE_LIMIT: usize = usize::MAX;

/// Cutoff for string rendering.
pub const PREVIEW_LIMIT: usize = 10_000;

// ---- Data types ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float32,
    Float16,
    Int32,
    UInt8,
    Int64,
    String,
    Bool,
    Int16,
    Complex64,
    Int8,
    Float64,
    Unknown,
}

impl DataType {
    /// Maps a schema `TensorType` code. Unrecognized codes map to [`DataType::Unknown`].
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => DataType::Float32,
            1 => DataType::Float16,
            2 => DataType::Int32,
            3 => DataType::UInt8,
            4 => DataType::Int64,
            5 => DataType::String,
            6 => DataType::Bool,
            7 => DataType::Int16,
            8 => DataType::Complex64,
            9 => DataType::Int8,
            10 => DataType::Float64,
            _ => DataType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Float32 => "float32",
            DataType::Float16 => "float16",
            DataType::Int32 => "int32",
            DataType::UInt8 => "uint8",
            DataType::Int64 => "int64",
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Int16 => "int16",
            DataType::Complex64 => "complex64",
            DataType::Int8 => "int8",
            DataType::Float64 => "float64",
            DataType::Unknown => "?",
        }
    }

    /// Fixed element width in bytes. `None` for strings and types without a decoder.
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            DataType::UInt8 | DataType::Int8 | DataType::Bool => Some(1),
            DataType::Float16 | DataType::Int16 => Some(2),
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 => Some(8),
            DataType::String | DataType::Complex64 | DataType::Unknown => None,
        }
    }

    fn is_decodable(&self) -> bool {
        self.byte_size().is_some() || *self == DataType::String
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered tensor dimensions. Empty for scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    pub dimensions: Vec<u64>,
}

impl Shape {
    pub fn new(dimensions: Vec<u64>) -> Self {
        Self { dimensions }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dimensions.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorType {
    pub data_type: DataType,
    pub shape: Shape,
}

impl TensorType {
    pub fn new(data_type: DataType, shape: Shape) -> Self {
        Self { data_type, shape }
    }

    /// Resolves the data type and shape of a tensor record.
    pub fn from_record(record: &TensorRecord<'_>) -> Result<Self, Error> {
        let code = record.type_code()?;
        let data_type = DataType::from_code(code);
        if data_type == DataType::Unknown {
            tracing::warn!("unknown tensor type code {}", code);
        }
        let dimensions = record
            .shape()?
            .iter()
            .map(|d| {
                u64::try_from(d).unwrap_or_else(|_| {
                    tracing::warn!("negative dimension {} treated as 0", d);
                    0
                })
            })
            .collect();
        Ok(Self::new(data_type, Shape::new(dimensions)))
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.data_type, self.shape)
    }
}

// ---- Values ----

/// A decoded tensor value: a scalar, or a list nested once per dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorValue {
    Int(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(String),
    List(Vec<TensorValue>),
    /// Truncation marker emitted once the cutoff is reached.
    Ellipsis,
}

impl Serialize for TensorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TensorValue::Int(v) => serializer.serialize_i64(*v),
            TensorValue::Float(v) => serializer.serialize_f32(*v),
            TensorValue::Double(v) => serializer.serialize_f64(*v),
            TensorValue::Bool(v) => serializer.serialize_bool(*v),
            TensorValue::Str(v) => serializer.serialize_str(v),
            TensorValue::Ellipsis => serializer.serialize_str("..."),
            TensorValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl TensorValue {
    /// Renders the value as JSON with four-space indentation.
    pub fn to_pretty_json(&self) -> String {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        if self.serialize(&mut serializer).is_err() {
            return String::new();
        }
        String::from_utf8(out).unwrap_or_default()
    }
}

/// Why a buffer could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorState {
    #[error("Tensor data is empty.")]
    Empty,

    #[error("Tensor data is out of bounds: {needed} bytes needed at offset {offset}, buffer holds {length}.")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        length: usize,
    },

    #[error("Tensor string table is invalid.")]
    InvalidStringTable,
}

// ---- Decoding ----

struct DecodeContext<'a> {
    data: &'a [u8],
    data_type: DataType,
    dimensions: &'a [u64],
    strings: Vec<String>,
    /// Byte offset, or string table index for string tensors.
    index: usize,
    count: usize,
    limit: usize,
    /// Most elements the data could hold.
    capacity: usize,
}

impl<'a> DecodeContext<'a> {
    fn new(
        data: &'a [u8],
        data_type: DataType,
        dimensions: &'a [u64],
        limit: usize,
    ) -> Result<Self, TensorState> {
        if data.is_empty() {
            return Err(TensorState::Empty);
        }
        let strings = if data_type == DataType::String {
            string_table(data)?
        } else {
            Vec::new()
        };
        let capacity = match data_type {
            DataType::String => strings.len(),
            DataType::Complex64 => data.len() / 8,
            other => data.len() / other.byte_size().unwrap_or(1),
        };
        Ok(Self {
            data,
            data_type,
            dimensions,
            strings,
            index: 0,
            count: 0,
            limit,
            capacity,
        })
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], TensorState> {
        let data = self.data;
        let out_of_bounds = TensorState::OutOfBounds {
            offset: self.index,
            needed: width,
            length: data.len(),
        };
        let end = self.index.checked_add(width).ok_or(out_of_bounds.clone())?;
        let bytes = data.get(self.index..end).ok_or(out_of_bounds)?;
        self.index = end;
        Ok(bytes)
    }

    /// Reads one element, or `None` when the data type has no decoder.
    fn read_scalar(&mut self) -> Result<Option<TensorValue>, TensorState> {
        let value = match self.data_type {
            DataType::UInt8 => TensorValue::Int(self.take(1)?[0] as i64),
            DataType::Int8 => TensorValue::Int(self.take(1)?[0] as i8 as i64),
            DataType::Bool => TensorValue::Bool(self.take(1)?[0] != 0),
            DataType::Int16 => TensorValue::Int(LittleEndian::read_i16(self.take(2)?) as i64),
            DataType::Int32 => TensorValue::Int(LittleEndian::read_i32(self.take(4)?) as i64),
            DataType::Int64 => TensorValue::Int(LittleEndian::read_i64(self.take(8)?)),
            DataType::Float16 => {
                let bytes = self.take(2)?;
                TensorValue::Float(f16::from_le_bytes([bytes[0], bytes[1]]).to_f32())
            }
            DataType::Float32 => TensorValue::Float(LittleEndian::read_f32(self.take(4)?)),
            DataType::Float64 => TensorValue::Double(LittleEndian::read_f64(self.take(8)?)),
            DataType::String => {
                let text = self.strings.get(self.index).cloned().ok_or(TensorState::OutOfBounds {
                    offset: self.index,
                    needed: 1,
                    length: self.strings.len(),
                })?;
                self.index += 1;
                TensorValue::Str(text)
            }
            DataType::Complex64 | DataType::Unknown => return Ok(None),
        };
        self.count += 1;
        Ok(Some(value))
    }

    fn decode(&mut self, dimension: usize) -> Result<Vec<TensorValue>, TensorState> {
        let size = self.dimensions[dimension];
        let last = dimension + 1 == self.dimensions.len();
        let mut results = Vec::new();
        if last && !self.data_type.is_decodable() {
            return Ok(results);
        }
        for _ in 0..size {
            // Empty sub-sequences are bounded by the data as well as the cutoff.
            if self.count >= self.limit || self.count > self.capacity {
                results.push(TensorValue::Ellipsis);
                return Ok(results);
            }
            if last {
                if let Some(value) = self.read_scalar()? {
                    results.push(value);
                }
            } else {
                let before = self.count;
                results.push(TensorValue::List(self.decode(dimension + 1)?));
                // An empty sub-sequence counts as one element toward the cutoff.
                if self.count == before {
                    self.count += 1;
                }
            }
        }
        Ok(results)
    }
}

/// Builds the string table of a string tensor: an `i32` count, `count`
/// `i32` start offsets, then the UTF-8 payload running to the end of the buffer.
fn string_table(data: &[u8]) -> Result<Vec<String>, TensorState> {
    let read_i32 = |pos: usize| -> Result<i32, TensorState> {
        data.get(pos..pos + 4)
            .map(LittleEndian::read_i32)
            .ok_or(TensorState::InvalidStringTable)
    };
    let count = usize::try_from(read_i32(0)?).map_err(|_| TensorState::InvalidStringTable)?;
    let mut offsets = Vec::with_capacity(count.min(data.len() / 4) + 1);
    for i in 0..count {
        let offset = read_i32(4 + i * 4)?;
        offsets.push(usize::try_from(offset).map_err(|_| TensorState::InvalidStringTable)?);
    }
    offsets.push(data.len());

    offsets
        .windows(2)
        .map(|range| {
            data.get(range[0]..range[1])
                .map(decode_text)
                .ok_or(TensorState::InvalidStringTable)
        })
        .collect()
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Decodes `data` as a tensor of `data_type` with the given dimensions,
/// emitting at most `limit` elements before a truncation marker.
///
/// An empty shape decodes as a single scalar. Types without a decoder
/// produce no elements.
pub fn decode(
    data: &[u8],
    data_type: DataType,
    dimensions: &[u64],
    limit: usize,
) -> Result<TensorValue, TensorState> {
    let mut context = DecodeContext::new(data, data_type, dimensions, limit)?;
    if dimensions.is_empty() {
        if limit == 0 {
            return Ok(TensorValue::Ellipsis);
        }
        return Ok(context.read_scalar()?.unwrap_or(TensorValue::List(Vec::new())));
    }
    context.decode(0).map(TensorValue::List)
}

// ---- Initializer ----

/// Constant tensor data embedded in the model. Never holds empty data.
#[derive(Debug, Clone)]
pub struct Initializer {
    index: usize,
    name: Option<String>,
    tensor_type: TensorType,
    data: Vec<u8>,
}

impl Initializer {
    /// Returns `None` when `data` is empty.
    pub fn new(index: usize, name: Option<String>, tensor_type: TensorType, data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        Some(Self {
            index,
            name,
            tensor_type,
            data: data.to_vec(),
        })
    }

    /// Positional id of the backing tensor.
    pub fn id(&self) -> String {
        self.index.to_string()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.tensor_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The condition that blocks decoding before any element is read, if any.
    pub fn state(&self) -> Option<TensorState> {
        DecodeContext::new(
            &self.data,
            self.tensor_type.data_type,
            &self.tensor_type.shape.dimensions,
            VALUE_LIMIT,
        )
        .err()
    }

    /// The full decoded value, or `None` when decoding fails.
    pub fn value(&self) -> Option<TensorValue> {
        self.value_with_limit(VALUE_LIMIT)
    }

    pub fn value_with_limit(&self, limit: usize) -> Option<TensorValue> {
        decode(
            &self.data,
            self.tensor_type.data_type,
            &self.tensor_type.shape.dimensions,
            limit,
        )
        .ok()
    }
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_with_limit(PREVIEW_LIMIT) {
            Some(value) => f.write_str(&value.to_pretty_json()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::from_code(0).as_str(), "float32");
        assert_eq!(DataType::from_code(3).as_str(), "uint8");
        assert_eq!(DataType::from_code(5).as_str(), "string");
        assert_eq!(DataType::from_code(42).as_str(), "?");
        assert_eq!(DataType::from_code(-1), DataType::Unknown);
    }

    #[test]
    fn test_type_display() {
        let t = TensorType::new(DataType::Float32, Shape::new(vec![1, 224, 224, 3]));
        assert_eq!(t.to_string(), "float32[1,224,224,3]");
        let scalar = TensorType::new(DataType::Int64, Shape::default());
        assert_eq!(scalar.to_string(), "int64[]");
    }

    #[test]
    fn test_decode_2d() {
        let data = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let value = decode(&data, DataType::Float32, &[2, 3], VALUE_LIMIT).unwrap();
        let expected = TensorValue::List(vec![
            TensorValue::List(vec![
                TensorValue::Float(1.0),
                TensorValue::Float(2.0),
                TensorValue::Float(3.0),
            ]),
            TensorValue::List(vec![
                TensorValue::Float(4.0),
                TensorValue::Float(5.0),
                TensorValue::Float(6.0),
            ]),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(
            decode(&[], DataType::Float32, &[2], VALUE_LIMIT),
            Err(TensorState::Empty)
        );
        assert_eq!(TensorState::Empty.to_string(), "Tensor data is empty.");
    }

    #[test]
    fn test_decode_short_buffer() {
        let data = f32_bytes(&[1.0, 2.0, 3.0]);
        match decode(&data, DataType::Float32, &[4], VALUE_LIMIT) {
            Err(TensorState::OutOfBounds { offset, needed, length }) => {
                assert_eq!((offset, needed, length), (12, 4, 12));
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_type_skipped() {
        let data = vec![0u8; 16];
        let value = decode(&data, DataType::Complex64, &[2, 2], VALUE_LIMIT).unwrap();
        assert_eq!(
            value,
            TensorValue::List(vec![TensorValue::List(vec![]), TensorValue::List(vec![])])
        );
    }

    #[test]
    fn test_decode_scalar() {
        let data = 7i32.to_le_bytes();
        assert_eq!(
            decode(&data, DataType::Int32, &[], VALUE_LIMIT).unwrap(),
            TensorValue::Int(7)
        );
    }

    #[test]
    fn test_decode_cutoff() {
        let data: Vec<u8> = (0..10).collect();
        let value = decode(&data, DataType::UInt8, &[10], 3).unwrap();
        assert_eq!(
            value,
            TensorValue::List(vec![
                TensorValue::Int(0),
                TensorValue::Int(1),
                TensorValue::Int(2),
                TensorValue::Ellipsis,
            ])
        );
    }

    #[test]
    fn test_string_table() {
        let mut data = Vec::new();
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&12i32.to_le_bytes());
        data.extend_from_slice(&15i32.to_le_bytes());
        data.extend_from_slice(b"catdog!");
        assert_eq!(string_table(&data).unwrap(), vec!["cat", "dog!"]);

        // Offset past the end of the buffer.
        let mut bad = Vec::new();
        bad.extend_from_slice(&1i32.to_le_bytes());
        bad.extend_from_slice(&100i32.to_le_bytes());
        assert_eq!(string_table(&bad), Err(TensorState::InvalidStringTable));
    }

    #[test]
    fn test_decode_text_fallback() {
        assert_eq!(decode_text(b"abc"), "abc");
        assert_eq!(decode_text(&[0x61, 0xFF]), "a\u{FF}");
    }

    #[test]
    fn test_pretty_json() {
        let value = TensorValue::List(vec![TensorValue::Int(1), TensorValue::Ellipsis]);
        assert_eq!(value.to_pretty_json(), "[\n    1,\n    \"...\"\n]");
    }

    #[test]
    fn test_initializer() {
        let tensor_type = TensorType::new(DataType::Int32, Shape::new(vec![2]));
        assert!(Initializer::new(0, None, tensor_type.clone(), &[]).is_none());

        let data: Vec<u8> = [5i32, -6].iter().flat_map(|v| v.to_le_bytes()).collect();
        let init = Initializer::new(3, Some("w".into()), tensor_type, &data).unwrap();
        assert_eq!(init.id(), "3");
        assert_eq!(init.name(), Some("w"));
        assert!(init.state().is_none());
        assert_eq!(
            init.value(),
            Some(TensorValue::List(vec![TensorValue::Int(5), TensorValue::Int(-6)]))
        );
        assert_eq!(init.to_string(), "[\n    5,\n    -6\n]");
    }
}

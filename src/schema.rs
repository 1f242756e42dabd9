//! TFLite schema records.
//!
//! Typed views over the FlatBuffers tables of the TFLite schema (`TFL3`),
//! plus the builtin operator and enum name tables the decoder needs.

use std::borrow::Cow;

use crate::error::Error;
use crate::flatbuffer::{Table, Tables, Vector};

/// File identifier of TFLite FlatBuffers.
pub const FILE_IDENTIFIER: &[u8; 4] = b"TFL3";

/// Builtin code marking a custom operator.
pub const CUSTOM_OPERATOR: i32 = 32;

/// Vtable slots of the schema tables.
pub mod vt {
    pub mod model {
        pub const VERSION: u16 = 4;
        pub const OPERATOR_CODES: u16 = 6;
        pub const SUBGRAPHS: u16 = 8;
        pub const DESCRIPTION: u16 = 10;
        pub const BUFFERS: u16 = 12;
    }
    pub mod operator_code {
        pub const DEPRECATED_BUILTIN_CODE: u16 = 4;
        pub const CUSTOM_CODE: u16 = 6;
        pub const VERSION: u16 = 8;
        pub const BUILTIN_CODE: u16 = 10;
    }
    pub mod sub_graph {
        pub const TENSORS: u16 = 4;
        pub const INPUTS: u16 = 6;
        pub const OUTPUTS: u16 = 8;
        pub const OPERATORS: u16 = 10;
        pub const NAME: u16 = 12;
    }
    pub mod tensor {
        pub const SHAPE: u16 = 4;
        pub const TYPE: u16 = 6;
        pub const BUFFER: u16 = 8;
        pub const NAME: u16 = 10;
        pub const QUANTIZATION: u16 = 12;
    }
    pub mod quantization {
        pub const MIN: u16 = 4;
        pub const MAX: u16 = 6;
        pub const SCALE: u16 = 8;
        pub const ZERO_POINT: u16 = 10;
    }
    pub mod buffer {
        pub const DATA: u16 = 4;
    }
    pub mod operator {
        pub const OPCODE_INDEX: u16 = 4;
        pub const INPUTS: u16 = 6;
        pub const OUTPUTS: u16 = 8;
        pub const BUILTIN_OPTIONS_TYPE: u16 = 10;
        pub const BUILTIN_OPTIONS: u16 = 12;
    }
}

macro_rules! record {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name<'a>(Table<'a>);

        impl<'a> From<Table<'a>> for $name<'a> {
            fn from(table: Table<'a>) -> Self {
                Self(table)
            }
        }
    };
}

record!(
    /// Root `Model` table.
    ModelRecord
);
record!(OperatorCodeRecord);
record!(SubGraphRecord);
record!(TensorRecord);
record!(QuantizationRecord);
record!(BufferRecord);
record!(OperatorRecord);

impl<'a> ModelRecord<'a> {
    pub fn root(buf: &'a [u8]) -> Result<Self, Error> {
        Table::root(buf).map(Self)
    }

    pub fn version(&self) -> Result<u32, Error> {
        self.0.get(vt::model::VERSION, 0)
    }

    pub fn description(&self) -> Result<Option<Cow<'a, str>>, Error> {
        self.0.get_str(vt::model::DESCRIPTION)
    }

    pub fn operator_codes(&self) -> Result<Tables<'a>, Error> {
        Ok(self.0.get_tables(vt::model::OPERATOR_CODES)?.unwrap_or_else(Tables::empty))
    }

    pub fn subgraphs(&self) -> Result<Tables<'a>, Error> {
        Ok(self.0.get_tables(vt::model::SUBGRAPHS)?.unwrap_or_else(Tables::empty))
    }

    pub fn buffers(&self) -> Result<Tables<'a>, Error> {
        Ok(self.0.get_tables(vt::model::BUFFERS)?.unwrap_or_else(Tables::empty))
    }
}

impl<'a> OperatorCodeRecord<'a> {
    /// Builtin code. Codes past 127 only fit the extended int field, while
    /// older files only fill the legacy byte, so the larger of the two wins.
    pub fn builtin_code(&self) -> Result<i32, Error> {
        let legacy = self.0.get::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, 0)? as i32;
        let extended = self.0.get::<i32>(vt::operator_code::BUILTIN_CODE, 0)?;
        Ok(legacy.max(extended))
    }

    pub fn custom_code(&self) -> Result<Option<Cow<'a, str>>, Error> {
        self.0.get_str(vt::operator_code::CUSTOM_CODE)
    }
}

impl<'a> SubGraphRecord<'a> {
    pub fn tensors(&self) -> Result<Tables<'a>, Error> {
        Ok(self.0.get_tables(vt::sub_graph::TENSORS)?.unwrap_or_else(Tables::empty))
    }

    pub fn inputs(&self) -> Result<Vector<'a, i32>, Error> {
        Ok(self.0.get_vector(vt::sub_graph::INPUTS)?.unwrap_or_else(Vector::empty))
    }

    pub fn outputs(&self) -> Result<Vector<'a, i32>, Error> {
        Ok(self.0.get_vector(vt::sub_graph::OUTPUTS)?.unwrap_or_else(Vector::empty))
    }

    pub fn operators(&self) -> Result<Tables<'a>, Error> {
        Ok(self.0.get_tables(vt::sub_graph::OPERATORS)?.unwrap_or_else(Tables::empty))
    }

    pub fn name(&self) -> Result<Option<Cow<'a, str>>, Error> {
        self.0.get_str(vt::sub_graph::NAME)
    }
}

impl<'a> TensorRecord<'a> {
    pub fn shape(&self) -> Result<Vector<'a, i32>, Error> {
        Ok(self.0.get_vector(vt::tensor::SHAPE)?.unwrap_or_else(Vector::empty))
    }

    pub fn type_code(&self) -> Result<i8, Error> {
        self.0.get(vt::tensor::TYPE, 0)
    }

    pub fn buffer(&self) -> Result<u32, Error> {
        self.0.get(vt::tensor::BUFFER, 0)
    }

    pub fn name(&self) -> Result<Option<Cow<'a, str>>, Error> {
        self.0.get_str(vt::tensor::NAME)
    }

    pub fn quantization(&self) -> Result<Option<QuantizationRecord<'a>>, Error> {
        Ok(self.0.get_table(vt::tensor::QUANTIZATION)?.map(QuantizationRecord))
    }
}

impl<'a> QuantizationRecord<'a> {
    pub fn min(&self) -> Result<Vector<'a, f32>, Error> {
        Ok(self.0.get_vector(vt::quantization::MIN)?.unwrap_or_else(Vector::empty))
    }

    pub fn max(&self) -> Result<Vector<'a, f32>, Error> {
        Ok(self.0.get_vector(vt::quantization::MAX)?.unwrap_or_else(Vector::empty))
    }

    pub fn scale(&self) -> Result<Vector<'a, f32>, Error> {
        Ok(self.0.get_vector(vt::quantization::SCALE)?.unwrap_or_else(Vector::empty))
    }

    pub fn zero_point(&self) -> Result<Vector<'a, i64>, Error> {
        Ok(self.0.get_vector(vt::quantization::ZERO_POINT)?.unwrap_or_else(Vector::empty))
    }
}

impl<'a> BufferRecord<'a> {
    /// Raw buffer bytes; empty when the buffer carries no data.
    pub fn data(&self) -> Result<&'a [u8], Error> {
        Ok(self
            .0
            .get_vector::<u8>(vt::buffer::DATA)?
            .map(|v| v.as_bytes())
            .unwrap_or_default())
    }
}

impl<'a> OperatorRecord<'a> {
    pub fn opcode_index(&self) -> Result<u32, Error> {
        self.0.get(vt::operator::OPCODE_INDEX, 0)
    }

    pub fn inputs(&self) -> Result<Vector<'a, i32>, Error> {
        Ok(self.0.get_vector(vt::operator::INPUTS)?.unwrap_or_else(Vector::empty))
    }

    pub fn outputs(&self) -> Result<Vector<'a, i32>, Error> {
        Ok(self.0.get_vector(vt::operator::OUTPUTS)?.unwrap_or_else(Vector::empty))
    }

    /// Union tag of the `builtin_options` field.
    pub fn builtin_options_type(&self) -> Result<u8, Error> {
        self.0.get(vt::operator::BUILTIN_OPTIONS_TYPE, 0)
    }

    pub fn builtin_options(&self) -> Result<Option<Table<'a>>, Error> {
        self.0.get_table(vt::operator::BUILTIN_OPTIONS)
    }
}

// ---- Builtin operators ----

/// `BuiltinOperator` enumeration, indexed by code.
const BUILTIN_OPERATORS: &[&str] = &[
    "ADD",
    "AVERAGE_POOL_2D",
    "CONCATENATION",
    "CONV_2D",
    "DEPTHWISE_CONV_2D",
    "DEPTH_TO_SPACE",
    "DEQUANTIZE",
    "EMBEDDING_LOOKUP",
    "FLOOR",
    "FULLY_CONNECTED",
    "HASHTABLE_LOOKUP",
    "L2_NORMALIZATION",
    "L2_POOL_2D",
    "LOCAL_RESPONSE_NORMALIZATION",
    "LOGISTIC",
    "LSH_PROJECTION",
    "LSTM",
    "MAX_POOL_2D",
    "MUL",
    "RELU",
    "RELU_N1_TO_1",
    "RELU6",
    "RESHAPE",
    "RESIZE_BILINEAR",
    "RNN",
    "SOFTMAX",
    "SPACE_TO_DEPTH",
    "SVDF",
    "TANH",
    "CONCAT_EMBEDDINGS",
    "SKIP_GRAM",
    "CALL",
    "CUSTOM",
    "EMBEDDING_LOOKUP_SPARSE",
    "PAD",
    "UNIDIRECTIONAL_SEQUENCE_RNN",
    "GATHER",
    "BATCH_TO_SPACE_ND",
    "SPACE_TO_BATCH_ND",
    "TRANSPOSE",
    "MEAN",
    "SUB",
    "DIV",
    "SQUEEZE",
    "UNIDIRECTIONAL_SEQUENCE_LSTM",
    "STRIDED_SLICE",
    "BIDIRECTIONAL_SEQUENCE_RNN",
    "EXP",
    "TOPK_V2",
    "SPLIT",
    "LOG_SOFTMAX",
    "DELEGATE",
    "BIDIRECTIONAL_SEQUENCE_LSTM",
    "CAST",
    "PRELU",
    "MAXIMUM",
    "ARG_MAX",
    "MINIMUM",
    "LESS",
    "NEG",
    "PADV2",
    "GREATER",
    "GREATER_EQUAL",
    "LESS_EQUAL",
    "SELECT",
    "SLICE",
    "SIN",
    "TRANSPOSE_CONV",
    "SPARSE_TO_DENSE",
    "TILE",
    "EXPAND_DIMS",
    "EQUAL",
    "NOT_EQUAL",
    "LOG",
    "SUM",
    "SQRT",
    "RSQRT",
    "SHAPE",
    "POW",
    "ARG_MIN",
    "FAKE_QUANT",
    "REDUCE_PROD",
    "REDUCE_MAX",
    "PACK",
    "LOGICAL_OR",
    "ONE_HOT",
    "LOGICAL_AND",
    "LOGICAL_NOT",
    "UNPACK",
    "REDUCE_MIN",
    "FLOOR_DIV",
    "REDUCE_ANY",
    "SQUARE",
    "ZEROS_LIKE",
    "FILL",
    "FLOOR_MOD",
    "RANGE",
    "RESIZE_NEAREST_NEIGHBOR",
    "LEAKY_RELU",
    "SQUARED_DIFFERENCE",
    "MIRROR_PAD",
    "ABS",
    "SPLIT_V",
    "UNIQUE",
    "CEIL",
    "REVERSE_V2",
    "ADD_N",
    "GATHER_ND",
    "COS",
    "WHERE",
    "RANK",
    "ELU",
    "REVERSE_SEQUENCE",
    "MATRIX_DIAG",
    "QUANTIZE",
    "MATRIX_SET_DIAG",
    "ROUND",
    "HARD_SWISH",
    "IF",
    "WHILE",
    "NON_MAX_SUPPRESSION_V4",
    "NON_MAX_SUPPRESSION_V5",
    "SCATTER_ND",
    "SELECT_V2",
    "DENSIFY",
    "SEGMENT_SUM",
    "BATCH_MATMUL",
];

/// Name segments kept uppercase when converting to display names.
const UPPERCASE_SEGMENTS: &[&str] = &["2D", "LSH", "SVDF", "RNN", "L2", "LSTM"];

/// Display name of a builtin operator code, e.g. `CONV_2D` -> `Conv2D`.
pub fn builtin_operator_name(code: i32) -> Option<String> {
    let raw = BUILTIN_OPERATORS.get(usize::try_from(code).ok()?)?;
    Some(
        raw.split('_')
            .map(|segment| {
                if segment.is_empty() || UPPERCASE_SEGMENTS.contains(&segment) {
                    return segment.to_string();
                }
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                    None => String::new(),
                }
            })
            .collect(),
    )
}

// ---- Enumerations ----

/// `TensorType` enumeration, indexed by code.
pub const TENSOR_TYPES: &[&str] = &[
    "FLOAT32", "FLOAT16", "INT32", "UINT8", "INT64", "STRING", "BOOL", "INT16", "COMPLEX64",
    "INT8", "FLOAT64",
];

const ACTIVATION_FUNCTION_TYPES: &[&str] =
    &["NONE", "RELU", "RELU_N1_TO_1", "RELU6", "TANH", "SIGN_BIT"];
const PADDINGS: &[&str] = &["SAME", "VALID"];
const LSH_PROJECTION_TYPES: &[&str] = &["UNKNOWN", "SPARSE", "DENSE"];
const COMBINER_TYPES: &[&str] = &["SUM", "MEAN", "SQRTN"];
const MIRROR_PAD_MODES: &[&str] = &["REFLECT", "SYMMETRIC"];
const WEIGHTS_FORMATS: &[&str] = &["DEFAULT", "SHUFFLED4x16INT8"];
const LSTM_KERNEL_TYPES: &[&str] = &["FULL", "BASIC"];

/// Member name of a schema enum value, looked up by the enum's type name.
pub fn enum_name(type_name: &str, value: i64) -> Option<&'static str> {
    let members = match type_name {
        "TensorType" => TENSOR_TYPES,
        "ActivationFunctionType" => ACTIVATION_FUNCTION_TYPES,
        "Padding" => PADDINGS,
        "LSHProjectionType" => LSH_PROJECTION_TYPES,
        "CombinerType" => COMBINER_TYPES,
        "MirrorPadMode" => MIRROR_PAD_MODES,
        "FullyConnectedOptionsWeightsFormat" => WEIGHTS_FORMATS,
        "LSTMKernelType" => LSTM_KERNEL_TYPES,
        _ => return None,
    };
    members.get(usize::try_from(value).ok()?).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_operator_names() {
        assert_eq!(builtin_operator_name(0).as_deref(), Some("Add"));
        assert_eq!(builtin_operator_name(1).as_deref(), Some("AveragePool2D"));
        assert_eq!(builtin_operator_name(3).as_deref(), Some("Conv2D"));
        assert_eq!(builtin_operator_name(4).as_deref(), Some("DepthwiseConv2D"));
        assert_eq!(builtin_operator_name(11).as_deref(), Some("L2Normalization"));
        assert_eq!(builtin_operator_name(15).as_deref(), Some("LSHProjection"));
        assert_eq!(builtin_operator_name(16).as_deref(), Some("LSTM"));
        assert_eq!(builtin_operator_name(20).as_deref(), Some("ReluN1To1"));
        assert_eq!(builtin_operator_name(27).as_deref(), Some("SVDF"));
        assert_eq!(builtin_operator_name(44).as_deref(), Some("UnidirectionalSequenceLSTM"));
        assert_eq!(builtin_operator_name(126).as_deref(), Some("BatchMatmul"));
        assert_eq!(builtin_operator_name(127), None);
        assert_eq!(builtin_operator_name(-1), None);
    }

    #[test]
    fn test_enum_name() {
        assert_eq!(enum_name("ActivationFunctionType", 0), Some("NONE"));
        assert_eq!(enum_name("ActivationFunctionType", 3), Some("RELU6"));
        assert_eq!(enum_name("Padding", 1), Some("VALID"));
        assert_eq!(enum_name("TensorType", 9), Some("INT8"));
        assert_eq!(enum_name("Padding", 7), None);
        assert_eq!(enum_name("Padding", -1), None);
        assert_eq!(enum_name("int32", 0), None);
    }
}

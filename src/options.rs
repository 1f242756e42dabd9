//! Builtin operator options.
//!
//! Each operator with a typed options table gets a hand-written field list
//! in schema order, so field `i` lives in vtable slot `4 + 2 * i`. Vector
//! fields are read whole and surface as a single list-valued attribute.

use crate::error::Error;
use crate::flatbuffer::Table;
use crate::node::AttributeValue;

/// Storage type of an options field, carrying its schema default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Int32Vector,
}

impl FieldKind {
    fn default_value(&self) -> AttributeValue {
        match *self {
            FieldKind::Bool(v) => AttributeValue::Bool(v),
            FieldKind::Int8(v) => AttributeValue::Int(v as i64),
            FieldKind::Int16(v) => AttributeValue::Int(v as i64),
            FieldKind::Int32(v) => AttributeValue::Int(v as i64),
            FieldKind::UInt32(v) => AttributeValue::Int(v as i64),
            FieldKind::Float32(v) => AttributeValue::Float(v),
            FieldKind::Int32Vector => AttributeValue::List(Vec::new()),
        }
    }

    fn read(&self, table: &Table<'_>, slot: u16) -> Result<AttributeValue, Error> {
        Ok(match *self {
            FieldKind::Bool(d) => AttributeValue::Bool(table.get(slot, d)?),
            FieldKind::Int8(d) => AttributeValue::Int(table.get(slot, d)? as i64),
            FieldKind::Int16(d) => AttributeValue::Int(table.get(slot, d)? as i64),
            FieldKind::Int32(d) => AttributeValue::Int(table.get(slot, d)? as i64),
            FieldKind::UInt32(d) => AttributeValue::Int(table.get(slot, d)? as i64),
            FieldKind::Float32(d) => AttributeValue::Float(table.get(slot, d)?),
            FieldKind::Int32Vector => AttributeValue::List(
                table
                    .get_vector::<i32>(slot)?
                    .map(|v| v.iter().map(i64::from).collect())
                    .unwrap_or_default(),
            ),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OptionField {
    /// camelCase field name as it appears in the schema accessors.
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug)]
pub struct OptionsTable {
    pub name: &'static str,
    /// `BuiltinOptions` union tag of this table.
    pub union_type: u8,
    pub fields: &'static [OptionField],
}

impl OptionsTable {
    /// Reads every field of the operator's options, in schema order.
    ///
    /// When the operator carries no options table, or one tagged with a
    /// different union type, every field takes its schema default.
    pub fn read(
        &self,
        options_type: u8,
        options: Option<Table<'_>>,
    ) -> Result<Vec<(&'static str, AttributeValue)>, Error> {
        let table = match options {
            Some(table) if options_type == self.union_type => Some(table),
            Some(_) => {
                tracing::warn!(
                    "options type {} does not match {} ({}), using defaults",
                    options_type,
                    self.name,
                    self.union_type
                );
                None
            }
            None => None,
        };
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let slot = 4 + 2 * index as u16;
                let value = match &table {
                    Some(table) => field.kind.read(table, slot)?,
                    None => field.kind.default_value(),
                };
                Ok((field.name, value))
            })
            .collect()
    }
}

macro_rules! options_table {
    ($ident:ident, $name:literal, $union:literal, [$(($field:literal, $kind:expr)),* $(,)?]) => {
        static $ident: OptionsTable = OptionsTable {
            name: $name,
            union_type: $union,
            fields: &[$(OptionField { name: $field, kind: $kind }),*],
        };
    };
}

use FieldKind::{Bool, Float32, Int8, Int16, Int32, Int32Vector, UInt32};

options_table!(CONV_2D, "Conv2DOptions", 1, [
    ("padding", Int8(0)),
    ("strideW", Int32(0)),
    ("strideH", Int32(0)),
    ("fusedActivationFunction", Int8(0)),
    ("dilationWFactor", Int32(1)),
    ("dilationHFactor", Int32(1)),
]);
options_table!(DEPTHWISE_CONV_2D, "DepthwiseConv2DOptions", 2, [
    ("padding", Int8(0)),
    ("strideW", Int32(0)),
    ("strideH", Int32(0)),
    ("depthMultiplier", Int32(0)),
    ("fusedActivationFunction", Int8(0)),
    ("dilationWFactor", Int32(1)),
    ("dilationHFactor", Int32(1)),
]);
options_table!(CONCAT_EMBEDDINGS, "ConcatEmbeddingsOptions", 3, [
    ("numChannels", Int32(0)),
    ("numColumnsPerChannel", Int32Vector),
    ("embeddingDimPerChannel", Int32Vector),
]);
options_table!(LSH_PROJECTION, "LSHProjectionOptions", 4, [
    ("type", Int16(0)),
]);
options_table!(POOL_2D, "Pool2DOptions", 5, [
    ("padding", Int8(0)),
    ("strideW", Int32(0)),
    ("strideH", Int32(0)),
    ("filterWidth", Int32(0)),
    ("filterHeight", Int32(0)),
    ("fusedActivationFunction", Int8(0)),
]);
options_table!(SVDF, "SVDFOptions", 6, [
    ("rank", Int32(0)),
    ("fusedActivationFunction", Int8(0)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(RNN, "RNNOptions", 7, [
    ("fusedActivationFunction", Int8(0)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(FULLY_CONNECTED, "FullyConnectedOptions", 8, [
    ("fusedActivationFunction", Int8(0)),
    ("weightsFormat", Int8(0)),
    ("keepNumDims", Bool(false)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(SOFTMAX, "SoftmaxOptions", 9, [
    ("beta", Float32(0.0)),
]);
options_table!(CONCATENATION, "ConcatenationOptions", 10, [
    ("axis", Int32(0)),
    ("fusedActivationFunction", Int8(0)),
]);
options_table!(ADD, "AddOptions", 11, [
    ("fusedActivationFunction", Int8(0)),
    ("potScaleInt16", Bool(true)),
]);
options_table!(L2_NORM, "L2NormOptions", 12, [
    ("fusedActivationFunction", Int8(0)),
]);
options_table!(LOCAL_RESPONSE_NORMALIZATION, "LocalResponseNormalizationOptions", 13, [
    ("radius", Int32(0)),
    ("bias", Float32(0.0)),
    ("alpha", Float32(0.0)),
    ("beta", Float32(0.0)),
]);
options_table!(LSTM, "LSTMOptions", 14, [
    ("fusedActivationFunction", Int8(0)),
    ("cellClip", Float32(0.0)),
    ("projClip", Float32(0.0)),
    ("kernelType", Int8(0)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(RESIZE_BILINEAR, "ResizeBilinearOptions", 15, [
    ("newHeight", Int32(0)),
    ("newWidth", Int32(0)),
    ("alignCorners", Bool(false)),
    ("halfPixelCenters", Bool(false)),
]);
options_table!(CALL, "CallOptions", 16, [
    ("subgraph", UInt32(0)),
]);
options_table!(RESHAPE, "ReshapeOptions", 17, [
    ("newShape", Int32Vector),
]);
options_table!(SKIP_GRAM, "SkipGramOptions", 18, [
    ("ngramSize", Int32(0)),
    ("maxSkipSize", Int32(0)),
    ("includeAllNgrams", Bool(false)),
]);
options_table!(SPACE_TO_DEPTH, "SpaceToDepthOptions", 19, [
    ("blockSize", Int32(0)),
]);
options_table!(EMBEDDING_LOOKUP_SPARSE, "EmbeddingLookupSparseOptions", 20, [
    ("combiner", Int8(0)),
]);
options_table!(MUL, "MulOptions", 21, [
    ("fusedActivationFunction", Int8(0)),
]);
options_table!(GATHER, "GatherOptions", 23, [
    ("axis", Int32(0)),
    ("batchDims", Int32(0)),
]);
options_table!(REDUCER, "ReducerOptions", 27, [
    ("keepDims", Bool(false)),
]);
options_table!(SUB, "SubOptions", 28, [
    ("fusedActivationFunction", Int8(0)),
    ("potScaleInt16", Bool(true)),
]);
options_table!(DIV, "DivOptions", 29, [
    ("fusedActivationFunction", Int8(0)),
]);
options_table!(SQUEEZE, "SqueezeOptions", 30, [
    ("squeezeDims", Int32Vector),
]);
options_table!(SEQUENCE_RNN, "SequenceRNNOptions", 31, [
    ("timeMajor", Bool(false)),
    ("fusedActivationFunction", Int8(0)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(STRIDED_SLICE, "StridedSliceOptions", 32, [
    ("beginMask", Int32(0)),
    ("endMask", Int32(0)),
    ("ellipsisMask", Int32(0)),
    ("newAxisMask", Int32(0)),
    ("shrinkAxisMask", Int32(0)),
]);
options_table!(SPLIT, "SplitOptions", 35, [
    ("numSplits", Int32(0)),
]);
options_table!(CAST, "CastOptions", 37, [
    ("inDataType", Int8(0)),
    ("outDataType", Int8(0)),
]);
options_table!(ARG_MAX, "ArgMaxOptions", 40, [
    ("outputType", Int8(0)),
]);
options_table!(TRANSPOSE_CONV, "TransposeConvOptions", 49, [
    ("padding", Int8(0)),
    ("strideW", Int32(0)),
    ("strideH", Int32(0)),
]);
options_table!(SPARSE_TO_DENSE, "SparseToDenseOptions", 50, [
    ("validateIndices", Bool(false)),
]);
options_table!(SHAPE, "ShapeOptions", 55, [
    ("outType", Int8(0)),
]);
options_table!(ARG_MIN, "ArgMinOptions", 57, [
    ("outputType", Int8(0)),
]);
options_table!(FAKE_QUANT, "FakeQuantOptions", 58, [
    ("min", Float32(0.0)),
    ("max", Float32(0.0)),
    ("numBits", Int32(0)),
    ("narrowRange", Bool(false)),
]);
options_table!(PACK, "PackOptions", 59, [
    ("valuesCount", Int32(0)),
    ("axis", Int32(0)),
]);
options_table!(ONE_HOT, "OneHotOptions", 61, [
    ("axis", Int32(0)),
]);
options_table!(UNPACK, "UnpackOptions", 64, [
    ("num", Int32(0)),
    ("axis", Int32(0)),
]);
options_table!(BIDIRECTIONAL_SEQUENCE_LSTM, "BidirectionalSequenceLSTMOptions", 69, [
    ("fusedActivationFunction", Int8(0)),
    ("cellClip", Float32(0.0)),
    ("projClip", Float32(0.0)),
    ("mergeOutputs", Bool(false)),
    ("timeMajor", Bool(true)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(BIDIRECTIONAL_SEQUENCE_RNN, "BidirectionalSequenceRNNOptions", 70, [
    ("timeMajor", Bool(false)),
    ("fusedActivationFunction", Int8(0)),
    ("mergeOutputs", Bool(false)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(UNIDIRECTIONAL_SEQUENCE_LSTM, "UnidirectionalSequenceLSTMOptions", 71, [
    ("fusedActivationFunction", Int8(0)),
    ("cellClip", Float32(0.0)),
    ("projClip", Float32(0.0)),
    ("timeMajor", Bool(false)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);
options_table!(RESIZE_NEAREST_NEIGHBOR, "ResizeNearestNeighborOptions", 74, [
    ("alignCorners", Bool(false)),
    ("halfPixelCenters", Bool(false)),
]);
options_table!(LEAKY_RELU, "LeakyReluOptions", 75, [
    ("alpha", Float32(0.0)),
]);
options_table!(MIRROR_PAD, "MirrorPadOptions", 77, [
    ("mode", Int8(0)),
]);
options_table!(SPLIT_V, "SplitVOptions", 79, [
    ("numSplits", Int32(0)),
]);
options_table!(UNIQUE, "UniqueOptions", 80, [
    ("idxOutType", Int8(2)),
]);
options_table!(REVERSE_SEQUENCE, "ReverseSequenceOptions", 87, [
    ("seqDim", Int32(0)),
    ("batchDim", Int32(0)),
]);
options_table!(IF, "IfOptions", 92, [
    ("thenSubgraphIndex", Int32(0)),
    ("elseSubgraphIndex", Int32(0)),
]);
options_table!(WHILE, "WhileOptions", 93, [
    ("condSubgraphIndex", Int32(0)),
    ("bodySubgraphIndex", Int32(0)),
]);
options_table!(DEPTH_TO_SPACE, "DepthToSpaceOptions", 94, [
    ("blockSize", Int32(0)),
]);
options_table!(BATCH_MAT_MUL, "BatchMatMulOptions", 101, [
    ("adjX", Bool(false)),
    ("adjY", Bool(false)),
    ("asymmetricQuantizeInputs", Bool(false)),
]);

/// Options table of an operator, by resolved operator name. Operators
/// without one carry no attributes.
pub fn for_operator(operator: &str) -> Option<&'static OptionsTable> {
    Some(match operator {
        "Conv2D" => &CONV_2D,
        "DepthwiseConv2D" => &DEPTHWISE_CONV_2D,
        "ConcatEmbeddings" => &CONCAT_EMBEDDINGS,
        "LSHProjection" => &LSH_PROJECTION,
        "AveragePool2D" | "MaxPool2D" | "L2Pool2D" => &POOL_2D,
        "SVDF" => &SVDF,
        "RNN" => &RNN,
        "FullyConnected" => &FULLY_CONNECTED,
        "Softmax" => &SOFTMAX,
        "Concatenation" => &CONCATENATION,
        "Add" => &ADD,
        "L2Normalization" => &L2_NORM,
        "LocalResponseNormalization" => &LOCAL_RESPONSE_NORMALIZATION,
        "LSTM" => &LSTM,
        "ResizeBilinear" => &RESIZE_BILINEAR,
        "Call" => &CALL,
        "Reshape" => &RESHAPE,
        "SkipGram" => &SKIP_GRAM,
        "SpaceToDepth" => &SPACE_TO_DEPTH,
        "EmbeddingLookupSparse" => &EMBEDDING_LOOKUP_SPARSE,
        "Mul" => &MUL,
        "Gather" => &GATHER,
        "Mean" | "Sum" | "ReduceProd" | "ReduceMax" | "ReduceMin" | "ReduceAny" => &REDUCER,
        "Sub" => &SUB,
        "Div" => &DIV,
        "Squeeze" => &SQUEEZE,
        "UnidirectionalSequenceRNN" => &SEQUENCE_RNN,
        "StridedSlice" => &STRIDED_SLICE,
        "Split" => &SPLIT,
        "Cast" => &CAST,
        "ArgMax" => &ARG_MAX,
        "TransposeConv" => &TRANSPOSE_CONV,
        "SparseToDense" => &SPARSE_TO_DENSE,
        "Shape" => &SHAPE,
        "ArgMin" => &ARG_MIN,
        "FakeQuant" => &FAKE_QUANT,
        "Pack" => &PACK,
        "OneHot" => &ONE_HOT,
        "Unpack" => &UNPACK,
        "BidirectionalSequenceLSTM" => &BIDIRECTIONAL_SEQUENCE_LSTM,
        "BidirectionalSequenceRNN" => &BIDIRECTIONAL_SEQUENCE_RNN,
        "UnidirectionalSequenceLSTM" => &UNIDIRECTIONAL_SEQUENCE_LSTM,
        "ResizeNearestNeighbor" => &RESIZE_NEAREST_NEIGHBOR,
        "LeakyRelu" => &LEAKY_RELU,
        "MirrorPad" => &MIRROR_PAD,
        "SplitV" => &SPLIT_V,
        "Unique" => &UNIQUE,
        "ReverseSequence" => &REVERSE_SEQUENCE,
        "If" => &IF,
        "While" => &WHILE,
        "DepthToSpace" => &DEPTH_TO_SPACE,
        "BatchMatmul" => &BATCH_MAT_MUL,
        _ => return None,
    })
}

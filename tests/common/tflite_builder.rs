#![allow(dead_code)]

use std::io::Write;

use flatbuffers::{FlatBufferBuilder, TableFinishedWIPOffset, WIPOffset};
use tempfile::NamedTempFile;
use tflite_graph::schema::vt;

type Offset = WIPOffset<TableFinishedWIPOffset>;

#[derive(Debug, Clone, Default)]
pub struct QuantizationDef {
    pub scale: Vec<f32>,
    pub zero_point: Vec<i64>,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct TensorDef {
    pub name: String,
    pub type_code: i8,
    pub shape: Vec<i32>,
    /// Backing data. Empty data points the tensor at the shared empty buffer 0.
    pub data: Vec<u8>,
    pub quantization: Option<QuantizationDef>,
}

impl TensorDef {
    pub fn new(name: &str, type_code: i8, shape: &[i32]) -> Self {
        Self {
            name: name.to_string(),
            type_code,
            shape: shape.to_vec(),
            data: Vec::new(),
            quantization: None,
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_quantization(mut self, quantization: QuantizationDef) -> Self {
        self.quantization = Some(quantization);
        self
    }
}

/// One field of a builtin options table, by position.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Absent,
    Bool(bool),
    Int8(i8),
    Int32(i32),
    Float32(f32),
    Int32Vector(Vec<i32>),
}

#[derive(Debug, Clone)]
pub struct OptionsDef {
    pub union_type: u8,
    pub fields: Vec<OptionValue>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorDef {
    pub opcode_index: u32,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub options: Option<OptionsDef>,
}

impl OperatorDef {
    pub fn new(opcode_index: u32, inputs: &[i32], outputs: &[i32]) -> Self {
        Self {
            opcode_index,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            options: None,
        }
    }

    pub fn with_options(mut self, union_type: u8, fields: Vec<OptionValue>) -> Self {
        self.options = Some(OptionsDef { union_type, fields });
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubGraphDef {
    pub name: Option<String>,
    pub tensors: Vec<TensorDef>,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub operators: Vec<OperatorDef>,
}

#[derive(Debug, Clone)]
pub enum OperatorCodeDef {
    /// Written to both the legacy byte and the extended int field.
    Builtin(i32),
    /// Written to the legacy byte only, as older converters do.
    Legacy(i8),
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct ModelDef {
    pub version: u32,
    pub description: Option<String>,
    pub operator_codes: Vec<OperatorCodeDef>,
    pub subgraphs: Vec<SubGraphDef>,
}

impl Default for ModelDef {
    fn default() -> Self {
        Self {
            version: 3,
            description: None,
            operator_codes: Vec::new(),
            subgraphs: Vec::new(),
        }
    }
}

fn build_buffer(fbb: &mut FlatBufferBuilder<'_>, data: &[u8]) -> Offset {
    let data = (!data.is_empty()).then(|| fbb.create_vector(data));
    let start = fbb.start_table();
    if let Some(data) = data {
        fbb.push_slot_always(vt::buffer::DATA, data);
    }
    fbb.end_table(start)
}

fn build_quantization(fbb: &mut FlatBufferBuilder<'_>, def: &QuantizationDef) -> Offset {
    let min = (!def.min.is_empty()).then(|| fbb.create_vector(&def.min[..]));
    let max = (!def.max.is_empty()).then(|| fbb.create_vector(&def.max[..]));
    let scale = (!def.scale.is_empty()).then(|| fbb.create_vector(&def.scale[..]));
    let zero_point = (!def.zero_point.is_empty()).then(|| fbb.create_vector(&def.zero_point[..]));
    let start = fbb.start_table();
    if let Some(min) = min {
        fbb.push_slot_always(vt::quantization::MIN, min);
    }
    if let Some(max) = max {
        fbb.push_slot_always(vt::quantization::MAX, max);
    }
    if let Some(scale) = scale {
        fbb.push_slot_always(vt::quantization::SCALE, scale);
    }
    if let Some(zero_point) = zero_point {
        fbb.push_slot_always(vt::quantization::ZERO_POINT, zero_point);
    }
    fbb.end_table(start)
}

fn build_tensor(fbb: &mut FlatBufferBuilder<'_>, def: &TensorDef, buffer: u32) -> Offset {
    let shape = fbb.create_vector(&def.shape[..]);
    let name = fbb.create_string(&def.name);
    let quantization = def.quantization.as_ref().map(|q| build_quantization(fbb, q));
    let start = fbb.start_table();
    fbb.push_slot_always(vt::tensor::SHAPE, shape);
    fbb.push_slot_always::<i8>(vt::tensor::TYPE, def.type_code);
    fbb.push_slot_always::<u32>(vt::tensor::BUFFER, buffer);
    fbb.push_slot_always(vt::tensor::NAME, name);
    if let Some(quantization) = quantization {
        fbb.push_slot_always(vt::tensor::QUANTIZATION, quantization);
    }
    fbb.end_table(start)
}

fn build_options(fbb: &mut FlatBufferBuilder<'_>, def: &OptionsDef) -> Offset {
    let vectors: Vec<_> = def
        .fields
        .iter()
        .map(|field| match field {
            OptionValue::Int32Vector(values) => Some(fbb.create_vector(&values[..])),
            _ => None,
        })
        .collect();
    let start = fbb.start_table();
    for (index, (field, vector)) in def.fields.iter().zip(vectors).enumerate() {
        let slot = 4 + 2 * index as u16;
        match field {
            OptionValue::Absent => {}
            OptionValue::Bool(v) => fbb.push_slot_always::<bool>(slot, *v),
            OptionValue::Int8(v) => fbb.push_slot_always::<i8>(slot, *v),
            OptionValue::Int32(v) => fbb.push_slot_always::<i32>(slot, *v),
            OptionValue::Float32(v) => fbb.push_slot_always::<f32>(slot, *v),
            OptionValue::Int32Vector(_) => {
                if let Some(vector) = vector {
                    fbb.push_slot_always(slot, vector);
                }
            }
        }
    }
    fbb.end_table(start)
}

fn build_operator(fbb: &mut FlatBufferBuilder<'_>, def: &OperatorDef) -> Offset {
    let inputs = fbb.create_vector(&def.inputs[..]);
    let outputs = fbb.create_vector(&def.outputs[..]);
    let options = def
        .options
        .as_ref()
        .map(|options| (options.union_type, build_options(fbb, options)));
    let start = fbb.start_table();
    fbb.push_slot_always::<u32>(vt::operator::OPCODE_INDEX, def.opcode_index);
    fbb.push_slot_always(vt::operator::INPUTS, inputs);
    fbb.push_slot_always(vt::operator::OUTPUTS, outputs);
    if let Some((union_type, table)) = options {
        fbb.push_slot_always::<u8>(vt::operator::BUILTIN_OPTIONS_TYPE, union_type);
        fbb.push_slot_always(vt::operator::BUILTIN_OPTIONS, table);
    }
    fbb.end_table(start)
}

fn build_operator_code(fbb: &mut FlatBufferBuilder<'_>, def: &OperatorCodeDef) -> Offset {
    match def {
        OperatorCodeDef::Builtin(code) => {
            let start = fbb.start_table();
            fbb.push_slot_always::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, (*code).min(127) as i8);
            fbb.push_slot_always::<i32>(vt::operator_code::VERSION, 1);
            fbb.push_slot_always::<i32>(vt::operator_code::BUILTIN_CODE, *code);
            fbb.end_table(start)
        }
        OperatorCodeDef::Legacy(code) => {
            let start = fbb.start_table();
            fbb.push_slot_always::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, *code);
            fbb.end_table(start)
        }
        OperatorCodeDef::Custom(name) => {
            let name = fbb.create_string(name);
            let start = fbb.start_table();
            fbb.push_slot_always::<i8>(vt::operator_code::DEPRECATED_BUILTIN_CODE, 32);
            fbb.push_slot_always(vt::operator_code::CUSTOM_CODE, name);
            fbb.push_slot_always::<i32>(vt::operator_code::BUILTIN_CODE, 32);
            fbb.end_table(start)
        }
    }
}

/// Serializes a model. Every tensor with data gets its own buffer; buffer 0
/// is the empty sentinel.
pub fn build_model(def: &ModelDef) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();

    let mut buffers = vec![build_buffer(&mut fbb, &[])];
    let mut subgraphs = Vec::new();
    for subgraph in &def.subgraphs {
        let mut tensors = Vec::new();
        for tensor in &subgraph.tensors {
            let buffer = if tensor.data.is_empty() {
                0
            } else {
                buffers.push(build_buffer(&mut fbb, &tensor.data));
                buffers.len() - 1
            };
            tensors.push(build_tensor(&mut fbb, tensor, buffer as u32));
        }
        let operators: Vec<_> = subgraph
            .operators
            .iter()
            .map(|operator| build_operator(&mut fbb, operator))
            .collect();

        let tensors = fbb.create_vector(&tensors);
        let inputs = fbb.create_vector(&subgraph.inputs[..]);
        let outputs = fbb.create_vector(&subgraph.outputs[..]);
        let operators = fbb.create_vector(&operators);
        let name = subgraph.name.as_deref().map(|name| fbb.create_string(name));
        let start = fbb.start_table();
        fbb.push_slot_always(vt::sub_graph::TENSORS, tensors);
        fbb.push_slot_always(vt::sub_graph::INPUTS, inputs);
        fbb.push_slot_always(vt::sub_graph::OUTPUTS, outputs);
        fbb.push_slot_always(vt::sub_graph::OPERATORS, operators);
        if let Some(name) = name {
            fbb.push_slot_always(vt::sub_graph::NAME, name);
        }
        subgraphs.push(fbb.end_table(start));
    }

    let operator_codes: Vec<_> = def
        .operator_codes
        .iter()
        .map(|code| build_operator_code(&mut fbb, code))
        .collect();
    let operator_codes = fbb.create_vector(&operator_codes);
    let subgraphs = fbb.create_vector(&subgraphs);
    let buffers = fbb.create_vector(&buffers);
    let description = def.description.as_deref().map(|text| fbb.create_string(text));

    let start = fbb.start_table();
    fbb.push_slot_always::<u32>(vt::model::VERSION, def.version);
    fbb.push_slot_always(vt::model::OPERATOR_CODES, operator_codes);
    fbb.push_slot_always(vt::model::SUBGRAPHS, subgraphs);
    if let Some(description) = description {
        fbb.push_slot_always(vt::model::DESCRIPTION, description);
    }
    fbb.push_slot_always(vt::model::BUFFERS, buffers);
    let root = fbb.end_table(start);
    fbb.finish(root, Some("TFL3"));
    fbb.finished_data().to_vec()
}

/// Writes a serialized model to a temporary `.tflite` file.
pub fn write_model(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".tflite")
        .tempfile()
        .unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// One subgraph, one operator consuming a constant and a runtime tensor.
pub fn single_op_model(builtin_code: i32, operator: OperatorDef) -> ModelDef {
    ModelDef {
        operator_codes: vec![OperatorCodeDef::Builtin(builtin_code)],
        subgraphs: vec![SubGraphDef {
            name: None,
            tensors: vec![
                TensorDef::new("weights", 0, &[2]).with_data(super::data_generators::f32_bytes(&[1.5, -2.0])),
                TensorDef::new("input", 2, &[1, 3]),
            ],
            inputs: vec![1],
            outputs: vec![],
            operators: vec![operator],
        }],
        ..ModelDef::default()
    }
}

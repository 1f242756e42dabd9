//! Subgraphs.
//!
//! A [`Graph`] owns one [`Connection`] per tensor of its subgraph, in tensor
//! order, so a tensor index is also the connection's key. Nodes and graph
//! inputs/outputs refer to connections by that key.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::flatbuffer::Tables;
use crate::metadata::OperatorCatalog;
use crate::node::{Argument, Node};
use crate::schema::{BufferRecord, OperatorRecord, QuantizationRecord, SubGraphRecord, TensorRecord};
use crate::tensor::{Initializer, TensorType};

#[derive(Debug, Clone)]
enum Source {
    Type(TensorType),
    Initializer(Initializer),
}

/// One tensor slot of a graph.
#[derive(Debug, Clone)]
pub struct Connection {
    id: String,
    source: Source,
    quantization: Option<String>,
}

impl Connection {
    /// Declared tensor name, or the tensor index when the name is empty.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tensor_type(&self) -> &TensorType {
        match &self.source {
            Source::Type(tensor_type) => tensor_type,
            Source::Initializer(initializer) => initializer.tensor_type(),
        }
    }

    pub fn initializer(&self) -> Option<&Initializer> {
        match &self.source {
            Source::Initializer(initializer) => Some(initializer),
            Source::Type(_) => None,
        }
    }

    /// Human-readable quantization, e.g. `0 ≤ 0.5 * (q - 3) ≤ 6`.
    pub fn quantization(&self) -> Option<&str> {
        self.quantization.as_deref()
    }
}

/// Renders single-element quantization parameters. `None` when nothing
/// beyond the bare `q` would be shown.
fn quantization_expression(record: &QuantizationRecord<'_>) -> Result<Option<String>, Error> {
    let scale = record.scale()?;
    let zero_point = record.zero_point()?;
    let min = record.min()?;
    let max = record.max()?;
    let scale = if scale.len() == 1 { scale.get(0).unwrap_or(0.0) } else { 0.0 };
    let zero_point = if zero_point.len() == 1 { zero_point.get(0).unwrap_or(0) } else { 0 };

    let mut value = match (scale != 0.0 || zero_point != 0, zero_point) {
        (false, _) => String::from("q"),
        (true, 0) => format!("{} * q", scale),
        (true, zero_point) => format!("{} * (q - {})", scale, zero_point),
    };
    if let (1, Some(min)) = (min.len(), min.get(0)) {
        value = format!("{} \u{2264} {}", min, value);
    }
    if let (1, Some(max)) = (max.len(), max.get(0)) {
        value = format!("{} \u{2264} {}", value, max);
    }
    Ok((value != "q").then_some(value))
}

#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    inputs: Vec<Argument>,
    outputs: Vec<Argument>,
    connections: Vec<Connection>,
    operators: BTreeMap<String, usize>,
}

impl Graph {
    /// Builds one subgraph. `operators` is the model's resolved operator
    /// code table and `buffers` its buffer list.
    pub(crate) fn new(
        record: &SubGraphRecord<'_>,
        fallback_name: String,
        operators: &[String],
        buffers: &Tables<'_>,
        catalog: &OperatorCatalog,
    ) -> Result<Self, Error> {
        let name = match record.name()? {
            Some(name) if !name.is_empty() => name.into_owned(),
            _ => fallback_name,
        };

        let tensors = record.tensors()?;
        let mut connections = Vec::with_capacity(tensors.len());
        for (index, table) in tensors.iter().enumerate() {
            let tensor = TensorRecord::from(table?);
            connections.push(Self::connection_from(index, &tensor, buffers)?);
        }

        let mut nodes = Vec::new();
        let mut counts = BTreeMap::new();
        for table in record.operators()?.iter() {
            let operator = OperatorRecord::from(table?);
            let opcode_index = operator.opcode_index()? as usize;
            let operator_name = match operators.get(opcode_index) {
                Some(name) => name.clone(),
                None => {
                    tracing::warn!("operator code index {} out of range", opcode_index);
                    format!("({})", opcode_index)
                }
            };
            let node = Node::new(&operator, operator_name, connections.len(), catalog)?;
            *counts.entry(node.operator().to_string()).or_insert(0) += 1;
            nodes.push(node);
        }

        let inputs = Self::arguments(record.inputs()?.iter(), &connections);
        let outputs = Self::arguments(record.outputs()?.iter(), &connections);

        tracing::debug!(
            "graph '{}': {} tensors, {} nodes, {} inputs, {} outputs",
            name,
            connections.len(),
            nodes.len(),
            inputs.len(),
            outputs.len()
        );

        Ok(Self {
            name,
            nodes,
            inputs,
            outputs,
            connections,
            operators: counts,
        })
    }

    fn connection_from(
        index: usize,
        tensor: &TensorRecord<'_>,
        buffers: &Tables<'_>,
    ) -> Result<Connection, Error> {
        let tensor_type = TensorType::from_record(tensor)?;
        let name = tensor.name()?.filter(|name| !name.is_empty());
        let id = name.as_deref().map(str::to_string).unwrap_or_else(|| index.to_string());

        let buffer = tensor.buffer()? as usize;
        let data = if buffer < buffers.len() {
            BufferRecord::from(buffers.get(buffer)?).data()?
        } else {
            tracing::warn!("tensor '{}' references missing buffer {}", id, buffer);
            &[]
        };
        let source = match Initializer::new(index, name.as_deref().map(str::to_string), tensor_type.clone(), data) {
            Some(initializer) => Source::Initializer(initializer),
            None => Source::Type(tensor_type),
        };

        let quantization = match tensor.quantization()? {
            Some(record) => quantization_expression(&record)?,
            None => None,
        };

        Ok(Connection {
            id,
            source,
            quantization,
        })
    }

    /// Graph inputs and outputs: one argument per tensor, named after it.
    fn arguments(ids: impl Iterator<Item = i32>, connections: &[Connection]) -> Vec<Argument> {
        ids.filter_map(|id| match usize::try_from(id) {
            Ok(key) if key < connections.len() => {
                Some(Argument::new(connections[key].id.clone(), true, vec![key]))
            }
            _ => {
                tracing::warn!("graph references missing tensor {}", id);
                None
            }
        })
        .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[Argument] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Argument] {
        &self.outputs
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, key: usize) -> Option<&Connection> {
        self.connections.get(key)
    }

    /// The connections an argument of this graph refers to.
    pub fn resolve<'g>(&'g self, argument: &'g Argument) -> impl Iterator<Item = &'g Connection> + 'g {
        argument
            .connections()
            .iter()
            .filter_map(move |&key| self.connections.get(key))
    }

    /// Number of nodes per operator name.
    pub fn operators(&self) -> &BTreeMap<String, usize> {
        &self.operators
    }
}

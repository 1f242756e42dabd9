//! Operator nodes.
//!
//! A [`Node`] binds an operator's positional input and output tensor lists
//! to the names its catalog schema declares, and turns the operator's
//! builtin options into [`Attribute`]s.

use std::fmt;

use serde_json::Value;

use crate::error::Error;
use crate::metadata::OperatorCatalog;
use crate::options;
use crate::schema::{self, OperatorRecord};

/// A named group of connections feeding into or out of a node.
///
/// Connections are keys into the owning graph's connection list; see
/// [`Graph::resolve`](crate::Graph::resolve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    name: String,
    visible: bool,
    connections: Vec<usize>,
}

impl Argument {
    pub fn new(name: String, visible: bool, connections: Vec<usize>) -> Self {
        Self {
            name,
            visible,
            connections,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn connections(&self) -> &[usize] {
        &self.connections
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Str(String),
    List(Vec<i64>),
}

impl AttributeValue {
    /// Compares against a catalog default, by type.
    pub fn matches_default(&self, default: &Value) -> bool {
        match self {
            AttributeValue::Bool(v) => default.as_bool() == Some(*v),
            AttributeValue::Int(v) => default.as_f64() == Some(*v as f64),
            AttributeValue::Float(v) => default.as_f64().is_some_and(|d| d as f32 == *v),
            AttributeValue::Str(v) => default.as_str() == Some(v.as_str()),
            AttributeValue::List(items) => match default {
                Value::Array(defaults) => {
                    defaults.len() == items.len()
                        && defaults
                            .iter()
                            .zip(items)
                            .all(|(d, v)| d.as_i64() == Some(*v))
                }
                Value::String(text) => *text == self.to_string(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Str(v) => f.write_str(v),
            AttributeValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    value: AttributeValue,
    type_name: Option<String>,
    visible: bool,
}

impl Attribute {
    /// Builds an attribute from a raw options field.
    ///
    /// Returns `None` when the catalog hides the field. Enum-typed values are
    /// replaced by their member name, and a value equal to the catalog
    /// default is kept but marked invisible.
    pub fn new(
        catalog: &OperatorCatalog,
        operator: &str,
        field: &str,
        value: AttributeValue,
    ) -> Option<Self> {
        let name = snake_case(field);
        let mut value = value;
        let mut type_name = None;
        let mut visible = true;
        if let Some(schema) = catalog.attribute_schema(operator, &name) {
            if schema.visible == Some(false) {
                return None;
            }
            if let Some(declared) = &schema.type_name {
                if let AttributeValue::Int(raw) = value {
                    if let Some(member) = schema::enum_name(declared, raw) {
                        value = AttributeValue::Str(member.to_string());
                    }
                }
                type_name = Some(declared.clone());
            }
            if let Some(default) = &schema.default {
                visible = !value.matches_default(default);
            }
        }
        Some(Self {
            name,
            value,
            type_name,
            visible,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }
}

/// Converts a camelCase field name to snake_case.
pub fn snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            result.push('_');
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

#[derive(Debug, Clone)]
pub struct Node {
    operator: String,
    inputs: Vec<Argument>,
    outputs: Vec<Argument>,
    attributes: Vec<Attribute>,
}

impl Node {
    /// Maps one operator record. `connection_count` bounds the tensor
    /// indices its arguments may reference.
    pub(crate) fn new(
        record: &OperatorRecord<'_>,
        operator: String,
        connection_count: usize,
        catalog: &OperatorCatalog,
    ) -> Result<Self, Error> {
        let in_range = |id: &usize| {
            if *id < connection_count {
                return true;
            }
            tracing::warn!("operator '{}' references missing tensor {}", operator, id);
            false
        };

        let raw_inputs: Vec<i32> = record.inputs()?.iter().collect();
        let inputs = catalog
            .inputs(&raw_inputs, &operator)
            .into_iter()
            .map(|binding| {
                let connections = binding.connections.into_iter().filter(in_range).collect();
                Argument::new(binding.name, binding.visible, connections)
            })
            .collect();

        let outputs = record
            .outputs()?
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let connections = usize::try_from(id).ok().filter(in_range).into_iter().collect();
                Argument::new(catalog.output_name(&operator, index), true, connections)
            })
            .collect();

        let mut attributes = Vec::new();
        if let Some(table) = options::for_operator(&operator) {
            let fields = table.read(record.builtin_options_type()?, record.builtin_options()?)?;
            attributes.extend(
                fields
                    .into_iter()
                    .filter_map(|(field, value)| Attribute::new(catalog, &operator, field, value)),
            );
        }

        Ok(Self {
            operator,
            inputs,
            outputs,
            attributes,
        })
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn inputs(&self) -> &[Argument] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Argument] {
        &self.outputs
    }

    /// Attributes that differ from their catalog default.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|attribute| attribute.visible)
    }

    /// Every attribute, including those hidden for holding their default.
    pub fn all_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn category<'c>(&self, catalog: &'c OperatorCatalog) -> Option<&'c str> {
        catalog.schema(&self.operator)?.category.as_deref()
    }
}

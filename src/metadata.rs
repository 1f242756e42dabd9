//! Operator metadata catalog.
//!
//! A read-only table of per-operator schemas (named inputs and outputs,
//! attribute types, defaults and visibility) loaded from a JSON document of
//! `{ "name": ..., "schema": { ... } }` records. The catalog is built once by
//! the caller and shared by reference; it is never mutated after loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// The catalog bundled with the crate.
const BUILTIN_METADATA: &str = include_str!("tflite-metadata.json");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatorSchema {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub inputs: Vec<ArgumentSchema>,
    #[serde(default)]
    pub outputs: Vec<ArgumentSchema>,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArgumentSchema {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ArgumentSchema {
    pub fn is_variadic(&self) -> bool {
        self.option.as_deref() == Some("variadic")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One named input argument produced by [`OperatorCatalog::inputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    pub name: String,
    pub visible: bool,
    /// Tensor indices, with "no connection" sentinels removed.
    pub connections: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorCatalog {
    schemas: BTreeMap<String, OperatorSchema>,
    attributes: BTreeMap<String, BTreeMap<String, AttributeSchema>>,
}

impl OperatorCatalog {
    /// Parses a catalog document. Entries without a name or with a malformed
    /// schema are skipped; only a document that is not a JSON array fails.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let items: Vec<Value> = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        for item in &items {
            let name = match item.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    tracing::warn!("skipping metadata entry without a name");
                    continue;
                }
            };
            let Some(schema) = item.get("schema") else {
                tracing::warn!("skipping metadata entry '{}' without a schema", name);
                continue;
            };
            match OperatorSchema::deserialize(schema) {
                Ok(schema) => catalog.insert(name, schema),
                Err(e) => tracing::warn!("skipping malformed metadata entry '{}': {}", name, e),
            }
        }
        tracing::debug!("loaded metadata for {} operators", catalog.len());
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The catalog bundled with the crate, covering common builtin operators.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_METADATA).unwrap_or_default()
    }

    fn insert(&mut self, name: &str, schema: OperatorSchema) {
        let attributes = schema
            .attributes
            .iter()
            .map(|attribute| (attribute.name.clone(), attribute.clone()))
            .collect();
        self.attributes.insert(name.to_string(), attributes);
        self.schemas.insert(name.to_string(), schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn schema(&self, operator: &str) -> Option<&OperatorSchema> {
        self.schemas.get(operator)
    }

    /// Groups a node's positional input indices into named arguments.
    ///
    /// A variadic schema slot takes every remaining index. Negative indices
    /// mark an absent optional input and are dropped from the argument.
    /// Slots past the schema fall back to a positional `(index)` name.
    pub fn inputs(&self, inputs: &[i32], operator: &str) -> Vec<InputBinding> {
        let declared = self
            .schema(operator)
            .map(|schema| schema.inputs.as_slice())
            .unwrap_or_default();
        let mut results = Vec::new();
        let mut index = 0;
        while index < inputs.len() {
            let mut count = 1;
            let mut name = None;
            let mut visible = true;
            if let Some(input) = declared.get(index) {
                name = input.name.clone();
                if input.is_variadic() {
                    count = inputs.len() - index;
                }
                if input.visible == Some(false) {
                    visible = false;
                }
            }
            let connections = inputs[index..index + count]
                .iter()
                .filter_map(|&id| usize::try_from(id).ok())
                .collect();
            results.push(InputBinding {
                name: name.unwrap_or_else(|| format!("({})", index)),
                visible,
                connections,
            });
            index += count;
        }
        results
    }

    /// Schema name of an output slot, or `(index)` when it is undeclared or variadic.
    pub fn output_name(&self, operator: &str, index: usize) -> String {
        self.schema(operator)
            .and_then(|schema| schema.outputs.get(index))
            .filter(|output| !output.is_variadic())
            .and_then(|output| output.name.clone())
            .unwrap_or_else(|| format!("({})", index))
    }

    pub fn attribute_schema(&self, operator: &str, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(operator)?.get(name)
    }
}

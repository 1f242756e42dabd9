//! TFLite model loading.

use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use memmap2::MmapOptions;

use crate::error::Error;
use crate::flatbuffer::buffer_has_identifier;
use crate::graph::Graph;
use crate::metadata::OperatorCatalog;
use crate::schema::{self, ModelRecord, OperatorCodeRecord, SubGraphRecord, CUSTOM_OPERATOR, FILE_IDENTIFIER};

/// File extensions recognized as TFLite models.
const EXTENSIONS: &[&str] = &["tflite", "lite"];

/// Returns true if `path` carries a TFLite model extension.
pub fn matches_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// A decoded TFLite model: its version label, description and subgraphs.
#[derive(Debug, Clone)]
pub struct Model {
    format: String,
    description: Option<String>,
    graphs: Vec<Graph>,
}

impl Model {
    /// Decodes a model from an in-memory buffer.
    pub fn new(buffer: &[u8], catalog: &OperatorCatalog) -> Result<Self, Error> {
        Self::from_bytes(buffer, "buffer", catalog)
    }

    /// Memory-maps and decodes a model file.
    pub fn open(path: impl AsRef<Path>, catalog: &OperatorCatalog) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // The file must not be truncated or rewritten while mapped.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(&mmap, &source_name, catalog)
    }

    /// Decodes a model, naming `source_name` in identifier errors.
    pub fn from_bytes(buffer: &[u8], source_name: &str, catalog: &OperatorCatalog) -> Result<Self, Error> {
        if !buffer_has_identifier(buffer, FILE_IDENTIFIER) {
            let found = buffer
                .get(4..buffer.len().min(8))
                .unwrap_or_default()
                .iter()
                .filter(|&&b| (32..=127).contains(&b))
                .map(|&b| b as char)
                .collect();
            return Err(Error::InvalidIdentifier {
                found,
                source_name: source_name.to_string(),
            });
        }

        let record = ModelRecord::root(buffer)?;
        let format = format!("version {}", record.version()?);
        let description = record
            .description()?
            .filter(|text| !text.is_empty())
            .map(Cow::into_owned);

        let mut operators = Vec::new();
        for table in record.operator_codes()?.iter() {
            operators.push(operator_name(&OperatorCodeRecord::from(table?))?);
        }

        let buffers = record.buffers()?;
        let subgraphs = record.subgraphs()?;
        let mut graphs = Vec::with_capacity(subgraphs.len());
        for (index, table) in subgraphs.iter().enumerate() {
            let fallback_name = if subgraphs.len() > 1 {
                format!("({})", index)
            } else {
                String::new()
            };
            let subgraph = SubGraphRecord::from(table?);
            graphs.push(Graph::new(&subgraph, fallback_name, &operators, &buffers, catalog)?);
        }

        tracing::debug!(
            "loaded {} model '{}': {} operator codes, {} graphs",
            format,
            source_name,
            operators.len(),
            graphs.len()
        );

        Ok(Self {
            format,
            description,
            graphs,
        })
    }

    /// Format label, `version <n>`.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }
}

/// Resolves one operator code table entry to a display name.
fn operator_name(code: &OperatorCodeRecord<'_>) -> Result<String, Error> {
    let builtin = code.builtin_code()?;
    if builtin == CUSTOM_OPERATOR {
        return Ok(code
            .custom_code()?
            .filter(|name| !name.is_empty())
            .map_or_else(|| "Custom".to_string(), Cow::into_owned));
    }
    Ok(schema::builtin_operator_name(builtin).unwrap_or_else(|| {
        tracing::warn!("unknown builtin operator code {}", builtin);
        format!("({})", builtin)
    }))
}

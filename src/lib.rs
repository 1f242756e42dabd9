//! TensorFlow Lite model graph decoder.
//!
//! Decodes a `.tflite` FlatBuffers container into a read-only graph of
//! named tensors, operator nodes and attributes, labeled from an operator
//! metadata catalog.
//!
//! ```no_run
//! use tflite_graph::{Model, OperatorCatalog};
//!
//! let catalog = OperatorCatalog::builtin();
//! let model = Model::open("mobilenet.tflite", &catalog)?;
//! for graph in model.graphs() {
//!     for node in graph.nodes() {
//!         println!("{} ({} inputs)", node.operator(), node.inputs().len());
//!     }
//! }
//! # Ok::<(), tflite_graph::Error>(())
//! ```

pub mod error;
pub mod flatbuffer;
pub mod graph;
pub mod metadata;
pub mod model;
pub mod node;
pub mod options;
pub mod schema;
pub mod tensor;

pub use error::Error;
pub use graph::{Connection, Graph};
pub use metadata::OperatorCatalog;
pub use model::{matches_extension, Model};
pub use node::{Argument, Attribute, AttributeValue, Node};
pub use tensor::{
    decode, DataType, Initializer, Shape, TensorState, TensorType, TensorValue, PREVIEW_LIMIT,
    VALUE_LIMIT,
};

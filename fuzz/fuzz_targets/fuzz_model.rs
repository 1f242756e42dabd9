#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tflite_graph::{Model, OperatorCatalog, PREVIEW_LIMIT};

static CATALOG: OnceLock<OperatorCatalog> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let catalog = CATALOG.get_or_init(OperatorCatalog::builtin);
    let model = match Model::new(data, catalog) {
        Ok(m) => m,
        Err(_) => return,
    };

    for graph in model.graphs() {
        for connection in graph.connections() {
            if let Some(initializer) = connection.initializer() {
                let _ = initializer.value_with_limit(PREVIEW_LIMIT);
            }
        }
        for node in graph.nodes() {
            for argument in node.inputs() {
                let _ = graph.resolve(argument).count();
            }
        }
    }
});

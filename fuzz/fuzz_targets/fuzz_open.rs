#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tflite_graph::{Model, OperatorCatalog};

fuzz_target!(|data: &[u8]| {
    let mut tmp = tempfile::Builder::new()
        .suffix(".tflite")
        .tempfile()
        .unwrap();
    tmp.write_all(data).unwrap();

    let model = match Model::open(tmp.path(), &OperatorCatalog::default()) {
        Ok(m) => m,
        Err(_) => return,
    };

    for graph in model.graphs() {
        for connection in graph.connections() {
            let _ = connection.initializer().map(|i| i.to_string());
        }
    }
});

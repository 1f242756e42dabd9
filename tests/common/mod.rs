pub mod data_generators;
pub mod tflite_builder;

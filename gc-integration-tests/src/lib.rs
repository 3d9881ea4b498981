//! Test-only utilities: a plaintext circuit oracle used to check the real
//! garbler/evaluator session against ground truth.

pub mod plain_evaluator;

//! Performance diagnostics, compiled with the `bench` feature.

pub mod bench;

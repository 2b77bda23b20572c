//! Inspection tooling

pub mod treeviz;

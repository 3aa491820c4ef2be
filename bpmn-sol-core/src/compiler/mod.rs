//! The compiler proper: graph model, XML ingestion, structural
//! verification, semantic indexing, identifier planning, and emission.

pub mod emit;
pub mod indices;
pub mod ir;
pub mod names;
pub mod parser;
pub mod verifier;

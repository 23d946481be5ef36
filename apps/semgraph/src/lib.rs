//! # semgraph
//!
//! Library half of the inspection CLI, so the command layer can be driven
//! from tests without spawning the binary.

pub mod cli;

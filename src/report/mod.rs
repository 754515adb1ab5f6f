//! Report rendering for the command line.

pub mod generator;

pub use generator::*;

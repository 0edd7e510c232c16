//! # Dataset Module
//!
//! - `corpus` - TrainingCorpus, the flat `[n, T, F]` / `[n, K]` store
//! - `assembler` - DatasetAssembler (per match, then across matches)

pub mod assembler;
pub mod corpus;

pub use assembler::DatasetAssembler;
pub use corpus::{TrainingCorpus, WindowOrigin};

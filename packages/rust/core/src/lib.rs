//! Build pipeline: fragment store → assembler → artifact builder → batch orchestrator.

pub mod assembler;
pub mod builder;
pub mod check;
pub mod fragments;
pub mod pipeline;

pub use assembler::{AssembledDocument, SEPARATOR, assemble};
pub use builder::{ArtifactBuilder, BuildStage};
pub use check::{CheckEntry, CheckReport, check_manifest};
pub use fragments::FragmentStore;
pub use pipeline::{ProgressReporter, SilentProgress, run_all};

#[cfg(test)]
pub(crate) mod testing;

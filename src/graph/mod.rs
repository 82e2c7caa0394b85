//! Graph-aware workspace analysis
//!
//! Own domain types end to end: target identities, a petgraph-backed dependency
//! graph, the merged workspace model and the attribution/propagation passes.

pub mod affected;
pub mod attribution;
pub mod changeset;
pub mod dependency_graph;
pub mod target;
pub mod workspace_model;

pub use affected::{AffectedAnalysis, AffectedTarget, Cause, PropagationMode};
pub use changeset::Changeset;
pub use target::{TargetIdentity, TargetKind};
pub use workspace_model::WorkspaceModel;

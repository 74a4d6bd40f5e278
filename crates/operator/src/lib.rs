//! Deployment operators
//!
//! An operator is a deployment target (a cloud platform, a cluster) exposing
//! a leaf schema for its spec fields and the ability to turn a validated spec
//! plus a bento into a deployable. Operators are looked up by name in an
//! explicit [`OperatorRegistry`].

pub mod local;
pub mod manifest;
pub mod registry;
pub mod traits;

pub use local::ManifestOperator;
pub use manifest::{OperatorList, OperatorManifest};
pub use registry::{local_registry, OperatorEntry, OperatorRegistry};
pub use traits::Operator;

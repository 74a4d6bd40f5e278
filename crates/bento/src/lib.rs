//! Bento lookup
//!
//! Resolves the `spec.bento` value of a deployment config, either a path to
//! a built bento directory or a tag looked up in a bento store, to a local
//! directory that is known to contain a bento descriptor.

pub mod resolver;
pub mod store;

pub use resolver::get_bento_path;
pub use store::{BentoStore, BentoTag, LocalBentoStore};

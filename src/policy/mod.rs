/*!
 * Policy Module
 * Pure decisions the capability layer consults before touching the host tree
 */

pub mod creation;
pub mod namer;

pub use creation::{allowed, normalize_kind, CreationPolicy};
pub use namer::{rewrite, ResourceNamer};

/*!
 * Core Module
 * Shared identifiers, limits, configuration and error types
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;

// Re-export for convenience
pub use config::MediatorConfig;
pub use errors::*;
pub use id::{NodeId, SessionId};

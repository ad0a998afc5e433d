/*!
 * Host Tree
 * The host-owned node tree that capabilities delegate to
 *
 * The renderer is an external collaborator; this model is the minimal tree
 * the mediation layer mutates and the renderer observes.
 */

pub mod document;
pub mod node;

pub use document::HostTree;
pub use node::{EventKind, EventListener, NodeKind, NodeSnapshot};

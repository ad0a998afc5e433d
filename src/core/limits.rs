/*!
 * Mediation Limits and Constants
 *
 * Centralized location for the defaults the mediation layer falls back to
 * when no configuration overrides them.
 *
 * - Security-critical constants are marked with [SECURITY]
 */

use std::time::Duration;

// =============================================================================
// NAMESPACING
// =============================================================================

/// Root under which every plugin-requested resource is served
/// [SECURITY] `src` assignments are always rewritten beneath this root
pub const DEFAULT_STATIC_ROOT: &str = "/static";

/// Root under which outbound plugin requests are routed
pub const DEFAULT_REQUEST_ROOT: &str = "/ajax";

/// Request route used to fill placeholder containers
pub const DEFAULT_PLACEHOLDER_ROUTE: &str = "fill_placeholder";

/// Class attribute given to placeholder containers
pub const PLACEHOLDER_CLASS: &str = "placeholder";

// =============================================================================
// CREATION POLICY
// =============================================================================

/// Node kinds no plugin may create
/// [SECURITY] Both open new script-execution or document-loading surfaces
pub const DEFAULT_DENIED_KINDS: [&str; 2] = ["script", "iframe"];

// =============================================================================
// EVENT HANDLERS
// =============================================================================

/// Maximum accepted handler source length (64KB)
pub const MAX_HANDLER_SOURCE: usize = 64 * 1024;

/// Deepest statement or expression nesting a script may have
/// [SECURITY] Bounds parser and interpreter recursion regardless of source size
pub const MAX_SCRIPT_NESTING: usize = 128;

/// Handler invocations slower than this are reported
pub const SLOW_HANDLER_THRESHOLD: Duration = Duration::from_millis(10);

// =============================================================================
// REQUESTS
// =============================================================================

/// Outbound request timeout (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// AUDIT
// =============================================================================

/// Maximum audit events kept in memory
pub const MAX_AUDIT_EVENTS: usize = 10_000;

/// Maximum audit events kept per plugin
pub const MAX_AUDIT_EVENTS_PER_PLUGIN: usize = 1_000;

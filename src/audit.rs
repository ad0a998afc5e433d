/*!
 * Mediation Audit Trail
 * Tracks denials and contained failures per plugin for security monitoring
 */

use crate::core::errors::SandboxError;
use crate::core::limits::{MAX_AUDIT_EVENTS, MAX_AUDIT_EVENTS_PER_PLUGIN};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::collections::VecDeque;
use std::time::SystemTime;

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

/// What the mediation layer refused or contained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditKind {
    ForbiddenNodeKind { kind: String },
    ReadOnlyProperty { property: String },
    UnknownProperty { property: String },
    CompilationFailure { event: String, reason: String },
    HandlerFailure { event: String, reason: String },
    RequestFailure { path: String, reason: String },
}

impl AuditKind {
    /// Denials are refused capability uses; failures are contained errors
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AuditKind::ForbiddenNodeKind { .. }
                | AuditKind::ReadOnlyProperty { .. }
                | AuditKind::UnknownProperty { .. }
        )
    }

    fn severity(&self) -> AuditSeverity {
        match self {
            // Attempts to inject executable content
            AuditKind::ForbiddenNodeKind { .. } => AuditSeverity::Critical,
            AuditKind::ReadOnlyProperty { .. } | AuditKind::UnknownProperty { .. } => {
                AuditSeverity::Warning
            }
            _ => AuditSeverity::Info,
        }
    }

    /// Map a mediation error onto an audit kind, if it is one worth recording
    pub fn from_error(error: &SandboxError) -> Option<Self> {
        match error {
            SandboxError::ForbiddenNodeKind { kind } => {
                Some(AuditKind::ForbiddenNodeKind { kind: kind.clone() })
            }
            SandboxError::ReadOnlyPropertyViolation { property } => {
                Some(AuditKind::ReadOnlyProperty {
                    property: property.clone(),
                })
            }
            SandboxError::UnknownProperty { property } => Some(AuditKind::UnknownProperty {
                property: property.clone(),
            }),
            SandboxError::CompilationFailure { event, reason } => {
                Some(AuditKind::CompilationFailure {
                    event: event.clone(),
                    reason: reason.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Mediation audit event
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub plugin: String,
    #[serde(flatten)]
    pub kind: AuditKind,
    pub severity: AuditSeverity,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl AuditEvent {
    pub fn new(plugin: &str, kind: AuditKind) -> Self {
        Self {
            plugin: plugin.to_string(),
            severity: kind.severity(),
            kind,
            logged_at: SystemTime::now(),
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Audit logger shared by every session of a host
pub struct MediationAudit {
    /// Global event log (ring buffer)
    events: RwLock<VecDeque<AuditEvent>>,
    capacity: usize,
    /// Per-plugin event logs
    plugin_events: DashMap<String, VecDeque<AuditEvent>, RandomState>,
    denial_counts: DashMap<String, u64, RandomState>,
}

impl MediationAudit {
    pub fn new() -> Self {
        Self::with_capacity(MAX_AUDIT_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(MAX_AUDIT_EVENTS))),
            capacity,
            plugin_events: DashMap::with_hasher(RandomState::new()),
            denial_counts: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        let plugin = event.plugin.clone();
        let is_denial = event.kind.is_denial();

        {
            let mut events = self.events.write();
            if events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(event.clone());
        }

        {
            let mut entry = self
                .plugin_events
                .entry(plugin.clone())
                .or_insert_with(VecDeque::new);
            entry.push_back(event);
            if entry.len() > MAX_AUDIT_EVENTS_PER_PLUGIN {
                entry.pop_front();
            }
        }

        if is_denial {
            self.denial_counts
                .entry(plugin)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
    }

    /// Most recent events first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    pub fn for_plugin(&self, plugin: &str, limit: usize) -> Vec<AuditEvent> {
        match self.plugin_events.get(plugin) {
            Some(entry) => entry.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn denial_count(&self, plugin: &str) -> u64 {
        self.denial_counts.get(plugin).map(|e| *e).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
        self.plugin_events.clear();
        self.denial_counts.clear();
    }
}

impl Default for MediationAudit {
    fn default() -> Self {
        Self::new()
    }
}

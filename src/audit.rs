use std::sync::Arc;

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Attempt,
    Success,
    Fail,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Attempt => "attempt",
            AuditStatus::Success => "success",
            AuditStatus::Fail => "fail",
        }
    }
}

/// AuditRecord
///
/// One audited event. `meta` holds extra name/value pairs; it must never
/// carry passwords, hashes or tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub event: String,
    pub status: AuditStatus,
    pub user_id: Option<String>,
    pub meta: Vec<(String, String)>,
}

impl AuditRecord {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            status: AuditStatus::Attempt,
            user_id: None,
            meta: Vec::new(),
        }
    }

    pub fn success(mut self) -> Self {
        self.status = AuditStatus::Success;
        self
    }

    pub fn fail(mut self) -> Self {
        self.status = AuditStatus::Fail;
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn meta(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.meta.push((name.into(), value.to_string()));
        self
    }
}

/// AuditSink
///
/// Capability injected into the use cases that emit audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

pub type AuditState = Arc<dyn AuditSink>;

/// Writes records as structured events on the `audit` tracing target.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        let meta = record
            .meta
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(
            target: "audit",
            event = %record.event,
            status = record.status.as_str(),
            user_id = record.user_id.as_deref().unwrap_or(""),
            meta = %meta,
            "audit record"
        );
    }
}

//! Ambient operation context
//!
//! Who/what triggered a mutation. The context is threaded explicitly through
//! every call rather than held in process-wide mutable state, so concurrent
//! operations cannot observe each other's actor information.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Caller-supplied context for one logical mutating operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
    /// Identity of the actor who triggered the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    /// Client IP address (IPv4 or IPv6)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Client user agent string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Free-form structured payload for caller-supplied context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,

    /// Correlation identifier shared by every record of one logical
    /// operation; generated per statement when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl AuditContext {
    /// Create an empty context (every field absent)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for fluent construction
    pub fn builder() -> AuditContextBuilder {
        AuditContextBuilder::default()
    }
}

/// Builder for [`AuditContext`]
#[derive(Debug, Clone, Default)]
pub struct AuditContextBuilder {
    context: AuditContext,
}

impl AuditContextBuilder {
    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.context.actor_id = Some(actor_id.into());
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.context.ip_address = Some(ip_address.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.context.user_agent = Some(user_agent.into());
        self
    }

    pub fn metadata(mut self, metadata: JsonValue) -> Self {
        self.context.metadata = Some(metadata);
        self
    }

    pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.context.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn build(self) -> AuditContext {
        self.context
    }
}

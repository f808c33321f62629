//! Channel-specific message templates attached to a campaign.

use serde::{Deserialize, Serialize};

/// Internal numeric key of a template.
pub type TemplateId = i64;

/// Email template: subject line plus structured body components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    /// Internal key.
    pub id: TemplateId,
    /// Subject line, may contain `${{…}}` expressions.
    pub subject: String,
    /// Structured body as authored in the editor.
    pub components: serde_json::Value,
}

/// SMS template: plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsTemplate {
    /// Internal key.
    pub id: TemplateId,
    /// Message text, may contain `${{…}}` expressions.
    pub content: String,
}

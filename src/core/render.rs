//! Per-contact template rendering.
//!
//! Templates embed `${{ … }}` expressions. An expression is a list of
//! alternatives separated by `||`, evaluated left to right:
//!
//! - `contact.<field>` yields the field when it is present and non-empty,
//! - a quoted literal (`'…'` or `"…"`) yields its contents,
//! - a non-zero number yields itself,
//!
//! and the first alternative that yields a value wins. An expression with no
//! match renders as the empty string.

use crate::core::error::AppResult;
use crate::model::{Contact, EmailTemplate, SmsTemplate};

const OPEN: &str = "${{";
const CLOSE: &str = "}}";

/// Subject and serialized body of an email rendered for one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Rendered subject line.
    pub subject: String,
    /// Rendered structured body, serialized as JSON.
    pub body: String,
}

/// Renders templates for a single contact.
pub trait TemplateRenderer: Send + Sync {
    /// Render SMS text.
    fn render_sms(&self, template: &SmsTemplate, contact: &Contact) -> String;

    /// Render subject and body of an email.
    fn render_email(&self, template: &EmailTemplate, contact: &Contact) -> AppResult<RenderedEmail>;
}

/// Renderer that substitutes contact variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariableRenderer;

impl VariableRenderer {
    /// Substitute every expression in `text`, trimming the result.
    pub fn replace_variables(text: &str, contact: &Contact) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(OPEN) {
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find('}') else {
                break;
            };
            // `}` inside an expression is not allowed; the match must close here.
            if !after_open[end..].starts_with(CLOSE) || end == 0 {
                out.push_str(&rest[..start + OPEN.len()]);
                rest = after_open;
                continue;
            }
            out.push_str(&rest[..start]);
            out.push_str(&evaluate(&after_open[..end], contact));
            rest = &after_open[end + CLOSE.len()..];
        }
        out.push_str(rest);
        out.trim().to_owned()
    }

    fn render_value(value: &mut serde_json::Value, contact: &Contact) {
        match value {
            serde_json::Value::String(s) => {
                if s.contains(OPEN) {
                    *s = Self::replace_variables(s, contact);
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::render_value(item, contact);
                }
            }
            serde_json::Value::Object(map) => {
                for item in map.values_mut() {
                    Self::render_value(item, contact);
                }
            }
            _ => {}
        }
    }
}

impl TemplateRenderer for VariableRenderer {
    fn render_sms(&self, template: &SmsTemplate, contact: &Contact) -> String {
        Self::replace_variables(&template.content, contact)
    }

    fn render_email(&self, template: &EmailTemplate, contact: &Contact) -> AppResult<RenderedEmail> {
        let mut components = template.components.clone();
        Self::render_value(&mut components, contact);
        Ok(RenderedEmail {
            subject: Self::replace_variables(&template.subject, contact),
            body: serde_json::to_string(&components)?,
        })
    }
}

fn evaluate(expression: &str, contact: &Contact) -> String {
    for part in expression.trim().split("||").map(str::trim) {
        if let Some(field) = part.strip_prefix("contact.") {
            if let Some(value) = contact.field(field).filter(|v| !v.is_empty()) {
                return value.to_owned();
            }
        } else if let Some(literal) = quoted(part) {
            return literal.to_owned();
        } else if part.parse::<f64>().is_ok_and(|n| n != 0.0 && n.is_finite()) {
            return part.to_owned();
        }
    }
    String::new()
}

fn quoted(part: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        part.strip_prefix(q)
            .map(|inner| inner.strip_suffix(q).unwrap_or(inner))
    })
}

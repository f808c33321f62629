//! Contacts targeted by a campaign.

use serde::{Deserialize, Serialize};

use super::{AccountId, DisplayId};

/// Internal numeric key of a contact.
pub type ContactId = i64;

/// A contact. Either address may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Internal key.
    pub id: ContactId,
    /// External identifier.
    pub display_id: DisplayId,
    /// Owning account.
    pub account_id: AccountId,
    /// Email address, empty if unknown.
    pub email: String,
    /// Phone number, empty if unknown.
    pub phone: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl Contact {
    /// Whether the contact can receive email.
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }

    /// Whether the contact can receive SMS.
    pub fn has_phone(&self) -> bool {
        !self.phone.is_empty()
    }

    /// Look up a field by the name used in template expressions.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "firstName" | "first_name" => Some(&self.first_name),
            "lastName" | "last_name" => Some(&self.last_name),
            "displayId" | "display_id" => Some(self.display_id.as_str()),
            _ => None,
        }
    }
}

/// Identity provider event payloads
///
/// Only the user lifecycle events are modelled. Anything else parses into
/// [`WebhookEvent::Unknown`] so it can be acknowledged without action.
///
/// ```json
/// {
///   "type": "user.created",
///   "data": {
///     "id": "user_29w83sxmDNGwOuEthce5gg56FcC",
///     "email_addresses": [{ "id": "idn_1", "email_address": "example@example.org" }],
///     "first_name": "Example",
///     "last_name": null,
///     "username": null,
///     "image_url": "https://img.clerk.com/xxxxxx"
///   }
/// }
/// ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::user::{CreateUser, UpdateUser, STARTING_CREDITS};

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
}

/// `data` of `user.created` and `user.updated`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: String,

    #[serde(default)]
    pub email_addresses: Option<Vec<EmailAddress>>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,
}

impl UserPayload {
    /// First listed address, or "" when there is none
    pub fn first_email(&self) -> String {
        self.email_addresses
            .as_deref()
            .and_then(<[EmailAddress]>::first)
            .map(|address| address.email_address.clone())
            .unwrap_or_default()
    }

    /// New account with the starting credit balance
    pub fn to_create_user(&self) -> CreateUser {
        CreateUser {
            clerk_id: self.id.clone(),
            email: self.first_email(),
            username: self.username.clone().unwrap_or_default(),
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            photo: self.image_url.clone().unwrap_or_default(),
            credit_balance: STARTING_CREDITS,
        }
    }

    pub fn to_update_user(&self) -> UpdateUser {
        UpdateUser {
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            photo: self.image_url.clone().unwrap_or_default(),
        }
    }
}

/// `data` of `user.deleted`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPayload {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub deleted: bool,
}

/// A verified provider event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    UserCreated(UserPayload),
    UserUpdated(UserPayload),
    UserDeleted(DeletedPayload),

    /// Any event type we do not handle
    Unknown { event_type: String },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,

    #[serde(default)]
    data: JsonValue,
}

impl WebhookEvent {
    /// Parses a raw (already verified) request body
    ///
    /// The `data` of unknown event types is never inspected, so their shape
    /// cannot cause a rejection.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(body)?;

        let event = match raw.event_type.as_str() {
            USER_CREATED => WebhookEvent::UserCreated(serde_json::from_value(raw.data)?),
            USER_UPDATED => WebhookEvent::UserUpdated(serde_json::from_value(raw.data)?),
            USER_DELETED => WebhookEvent::UserDeleted(serde_json::from_value(raw.data)?),
            _ => WebhookEvent::Unknown {
                event_type: raw.event_type,
            },
        };

        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::UserCreated(_) => USER_CREATED,
            WebhookEvent::UserUpdated(_) => USER_UPDATED,
            WebhookEvent::UserDeleted(_) => USER_DELETED,
            WebhookEvent::Unknown { event_type } => event_type,
        }
    }
}

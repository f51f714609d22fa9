//! Defines the signed-in user and the session issued for them by the remote service.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// How long after its access token expires a refreshable session can still be
/// refreshed.
pub const REFRESH_WINDOW: Duration = Duration::days(7);

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] in a fixed width format.
    //!
    //! The default serializer for [time::OffsetDateTime] will serialize
    //! "00:00:00.000000" as "0:00:00.0" and the deserializer would error out
    //! because it expects the hours to be two digits, not one.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the session expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The remote service's identifier for a user. Every transaction is owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an identifier issued by the remote service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID.
    pub id: OwnerId,
    /// The email address the user signed up with.
    pub email: String,
    /// The name the user chose at sign up, if any.
    pub username: Option<String>,
}

impl User {
    /// The name to greet the user with: their username, or their email if they have none.
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(username) if !username.trim().is_empty() => username,
            _ => &self.email,
        }
    }
}

/// A signed-in user and the access token the remote service issued for them.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The user the session belongs to.
    pub user: User,
    /// The bearer token passed to the remote service on every data call.
    pub access_token: String,
    /// When the remote service stops accepting the access token.
    #[serde(with = "datetime_format")]
    pub expires_at: OffsetDateTime,
    /// The token for getting a new access token once this one expires, if the
    /// remote service issues them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Session {
    /// The owner of any transactions read or written with this session.
    pub fn owner(&self) -> &OwnerId {
        &self.user.id
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// How long the session cookie should be kept.
    ///
    /// A refreshable session outlives its access token by [REFRESH_WINDOW].
    pub fn cookie_expires_at(&self) -> OffsetDateTime {
        match self.refresh_token {
            Some(_) => self.expires_at + REFRESH_WINDOW,
            None => self.expires_at,
        }
    }
}

// Keep the tokens out of the logs.
impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"********")
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "********"),
            )
            .finish()
    }
}

//! Selects and connects the remote service from the server's settings.

use rusqlite::Connection;
use time::Duration;

use crate::{Error, remote::Backend, remote::RestService, remote::SqliteService};

/// How long sessions issued by the local SQLite service last by default.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::days(7);

/// The remote service the server should use for storage and authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    /// Keep users and transactions in a local SQLite database.
    Sqlite {
        /// File path to the SQLite database, created if it does not exist.
        db_path: String,
        /// How long a session lasts after signing in.
        session_duration: Duration,
    },
    /// Use a Supabase compatible REST API.
    Rest {
        /// The base URL of the service, e.g. "https://project.supabase.co".
        url: String,
        /// The public (anonymous) API key of the service.
        anon_key: String,
    },
}

impl BackendConfig {
    /// Build the config from the server's command line and environment.
    ///
    /// Exactly one of `db_path` and `remote_url` must be given, and
    /// `anon_key` is required alongside `remote_url`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidConfig] describing the first problem found.
    pub fn from_parts(
        db_path: Option<String>,
        remote_url: Option<String>,
        anon_key: Option<String>,
        session_duration: Option<Duration>,
    ) -> Result<Self, Error> {
        match (db_path, remote_url) {
            (Some(_), Some(_)) => Err(Error::InvalidConfig(
                "use either a database path or a remote URL, not both".to_owned(),
            )),
            (None, None) => Err(Error::InvalidConfig(
                "either a database path or a remote URL is required".to_owned(),
            )),
            (Some(db_path), None) => {
                let session_duration = session_duration.unwrap_or(DEFAULT_SESSION_DURATION);

                if !session_duration.is_positive() {
                    return Err(Error::InvalidConfig(format!(
                        "session duration must be positive, got {session_duration}"
                    )));
                }

                Ok(BackendConfig::Sqlite {
                    db_path,
                    session_duration,
                })
            }
            (None, Some(url)) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(Error::InvalidConfig(format!(
                        "remote URL must start with http:// or https://, got \"{url}\""
                    )));
                }

                match anon_key {
                    Some(anon_key) if !anon_key.trim().is_empty() => {
                        Ok(BackendConfig::Rest { url, anon_key })
                    }
                    _ => Err(Error::InvalidConfig(
                        "an API key is required to use a remote URL".to_owned(),
                    )),
                }
            }
        }
    }

    /// Open the database or create the HTTP client described by the config.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] if the database cannot be opened or its
    /// tables cannot be created.
    pub fn connect(self) -> Result<Backend, Error> {
        match self {
            BackendConfig::Sqlite {
                db_path,
                session_duration,
            } => {
                tracing::info!("Using the SQLite database at {db_path}");
                let connection = Connection::open(&db_path)?;

                Ok(SqliteService::new(connection, session_duration)?.into())
            }
            BackendConfig::Rest { url, anon_key } => {
                tracing::info!("Using the remote service at {url}");

                Ok(RestService::new(&url, &anon_key).into())
            }
        }
    }
}

#[cfg(test)]
mod backend_config_tests {
    use time::Duration;

    use crate::{Error, remote::Backend};

    use super::{BackendConfig, DEFAULT_SESSION_DURATION};

    #[test]
    fn sqlite_uses_default_session_duration() {
        let config = BackendConfig::from_parts(Some("test.db".to_owned()), None, None, None);

        assert_eq!(
            config,
            Ok(BackendConfig::Sqlite {
                db_path: "test.db".to_owned(),
                session_duration: DEFAULT_SESSION_DURATION,
            })
        );
    }

    #[test]
    fn rest_requires_anon_key() {
        let config = BackendConfig::from_parts(
            None,
            Some("https://example.supabase.co".to_owned()),
            None,
            None,
        );

        assert!(matches!(config, Err(Error::InvalidConfig(_))));

        let config = BackendConfig::from_parts(
            None,
            Some("https://example.supabase.co".to_owned()),
            Some("  ".to_owned()),
            None,
        );

        assert!(matches!(config, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rest_with_anon_key() {
        let config = BackendConfig::from_parts(
            None,
            Some("https://example.supabase.co".to_owned()),
            Some("anon".to_owned()),
            None,
        );

        assert_eq!(
            config,
            Ok(BackendConfig::Rest {
                url: "https://example.supabase.co".to_owned(),
                anon_key: "anon".to_owned(),
            })
        );
    }

    #[test]
    fn rejects_both_or_neither() {
        assert!(matches!(
            BackendConfig::from_parts(
                Some("test.db".to_owned()),
                Some("https://example.supabase.co".to_owned()),
                Some("anon".to_owned()),
                None,
            ),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            BackendConfig::from_parts(None, None, None, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_url_without_scheme() {
        let config = BackendConfig::from_parts(
            None,
            Some("example.supabase.co".to_owned()),
            Some("anon".to_owned()),
            None,
        );

        assert!(matches!(config, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_positive_session_duration() {
        let config = BackendConfig::from_parts(
            Some("test.db".to_owned()),
            None,
            None,
            Some(Duration::ZERO),
        );

        assert!(matches!(config, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn connects_to_in_memory_sqlite() {
        let backend = BackendConfig::Sqlite {
            db_path: ":memory:".to_owned(),
            session_duration: Duration::hours(1),
        }
        .connect();

        assert!(matches!(backend, Ok(Backend::Sqlite(_))));
    }
}

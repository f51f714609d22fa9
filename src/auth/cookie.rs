//! Stores the session in a private (encrypted and signed) cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::Session,
    remote::{Backend, RemoteService},
};

/// The name of the cookie holding the serialized [Session].
pub(crate) const COOKIE_SESSION: &str = "session";

/// Add the session cookie to the cookie jar, indicating that a user is logged in.
///
/// The cookie expires together with the session, or once the session can no
/// longer be refreshed.
///
/// # Errors
///
/// Returns an [Error::JSONSerializationError] if the session cannot be serialized.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    session: &Session,
) -> Result<PrivateCookieJar, Error> {
    let value = serde_json::to_string(session)?;

    Ok(jar.add(
        Cookie::build((COOKIE_SESSION, value))
            .expires(session.cookie_expires_at())
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the session from the cookie jar.
///
/// # Errors
///
/// Returns a:
/// - [Error::CookieMissing] if there is no session cookie,
/// - [Error::JSONSerializationError] if the cookie does not hold a session,
/// - [Error::SessionExpired] if the session expired before `now`.
pub(crate) fn get_session_from_cookies(
    jar: &PrivateCookieJar,
    now: OffsetDateTime,
) -> Result<Session, Error> {
    let session = read_session_cookie(jar)?;

    if session.is_expired(now) {
        return Err(Error::SessionExpired);
    }

    Ok(session)
}

/// Get the session from the cookie jar whether or not it has expired.
///
/// # Errors
///
/// Returns a:
/// - [Error::CookieMissing] if there is no session cookie,
/// - [Error::JSONSerializationError] if the cookie does not hold a session.
pub(crate) fn read_session_cookie(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let cookie = jar.get(COOKIE_SESSION).ok_or(Error::CookieMissing)?;

    Ok(serde_json::from_str(cookie.value_trimmed())?)
}

/// Get the session from the cookie jar, trading its refresh token for a new
/// session through `backend` once the access token has expired.
///
/// The returned jar holds the refreshed session, if there was one.
///
/// # Errors
///
/// Returns the errors of [read_session_cookie], or [Error::SessionExpired] if
/// the session expired and could not be refreshed.
pub(crate) async fn get_or_refresh_session(
    jar: PrivateCookieJar,
    backend: &Backend,
    now: OffsetDateTime,
) -> Result<(Session, PrivateCookieJar), Error> {
    let expired = match get_session_from_cookies(&jar, now) {
        Err(Error::SessionExpired) => read_session_cookie(&jar)?,
        result => return result.map(|session| (session, jar)),
    };

    let refreshed = backend.refresh_session(&expired).await?;
    tracing::debug!("refreshed the session of {}", refreshed.owner());
    let jar = set_session_cookie(jar, &refreshed)?;

    Ok((refreshed, jar))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        auth::{OwnerId, REFRESH_WINDOW, Session, User},
        remote::Backend,
        test_utils::{sign_up_test_user, test_service},
    };

    use super::{
        COOKIE_SESSION, get_or_refresh_session, get_session_from_cookies,
        invalidate_session_cookie, read_session_cookie, set_session_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    fn session(expires_at: OffsetDateTime) -> Session {
        Session {
            user: User {
                id: OwnerId::new("user-1"),
                email: "test@test.com".to_owned(),
                username: None,
            },
            access_token: "token".to_owned(),
            expires_at,
            refresh_token: None,
        }
    }

    #[test]
    fn can_set_and_get_session() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let want = session(now + Duration::hours(1));

        let jar = set_session_cookie(get_jar(), &want).unwrap();
        let got = get_session_from_cookies(&jar, now).unwrap();

        assert_eq!(got, want);
    }

    #[test]
    fn cookie_expires_with_session() {
        let expires_at = datetime!(2025-01-01 13:00 UTC);

        let jar = set_session_cookie(get_jar(), &session(expires_at)).unwrap();
        let cookie = jar.get(COOKIE_SESSION).unwrap();

        assert_eq!(cookie.expires_datetime(), Some(expires_at));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn refreshable_cookie_outlives_access_token() {
        let expires_at = datetime!(2025-01-01 13:00 UTC);
        let session = Session {
            refresh_token: Some("refresh".to_owned()),
            ..session(expires_at)
        };

        let jar = set_session_cookie(get_jar(), &session).unwrap();
        let cookie = jar.get(COOKIE_SESSION).unwrap();

        assert_eq!(cookie.expires_datetime(), Some(expires_at + REFRESH_WINDOW));
    }

    #[test]
    fn expired_session_can_still_be_read() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let want = session(now - Duration::hours(1));
        let jar = set_session_cookie(get_jar(), &want).unwrap();

        assert_eq!(read_session_cookie(&jar), Ok(want));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        let got = get_session_from_cookies(&get_jar(), OffsetDateTime::now_utc());

        assert_eq!(got, Err(Error::CookieMissing));
    }

    #[test]
    fn expired_session_is_an_error() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let jar = set_session_cookie(get_jar(), &session(now - Duration::seconds(1))).unwrap();

        let got = get_session_from_cookies(&jar, now);

        assert_eq!(got, Err(Error::SessionExpired));
    }

    #[test]
    fn garbage_cookie_is_an_error() {
        let jar = get_jar().add(Cookie::new(COOKIE_SESSION, "not json"));

        let got = get_session_from_cookies(&jar, OffsetDateTime::now_utc());

        assert!(matches!(got, Err(Error::JSONSerializationError(_))));
    }

    #[test]
    fn invalidated_cookie_is_not_a_session() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let jar = set_session_cookie(get_jar(), &session(now + Duration::hours(1))).unwrap();

        let jar = invalidate_session_cookie(jar);
        let cookie = jar.get(COOKIE_SESSION).unwrap();

        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(get_session_from_cookies(&jar, now).is_err());
    }

    #[tokio::test]
    async fn live_session_is_not_refreshed() {
        let now = OffsetDateTime::now_utc();
        let want = session(now + Duration::hours(1));
        let jar = set_session_cookie(get_jar(), &want).unwrap();

        let (got, _) = get_or_refresh_session(jar, &test_service().into(), now)
            .await
            .unwrap();

        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let service = test_service();
        let signed_in = sign_up_test_user(&service).await;
        let now = OffsetDateTime::now_utc();
        let expired = Session {
            expires_at: now - Duration::minutes(5),
            ..signed_in.clone()
        };
        let jar = set_session_cookie(get_jar(), &expired).unwrap();

        let (got, jar) = get_or_refresh_session(jar, &Backend::from(service), now)
            .await
            .unwrap();

        assert_eq!(got.user, signed_in.user);
        assert_ne!(got.access_token, signed_in.access_token);
        assert_ne!(got.refresh_token, signed_in.refresh_token);
        assert!(!got.is_expired(now));
        assert_eq!(get_session_from_cookies(&jar, now), Ok(got));
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_is_an_error() {
        let now = OffsetDateTime::now_utc();
        let jar = set_session_cookie(get_jar(), &session(now - Duration::hours(1))).unwrap();

        let got = get_or_refresh_session(jar, &test_service().into(), now).await;

        assert!(matches!(got, Err(Error::SessionExpired)));
    }
}

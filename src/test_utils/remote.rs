use rusqlite::Connection;
use time::Duration;

use crate::{
    auth::Session,
    remote::{RemoteService, SqliteService},
};

pub(crate) const TEST_EMAIL: &str = "test@test.com";
pub(crate) const TEST_PASSWORD: &str = "hunter2";
pub(crate) const TEST_USERNAME: &str = "Test User";

/// An in-memory service with a low bcrypt cost so tests stay fast.
pub(crate) fn test_service() -> SqliteService {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");

    SqliteService::new(connection, Duration::hours(1))
        .expect("Could not create tables")
        .with_hash_cost(4)
}

pub(crate) async fn sign_up_test_user(service: &SqliteService) -> Session {
    service
        .sign_up(TEST_EMAIL, TEST_PASSWORD, TEST_USERNAME)
        .await
        .expect("Could not sign up test user")
        .expect("Sign up did not return a session")
}

//! Authentication: the session model, the session cookie, the log-in,
//! registration and log-out routes, and the middleware guarding the rest.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod register;
mod session;

pub(crate) use cookie::{get_or_refresh_session, invalidate_session_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use register::{get_register_page, register_user};
pub use session::{OwnerId, REFRESH_WINDOW, Session, User};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_SESSION, set_session_cookie};

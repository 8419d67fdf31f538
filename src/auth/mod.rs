mod cookie;
mod log_in;
mod middleware;
mod password;

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_out, post_log_in};
pub use middleware::auth_guard;
pub use password::PasswordHash;

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;

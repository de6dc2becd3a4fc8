//! Request authentication.

mod middleware;

pub use middleware::{AppAuth, APP_ID_HEADER};

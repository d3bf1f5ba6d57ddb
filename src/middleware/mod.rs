pub mod session;

pub use session::{CurrentUser, AUTH_COOKIE};

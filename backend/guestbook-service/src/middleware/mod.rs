mod auth;
mod cors;

pub use auth::require_admin;
pub use cors::{build_cors_headers, cors};

//! Bearer-token authentication.
//!
//! A middleware resolves the caller once per request and stores the identity
//! in the request extensions. Handlers pick it up with [`Auth`] and check
//! ownership with the [`guard`] functions.

mod bearer;
mod errors;
mod extractors;
pub mod guard;
mod middleware;
mod types;

pub use bearer::bearer_token;
pub use errors::ApiAuthError;
pub use extractors::Auth;
pub use guard::{ensure_owner, ensure_self};
pub use middleware::{AuthState, resolve_identity};
pub use types::AuthenticatedIdentity;

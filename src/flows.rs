//! Token-endpoint flows: the refresh exchange that keeps the cache warm and the one-time
//! authorization-code bootstrap that mints the first refresh token.

pub mod authorization;
pub mod common;
pub mod refresh;

pub use authorization::*;
pub use common::{DEFAULT_EXPIRES_IN, TokenResponse};
pub use refresh::*;

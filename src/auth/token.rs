//! Token secrets and the cached token state.

pub mod secret;
pub mod state;

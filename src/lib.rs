//! Spotify Web API dispatcher backed by a single-flight OAuth token cache.
//!
//! A [`Dispatcher`] owns one pooled HTTP client and one [`TokenCache`]. Concurrent callers that
//! find the access token expired share a single refresh exchange, and every failure resolves to
//! one [`Error`] variant.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;

pub use cache::TokenCache;
pub use dispatch::{Dispatcher, JsonMap, Verb};
pub use error::{ApiError, AuthError, ConfigError, Error, Result, TransportError};

#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credential,
		clock::{Clock, ManualClock},
		config::BrokerConfig,
		dispatch::Dispatcher,
	};

	/// Builds a [`BrokerConfig`] whose endpoints all point at a local mock server base URL.
	pub fn mock_config(server_base: &str) -> BrokerConfig {
		BrokerConfig::builder()
			.token_endpoint(
				Url::parse(&format!("{server_base}/api/token"))
					.expect("Mock token endpoint should parse successfully."),
			)
			.authorize_endpoint(
				Url::parse(&format!("{server_base}/authorize"))
					.expect("Mock authorize endpoint should parse successfully."),
			)
			.api_base(
				Url::parse(&format!("{server_base}/v1"))
					.expect("Mock API base URL should parse successfully."),
			)
			.build()
			.expect("Mock broker config should build successfully.")
	}

	/// Renders a successful token-endpoint body.
	pub fn token_body(access_token: &str, expires_in: u64) -> String {
		serde_json::json!({
			"access_token": access_token,
			"token_type": "Bearer",
			"expires_in": expires_in,
		})
		.to_string()
	}

	/// Constructs a [`Dispatcher`] driven by a [`ManualClock`] pinned to the current instant.
	pub fn build_test_dispatcher(
		server_base: &str,
		client_id: &str,
		client_secret: &str,
		refresh_token: &str,
	) -> (Dispatcher, Arc<ManualClock>) {
		let credential = Credential::new(client_id, client_secret, refresh_token)
			.expect("Test credential should be valid.");
		let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
		let dyn_clock: Arc<dyn Clock> = clock.clone();
		let dispatcher = Dispatcher::with_clock(mock_config(server_base), credential, dyn_clock)
			.expect("Test dispatcher should build successfully.");

		(dispatcher, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};

//! Transport primitives shared by the refresher and the dispatcher.
//!
//! The broker owns exactly one [`ReqwestHttpClient`] for its lifetime. `reqwest` pools
//! connections inside the client, so the refresher and dispatcher share a cheap clone of the
//! same handle instead of building a client per request.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, config::BrokerConfig, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are never followed: the token endpoint must answer directly, and the resource API
/// does not rely on redirects for any operation the broker exposes.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the pooled client with the configured timeout and user agent.
	pub fn from_config(config: &BrokerConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.std_timeout())
			.user_agent(config.user_agent.as_str())
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Parses a `Retry-After` header expressed either as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

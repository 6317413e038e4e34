//! Endpoint and transport configuration consumed when the broker is constructed.
//!
//! [`BrokerConfig::default`] targets the public Spotify accounts service and Web API. Tests and
//! self-hosted proxies override individual endpoints through [`BrokerConfigBuilder`] or the
//! `SPOTIFY_*` environment overrides read by [`BrokerConfig::from_lookup`].

// self
use crate::{_prelude::*, error::ConfigError};

/// Default token endpoint used for refresh and authorization-code exchanges.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Default authorize endpoint used by the bootstrap flow.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
/// Default resource API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);

/// Environment override for the token endpoint.
pub const TOKEN_URL_ENV: &str = "SPOTIFY_TOKEN_URL";
/// Environment override for the resource API base URL.
pub const API_BASE_ENV: &str = "SPOTIFY_API_BASE";
/// Environment override for the request timeout, in whole seconds.
pub const TIMEOUT_SECS_ENV: &str = "SPOTIFY_HTTP_TIMEOUT_SECS";

/// Endpoint set the broker talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// Token endpoint used for exchanges and refreshes.
	pub token: Url,
	/// Authorize endpoint end-users are redirected to during bootstrap.
	pub authorize: Url,
	/// Resource API base; endpoint paths are appended verbatim.
	pub api_base: Url,
}

/// Validated broker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerConfig {
	/// Endpoint definitions.
	pub endpoints: Endpoints,
	/// Timeout applied to every outbound request.
	pub timeout: Duration,
	/// `User-Agent` header sent with every request.
	pub user_agent: String,
}
impl BrokerConfig {
	/// Creates a builder seeded with the Spotify defaults.
	pub fn builder() -> BrokerConfigBuilder {
		BrokerConfigBuilder::default()
	}

	/// Applies `SPOTIFY_TOKEN_URL`, `SPOTIFY_API_BASE`, and `SPOTIFY_HTTP_TIMEOUT_SECS` overrides
	/// from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Applies overrides through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut builder = Self::builder();

		if let Some(raw) = lookup(TOKEN_URL_ENV).filter(|v| !v.trim().is_empty()) {
			builder = builder.token_endpoint(parse_endpoint("token", &raw)?);
		}
		if let Some(raw) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
			builder = builder.api_base(parse_endpoint("api_base", &raw)?);
		}
		if let Some(raw) = lookup(TIMEOUT_SECS_ENV).filter(|v| !v.trim().is_empty()) {
			let secs = raw.trim().parse::<i64>().map_err(|_| ConfigError::NonPositiveTimeout)?;

			builder = builder.timeout(Duration::seconds(secs));
		}

		builder.build()
	}

	/// Timeout converted for the HTTP stack.
	pub fn std_timeout(&self) -> std::time::Duration {
		self.timeout.try_into().unwrap_or(std::time::Duration::from_secs(30))
	}
}
impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			endpoints: Endpoints {
				token: default_url(DEFAULT_TOKEN_URL),
				authorize: default_url(DEFAULT_AUTHORIZE_URL),
				api_base: default_url(DEFAULT_API_BASE),
			},
			timeout: DEFAULT_TIMEOUT,
			user_agent: default_user_agent(),
		}
	}
}

/// Builder for [`BrokerConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct BrokerConfigBuilder {
	token_endpoint: Option<Url>,
	authorize_endpoint: Option<Url>,
	api_base: Option<Url>,
	timeout: Option<Duration>,
	user_agent: Option<String>,
}
impl BrokerConfigBuilder {
	/// Overrides the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the authorize endpoint.
	pub fn authorize_endpoint(mut self, url: Url) -> Self {
		self.authorize_endpoint = Some(url);

		self
	}

	/// Overrides the resource API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Validates the configuration.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		let defaults = BrokerConfig::default();
		let token = self.token_endpoint.unwrap_or(defaults.endpoints.token);
		let authorize = self.authorize_endpoint.unwrap_or(defaults.endpoints.authorize);
		let api_base = self.api_base.unwrap_or(defaults.endpoints.api_base);
		let timeout = self.timeout.unwrap_or(defaults.timeout);

		validate_endpoint("token", &token)?;
		validate_endpoint("authorize", &authorize)?;
		validate_endpoint("api_base", &api_base)?;

		if !timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(BrokerConfig {
			endpoints: Endpoints { token, authorize, api_base },
			timeout,
			user_agent: self.user_agent.unwrap_or(defaults.user_agent),
		})
	}
}

fn default_url(raw: &str) -> Url {
	// The defaults are compile-time constants, so parsing cannot fail at runtime.
	Url::parse(raw).unwrap_or_else(|_| unreachable!("default endpoint `{raw}` must parse"))
}

fn default_user_agent() -> String {
	concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into()
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw.trim())
		.map_err(|e| ConfigError::InvalidEndpoint { endpoint, reason: e.to_string() })
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), ConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidEndpoint {
			endpoint,
			reason: format!("unsupported scheme `{}`", url.scheme()),
		});
	}
	if url.cannot_be_a_base() || url.host_str().is_none() {
		return Err(ConfigError::InvalidEndpoint { endpoint, reason: "missing host".into() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_target_spotify() {
		let config = BrokerConfig::default();

		assert_eq!(config.endpoints.token.as_str(), DEFAULT_TOKEN_URL);
		assert_eq!(config.endpoints.api_base.as_str(), DEFAULT_API_BASE);
		assert_eq!(config.timeout, Duration::seconds(30));
		assert_eq!(config.std_timeout(), std::time::Duration::from_secs(30));
		assert!(config.user_agent.starts_with("spotify-broker/"));
	}

	#[test]
	fn builder_rejects_bad_scheme_and_timeout() {
		let err = BrokerConfig::builder()
			.api_base(Url::parse("ftp://example.com/v1").expect("URL fixture should parse."))
			.build()
			.expect_err("Non-HTTP schemes must be rejected.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { endpoint: "api_base", .. }));

		let err = BrokerConfig::builder()
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeout must be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTimeout));
	}

	#[test]
	fn lookup_overrides_endpoints_and_timeout() {
		let config = BrokerConfig::from_lookup(|name| match name {
			TOKEN_URL_ENV => Some("http://127.0.0.1:9000/api/token".into()),
			TIMEOUT_SECS_ENV => Some("5".into()),
			_ => None,
		})
		.expect("Overrides should build.");

		assert_eq!(config.endpoints.token.as_str(), "http://127.0.0.1:9000/api/token");
		assert_eq!(config.endpoints.api_base.as_str(), DEFAULT_API_BASE);
		assert_eq!(config.timeout, Duration::seconds(5));

		let err = BrokerConfig::from_lookup(|name| {
			(name == API_BASE_ENV).then(|| "not a url".to_owned())
		})
		.expect_err("Unparseable overrides must fail.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { endpoint: "api_base", .. }));
	}
}

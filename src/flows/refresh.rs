//! Refresh-token exchange against the accounts service.
//!
//! [`Refresher::refresh`] performs exactly one `grant_type=refresh_token` round trip per call.
//! It does not coordinate concurrent callers; the [`TokenCache`](crate::cache::TokenCache) in
//! front of it guarantees at most one exchange is in flight.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, TokenState},
	clock::Clock,
	config::BrokerConfig,
	error::AuthError,
	flows::common,
	http::ReqwestHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Performs refresh-token exchanges and remembers the latest refresh token.
///
/// When the provider rotates the refresh token, the new value replaces the startup value for all
/// subsequent exchanges. The rotated value lives in memory only; persisting it is left to the
/// caller via [`Refresher::current_refresh_token`].
pub struct Refresher {
	http: ReqwestHttpClient,
	token_url: Url,
	credential: Credential,
	refresh_token: RwLock<Option<TokenSecret>>,
	clock: Arc<dyn Clock>,
	metrics: Arc<RefreshMetrics>,
}
impl Refresher {
	/// Creates a refresher that posts to the configured token endpoint.
	pub fn new(
		http: ReqwestHttpClient,
		config: &BrokerConfig,
		credential: Credential,
		clock: Arc<dyn Clock>,
	) -> Self {
		let refresh_token = RwLock::new(credential.refresh_token().cloned());

		Self {
			http,
			token_url: config.endpoints.token.clone(),
			credential,
			refresh_token,
			clock,
			metrics: Default::default(),
		}
	}

	/// Exchanges the current refresh token for a new access token.
	///
	/// `expires_at` is computed from the clock reading taken after the response arrives, so
	/// slow round trips never extend a token past its real lifetime.
	pub async fn refresh(&self) -> Result<TokenState, AuthError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let refresh_token =
					self.refresh_token.read().clone().ok_or(AuthError::MissingRefreshToken)?;

				self.metrics.record_attempt();

				let response = common::exchange_form(
					&self.http,
					&self.token_url,
					self.credential.client_id(),
					self.credential.client_secret(),
					&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.expose())],
				)
				.await?;
				let rotated = response.rotated_refresh_token();
				let expires_in = response.expires_in_secs();
				let state = response.into_state(&refresh_token, self.clock.now())?;

				if let Some(rotated) = &rotated {
					*self.refresh_token.write() = Some(rotated.clone());
				}

				obs::trace_refresh_success(
					Duration::seconds(i64::try_from(expires_in).unwrap_or(i64::MAX)),
					rotated.is_some(),
				);

				Ok(state)
			})
			.await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(e) => {
				self.metrics.record_failure();
				obs::trace_refresh_failure(e);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Refresh token the next exchange will present, including any rotated value.
	pub fn current_refresh_token(&self) -> Option<TokenSecret> {
		self.refresh_token.read().clone()
	}

	/// Client identity used for exchanges.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Exchange counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}
}
impl Debug for Refresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Refresher")
			.field("token_url", &self.token_url.as_str())
			.field("credential", &self.credential)
			.field("refresh_token_set", &self.refresh_token.read().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::clock::SystemClock;

	fn refresher(refresh_token: &str) -> Refresher {
		let credential =
			Credential::new("client", "secret", refresh_token).expect("Credential should build.");

		Refresher::new(
			ReqwestHttpClient::default(),
			&BrokerConfig::default(),
			credential,
			Arc::new(SystemClock),
		)
	}

	#[tokio::test]
	async fn missing_refresh_token_fails_without_network() {
		let refresher = refresher("");
		let err = refresher.refresh().await.expect_err("Refresh without a token must fail.");

		assert!(matches!(err, AuthError::MissingRefreshToken));
		assert_eq!(refresher.metrics().attempts(), 0);
		assert_eq!(refresher.metrics().failures(), 1);
	}

	#[test]
	fn startup_refresh_token_is_current() {
		let refresher = refresher("refresh-0");

		assert_eq!(
			refresher.current_refresh_token().map(|secret| secret.expose().to_owned()),
			Some("refresh-0".into())
		);
		assert!(!format!("{refresher:?}").contains("refresh-0"));
	}
}

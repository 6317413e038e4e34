//! Cached token state produced by every successful exchange, plus its builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Safety buffer subtracted from `expires_at` before a token is considered usable.
pub const EXPIRY_BUFFER: Duration = Duration::seconds(60);

/// Errors produced by [`TokenStateBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenStateBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Immutable snapshot of the credentials minted by the token endpoint.
///
/// The cache never mutates a state in place; every refresh builds a new value and swaps it in
/// whole.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenState {
	/// Access token presented as the Bearer credential.
	pub access_token: TokenSecret,
	/// Refresh token used for the next exchange (rotated or carried over).
	pub refresh_token: TokenSecret,
	/// Scopes the provider reported as granted, if any.
	pub scope: Option<ScopeSet>,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Instant the provider stops honoring the access token.
	pub expires_at: OffsetDateTime,
}
impl TokenState {
	/// Returns a builder for constructing token states.
	pub fn builder() -> TokenStateBuilder {
		TokenStateBuilder::default()
	}

	/// Returns `true` once `now` has entered the [`EXPIRY_BUFFER`] before `expires_at`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at - EXPIRY_BUFFER
	}

	/// Time left before the token stops being handed out, clamped at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - EXPIRY_BUFFER - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenState`].
#[derive(Clone, Debug, Default)]
pub struct TokenStateBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	scope: Option<ScopeSet>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenStateBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Records the granted scopes.
	pub fn scope(mut self, scope: Option<ScopeSet>) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenState`].
	pub fn build(self) -> Result<TokenState, TokenStateBuilderError> {
		let access_token = self.access_token.ok_or(TokenStateBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(TokenStateBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenStateBuilderError::MissingExpiry),
		};

		Ok(TokenState { access_token, refresh_token, scope: self.scope, issued_at, expires_at })
	}
}

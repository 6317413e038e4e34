//! Token-endpoint plumbing shared by the refresh and authorization-code exchanges.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TokenSecret, TokenState},
	error::AuthError,
	http::ReqwestHttpClient,
	obs,
};

/// Lifetime assumed when the token endpoint omits `expires_in`, in seconds.
pub const DEFAULT_EXPIRES_IN: u64 = 3_600;

/// Successful token-endpoint payload.
///
/// Only `access_token` is required; Spotify omits `refresh_token` whenever it does not rotate.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
	/// Newly minted access token.
	pub access_token: String,
	/// Lifetime in seconds, if reported.
	#[serde(default)]
	pub expires_in: Option<u64>,
	/// Rotated refresh token, if issued.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Space-delimited granted scopes, if reported.
	#[serde(default)]
	pub scope: Option<String>,
	/// Token type (always `Bearer` for Spotify), if reported.
	#[serde(default)]
	pub token_type: Option<String>,
}
impl TokenResponse {
	/// Lifetime reported by the endpoint, falling back to [`DEFAULT_EXPIRES_IN`].
	pub fn expires_in_secs(&self) -> u64 {
		self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN)
	}

	/// Returns the rotated refresh token when the endpoint issued a non-empty one.
	pub fn rotated_refresh_token(&self) -> Option<TokenSecret> {
		self.refresh_token.clone().and_then(TokenSecret::non_empty)
	}

	/// Builds the cached state, carrying `fallback_refresh` over when nothing was rotated.
	pub(crate) fn into_state(
		self,
		fallback_refresh: &TokenSecret,
		issued_at: OffsetDateTime,
	) -> Result<TokenState, AuthError> {
		let expires_in = self.expires_in_secs();
		let lifetime = i64::try_from(expires_in)
			.ok()
			.map(Duration::seconds)
			.filter(|lifetime| issued_at.checked_add(*lifetime).is_some())
			.ok_or(AuthError::ExpiresInOutOfRange { expires_in })?;
		let refresh_token =
			self.rotated_refresh_token().unwrap_or_else(|| fallback_refresh.clone());
		// A malformed granted scope does not fail a grant that already succeeded.
		let scope = self.scope.as_deref().and_then(|raw| match raw.parse::<ScopeSet>() {
			Ok(scope) => Some(scope),
			Err(e) => {
				obs::trace_unparsed_scope(raw, &e);

				None
			},
		});

		Ok(TokenState {
			access_token: TokenSecret::new(self.access_token),
			refresh_token,
			scope,
			issued_at,
			expires_at: issued_at + lifetime,
		})
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("scope", &self.scope)
			.field("token_type", &self.token_type)
			.finish()
	}
}

/// Posts a form-encoded grant to the token endpoint using HTTP Basic client authentication.
///
/// Any status other than `200` is reported as [`AuthError::Rejected`] with the raw body so
/// operators can see the provider's own explanation.
pub(crate) async fn exchange_form(
	http: &ReqwestHttpClient,
	token_url: &Url,
	client_id: &ClientId,
	client_secret: &TokenSecret,
	form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
	let response = http
		.post(token_url.clone())
		.basic_auth(client_id, Some(client_secret.expose()))
		.header(ACCEPT, "application/json")
		.form(form)
		.send()
		.await?;
	let status = response.status();
	let body = response.text().await?;

	if status != StatusCode::OK {
		return Err(AuthError::Rejected { status: status.as_u16(), body });
	}

	parse_token_response(&body)
}

/// Parses a token-endpoint body, keeping the JSON path of any failure.
pub(crate) fn parse_token_response(body: &str) -> Result<TokenResponse, AuthError> {
	let mut deserializer = serde_json::Deserializer::from_str(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| AuthError::MalformedResponse { source: Arc::new(e) })
}

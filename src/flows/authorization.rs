//! One-time Authorization Code + PKCE bootstrap that mints the first refresh token.
//!
//! The broker never drives a browser. [`AuthorizationSession::start`] produces the URL to send
//! the account owner to; once the redirect comes back, [`exchange_authorization_code`] trades
//! the returned `code` for a [`TokenState`] whose refresh token can seed
//! [`Credential`](crate::auth::Credential).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Credential, ScopeSet, TokenState},
	config::BrokerConfig,
	error::AuthError,
	flows::common,
	http::ReqwestHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// PKCE challenge method sent to the authorize endpoint.
pub const PKCE_METHOD: &str = "S256";

/// Pending authorization handshake.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Scopes requested from the account owner.
	pub scope: ScopeSet,
	/// Opaque value that must come back unchanged on the redirect.
	pub state: String,
	/// Redirect URI registered with the application.
	pub redirect_uri: Url,
	/// Authorize URL the account owner should open.
	pub authorize_url: Url,
	code_verifier: String,
	code_challenge: String,
}
impl AuthorizationSession {
	/// Generates a fresh `state` and PKCE pair and builds the authorize URL.
	pub fn start(
		config: &BrokerConfig,
		client_id: &ClientId,
		scope: ScopeSet,
		redirect_uri: Url,
	) -> Self {
		let state = random_string(STATE_LEN);
		let code_verifier = random_string(PKCE_VERIFIER_LEN);
		let code_challenge = pkce_challenge(&code_verifier);
		let mut authorize_url = config.endpoints.authorize.clone();

		authorize_url
			.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", client_id.as_ref())
			.append_pair("redirect_uri", redirect_uri.as_str())
			.append_pair("scope", &scope.normalized())
			.append_pair("state", &state)
			.append_pair("code_challenge", &code_challenge)
			.append_pair("code_challenge_method", PKCE_METHOD);

		Self { scope, state, redirect_uri, authorize_url, code_verifier, code_challenge }
	}

	/// PKCE challenge embedded in the authorize URL.
	pub fn code_challenge(&self) -> &str {
		&self.code_challenge
	}

	/// Checks the `state` parameter returned on the redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<(), AuthError> {
		if returned_state == self.state { Ok(()) } else { Err(AuthError::StateMismatch) }
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("authorize_url", &self.authorize_url.as_str())
			.field("code_challenge", &self.code_challenge)
			.finish()
	}
}

/// Exchanges an authorization `code` for the initial token state.
///
/// The provider must return a refresh token here; without one the bootstrap is useless and
/// [`AuthError::MissingRefreshToken`] is returned.
pub async fn exchange_authorization_code(
	http: &ReqwestHttpClient,
	config: &BrokerConfig,
	credential: &Credential,
	session: &AuthorizationSession,
	code: &str,
) -> Result<TokenState, AuthError> {
	const KIND: FlowKind = FlowKind::AuthorizationCode;

	let span = FlowSpan::new(KIND, "exchange_authorization_code");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	let result = span
		.instrument(async move {
			let response = common::exchange_form(
				http,
				&config.endpoints.token,
				credential.client_id(),
				credential.client_secret(),
				&[
					("grant_type", "authorization_code"),
					("code", code),
					("redirect_uri", session.redirect_uri.as_str()),
					("code_verifier", &session.code_verifier),
				],
			)
			.await?;
			let refresh_token =
				response.rotated_refresh_token().ok_or(AuthError::MissingRefreshToken)?;

			response.into_state(&refresh_token, OffsetDateTime::now_utc())
		})
		.await;

	match &result {
		Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
	}

	result
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn session() -> AuthorizationSession {
		AuthorizationSession::start(
			&BrokerConfig::default(),
			&ClientId::new("client-123").expect("Client fixture should be valid."),
			ScopeSet::new(["user-read-private", "streaming"]).expect("Scope fixture should build."),
			Url::parse("http://127.0.0.1:8888/callback").expect("Redirect fixture should parse."),
		)
	}

	#[test]
	fn authorize_url_carries_pkce_and_state() {
		let session = session();
		let pairs: HashMap<String, String> =
			session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(session.state.len(), STATE_LEN);
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-123"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("http://127.0.0.1:8888/callback")
		);
		assert_eq!(pairs.get("scope").map(String::as_str), Some("streaming user-read-private"));
		assert_eq!(pairs.get("state"), Some(&session.state));
		assert_eq!(pairs.get("code_challenge").map(String::as_str), Some(session.code_challenge()));
		assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some(PKCE_METHOD));
	}

	#[test]
	fn challenge_matches_rfc_7636_vector() {
		assert_eq!(
			pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let session = session();

		assert!(session.validate_state(&session.state.clone()).is_ok());
		assert!(matches!(session.validate_state("other"), Err(AuthError::StateMismatch)));
	}
}

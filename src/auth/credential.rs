//! Immutable client identity supplied once at startup.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::ConfigError,
};

/// Environment variable holding the OAuth client identifier.
pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";
/// Environment variable holding the initial refresh token.
pub const REFRESH_TOKEN_ENV: &str = "SPOTIFY_REFRESH_TOKEN";

/// Client identity plus the refresh token the process starts with.
///
/// The client id and secret are mandatory. The refresh token may be absent; the first token
/// request then fails with [`AuthError::MissingRefreshToken`](crate::error::AuthError).
#[derive(Clone)]
pub struct Credential {
	client_id: ClientId,
	client_secret: TokenSecret,
	refresh_token: Option<TokenSecret>,
}
impl Credential {
	/// Validates and assembles a credential.
	pub fn new(
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.as_ref();

		if client_id.is_empty() {
			return Err(ConfigError::MissingCredential { name: CLIENT_ID_ENV });
		}

		let client_id = ClientId::new(client_id)?;
		let client_secret = TokenSecret::non_empty(client_secret)
			.ok_or(ConfigError::MissingCredential { name: CLIENT_SECRET_ENV })?;

		Ok(Self { client_id, client_secret, refresh_token: TokenSecret::non_empty(refresh_token) })
	}

	/// Reads the credential from `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, and
	/// `SPOTIFY_REFRESH_TOKEN`.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the credential through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let client_id = lookup(CLIENT_ID_ENV).unwrap_or_default();
		let client_secret = lookup(CLIENT_SECRET_ENV).unwrap_or_default();
		let refresh_token = lookup(REFRESH_TOKEN_ENV).unwrap_or_default();

		Self::new(client_id.trim(), client_secret, refresh_token)
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// OAuth client secret.
	pub fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}

	/// Refresh token supplied at startup, if any.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> =
			pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();

		move |name: &str| map.get(name).cloned()
	}

	#[test]
	fn construction_requires_id_and_secret() {
		assert!(matches!(
			Credential::new("", "b", "r"),
			Err(ConfigError::MissingCredential { name: CLIENT_ID_ENV })
		));
		assert!(matches!(
			Credential::new("a", "", "r"),
			Err(ConfigError::MissingCredential { name: CLIENT_SECRET_ENV })
		));

		let credential = Credential::new("a", "b", "r").expect("Credential should build.");

		assert_eq!(credential.client_id().as_ref(), "a");
		assert_eq!(credential.client_secret().expose(), "b");
		assert_eq!(credential.refresh_token().map(TokenSecret::expose), Some("r"));
	}

	#[test]
	fn missing_refresh_token_is_deferred() {
		let credential = Credential::new("a", "b", "").expect("Refresh token is optional.");

		assert!(credential.refresh_token().is_none());
	}

	#[test]
	fn lookup_reads_spotify_variables() {
		let credential = Credential::from_lookup(lookup_from(&[
			(CLIENT_ID_ENV, "client"),
			(CLIENT_SECRET_ENV, "secret"),
			(REFRESH_TOKEN_ENV, "refresh"),
		]))
		.expect("Credential should load from lookup.");

		assert_eq!(credential.client_id().as_ref(), "client");
		assert_eq!(credential.refresh_token().map(TokenSecret::expose), Some("refresh"));

		let err = Credential::from_lookup(lookup_from(&[(CLIENT_ID_ENV, "client")]))
			.expect_err("Missing secret must fail fast.");

		assert!(matches!(err, ConfigError::MissingCredential { name: CLIENT_SECRET_ENV }));
	}

	#[test]
	fn debug_output_redacts_secret() {
		let credential = Credential::new("a", "hunter2", "r").expect("Credential should build.");
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("hunter2"));
		assert!(rendered.contains("refresh_token_set: true"));
	}
}

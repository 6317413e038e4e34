//! Demonstrates the one-time bootstrap that mints the first refresh token: build the authorize
//! URL, validate the redirect `state`, and exchange the returned code.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use spotify_broker::{
	auth::{Credential, ScopeSet},
	config::BrokerConfig,
	flows::{self, AuthorizationSession},
	http::ReqwestHttpClient,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"boot-access","token_type":"Bearer","expires_in":3600,"refresh_token":"boot-refresh"}"#,
			);
		})
		.await;
	let config = BrokerConfig::builder()
		.token_endpoint(Url::parse(&server.url("/api/token"))?)
		.authorize_endpoint(Url::parse(&server.url("/authorize"))?)
		.build()?;
	let credential = Credential::new("demo-client", "demo-secret", "")?;
	let session = AuthorizationSession::start(
		&config,
		credential.client_id(),
		ScopeSet::spotify_defaults(),
		Url::parse("http://127.0.0.1:8888/callback")?,
	);

	println!("Open this URL to authorize: {}", session.authorize_url);

	// The redirect handler would receive `code` and `state` from the query string.
	session.validate_state(&session.state)?;

	let http = ReqwestHttpClient::from_config(&config)?;
	let state =
		flows::exchange_authorization_code(&http, &config, &credential, &session, "demo-code")
			.await?;

	println!("Store this as SPOTIFY_REFRESH_TOKEN: {}.", state.refresh_token.expose());

	token_mock.assert_async().await;

	Ok(())
}

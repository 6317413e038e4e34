//! Demonstrates sharing one dispatcher across tasks against a mock Spotify backend: the access
//! token is refreshed once, then reused by every concurrent call.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use spotify_broker::{
	Dispatcher, Error,
	auth::Credential,
	config::BrokerConfig,
	dispatch::api::SearchQuery,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"demo-access","token_type":"Bearer","expires_in":3600}"#,
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/me/player/currently-playing");
			then.status(200).header("content-type", "application/json").body(
				r#"{"is_playing":true,"item":{"name":"Harder, Better, Faster, Stronger"}}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"tracks":{"total":42,"items":[]}}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1/me/player/pause");
			then.status(404).header("content-type", "application/json").body(
				r#"{"error":{"status":404,"message":"Player command failed: No active device found"}}"#,
			);
		})
		.await;

	let config = BrokerConfig::builder()
		.token_endpoint(Url::parse(&server.url("/api/token"))?)
		.api_base(Url::parse(&server.url("/v1"))?)
		.build()?;
	let credential = Credential::new("demo-client", "demo-secret", "demo-refresh")?;
	let dispatcher = Arc::new(Dispatcher::new(config, credential)?);
	let playing = {
		let dispatcher = dispatcher.clone();

		tokio::spawn(async move { dispatcher.currently_playing().await })
	};
	let search = {
		let dispatcher = dispatcher.clone();

		tokio::spawn(async move { dispatcher.search(&SearchQuery::new("daft punk")).await })
	};
	let playing = playing.await??;
	let search = search.await??;

	println!(
		"Now playing: {}.",
		playing.get("item").and_then(|item| item["name"].as_str()).unwrap_or("nothing")
	);
	println!(
		"Search matches: {}.",
		search.get("tracks").and_then(|tracks| tracks["total"].as_u64()).unwrap_or(0)
	);

	match dispatcher.pause(None).await {
		Err(Error::Api(e)) => println!("Pause rejected with status {}: {}.", e.status, e.message),
		other => println!("Unexpected pause outcome: {other:?}."),
	}

	token_mock.assert_async().await;

	Ok(())
}

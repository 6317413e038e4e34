#![cfg(feature = "test")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use spotify_broker::{
	_preludet::*,
	ApiError, AuthError, ConfigError, Dispatcher, TransportError,
	auth::Credential,
	clock::{Clock, ManualClock},
	config::BrokerConfig,
};

const CLIENT_ID: &str = "client-dispatch";
const CLIENT_SECRET: &str = "secret-dispatch";
const REFRESH_TOKEN: &str = "refresh-dispatch";
const ACCESS_TOKEN: &str = "access-dispatch";

async fn dispatcher_with_token(server: &MockServer) -> Dispatcher {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body(ACCESS_TOKEN, 3600));
		})
		.await;

	build_test_dispatcher(&server.base_url(), CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN).0
}

#[tokio::test]
async fn get_attaches_bearer_token_and_query() {
	let server = MockServer::start_async().await;
	let dispatcher = dispatcher_with_token(&server).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/me/tracks")
				.header("authorization", format!("Bearer {ACCESS_TOKEN}"))
				.query_param("limit", "5")
				.query_param("offset", "10");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"items":[],"total":0}"#);
		})
		.await;
	let map = dispatcher
		.get("/me/tracks", &[("limit", "5".into()), ("offset", "10".into())])
		.await
		.expect("Authorized GET should succeed.");

	mock.assert_async().await;

	assert_eq!(Value::Object(map), json!({ "items": [], "total": 0 }));
}

#[tokio::test]
async fn put_sends_json_body() {
	let server = MockServer::start_async().await;
	let dispatcher = dispatcher_with_token(&server).await;
	let body = json!({ "device_ids": ["dev-1"], "play": true });
	let mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1/me/player").json_body(body.clone());
			then.status(204);
		})
		.await;
	let map =
		dispatcher.put("/me/player", &[], Some(&body)).await.expect("Authorized PUT should succeed.");

	mock.assert_async().await;

	assert!(map.is_empty());
}

#[tokio::test]
async fn responses_are_classified() {
	let server = MockServer::start_async().await;
	let dispatcher = dispatcher_with_token(&server).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/me/player/next");
			then.status(204);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1/me/player/pause");
			then.status(200).body("");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/object");
			then.status(200).header("content-type", "application/json").body(r#"{"a":1}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/array");
			then.status(200).header("content-type", "application/json").body("[1,2,3]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path("/v1/me/player/play");
			then.status(200).body("Playback started");
		})
		.await;

	let next = dispatcher.post("/me/player/next", &[], None).await.expect("204 should succeed.");
	let pause = dispatcher.put("/me/player/pause", &[], None).await.expect("Empty 200 succeeds.");
	let object = dispatcher.get("/object", &[]).await.expect("JSON object should succeed.");
	let array = dispatcher.get("/array", &[]).await.expect("JSON array should succeed.");
	let text = dispatcher.put("/me/player/play", &[], None).await.expect("Plain text succeeds.");

	assert!(next.is_empty());
	assert!(pause.is_empty());
	assert_eq!(Value::Object(object), json!({ "a": 1 }));
	assert_eq!(Value::Object(array), json!({ "value": [1, 2, 3] }));
	assert!(text.is_empty());
}

#[tokio::test]
async fn error_statuses_become_api_errors() {
	let server = MockServer::start_async().await;
	let dispatcher = dispatcher_with_token(&server).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/tracks/missing");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"error":{"status":404,"message":"Not found"}}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/broken");
			then.status(500).body("boom");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/busy");
			then.status(429)
				.header("retry-after", "7")
				.body(r#"{"error":{"status":429,"message":"API rate limit exceeded"}}"#);
		})
		.await;

	let not_found =
		dispatcher.get("/tracks/missing", &[]).await.expect_err("404 should be an API error.");

	assert!(matches!(&not_found, Error::Api(e) if *e == ApiError::new(404, "Not found")));
	assert_eq!(not_found.status(), Some(404));
	assert_eq!(not_found.to_string(), "Spotify API error 404: Not found");

	let broken = dispatcher.get("/broken", &[]).await.expect_err("500 should be an API error.");

	assert!(matches!(broken, Error::Api(e) if e == ApiError::new(500, "boom")));

	let busy = dispatcher.get("/busy", &[]).await.expect_err("429 should be an API error.");

	match busy {
		Error::Api(e) => {
			assert_eq!(e.status, 429);
			assert_eq!(e.message, "API rate limit exceeded");
			assert_eq!(e.retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn blank_error_bodies_remain_api_errors() {
	let server = MockServer::start_async().await;
	let dispatcher = dispatcher_with_token(&server).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/me");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/down");
			then.status(503).body("");
		})
		.await;

	let unauthorized =
		dispatcher.get("/me", &[]).await.expect_err("Empty 401 must not become a success.");

	assert!(matches!(unauthorized, Error::Api(e) if e == ApiError::new(401, "")));

	let down =
		dispatcher.get("/down", &[]).await.expect_err("Empty 503 must not become a success.");

	assert!(matches!(down, Error::Api(e) if e == ApiError::new(503, "")));
}

#[tokio::test]
async fn invalid_endpoints_fail_before_any_token_request() {
	let server = MockServer::start_async().await;
	let (dispatcher, _clock) =
		build_test_dispatcher(&server.base_url(), CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body(ACCESS_TOKEN, 3600));
		})
		.await;
	let err = dispatcher
		.get("https://elsewhere.example/me", &[])
		.await
		.expect_err("Absolute URL endpoints must be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidPath { .. })));

	let err = dispatcher.get("  ", &[]).await.expect_err("Blank endpoints must be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidPath { .. })));

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn auth_failures_propagate_unchanged() {
	let server = MockServer::start_async().await;
	let (dispatcher, _clock) =
		build_test_dispatcher(&server.base_url(), CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(401).body(r#"{"error":"invalid_client"}"#);
		})
		.await;

	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/me");
			then.status(200).body("{}");
		})
		.await;
	let err = dispatcher.get("/me", &[]).await.expect_err("Token failure must surface.");

	assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));
	assert_eq!(err.status(), Some(401));

	api.assert_calls_async(0).await;
}

#[tokio::test]
async fn network_failures_become_transport_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body(ACCESS_TOKEN, 3600));
		})
		.await;

	let config = BrokerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url("/api/token")).expect("Mock token endpoint should parse."),
		)
		.api_base(Url::parse("http://127.0.0.1:1/v1").expect("Closed-port API base should parse."))
		.build()
		.expect("Config should build.");
	let credential = Credential::new(CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN)
		.expect("Credential should build.");
	let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
	let dispatcher =
		Dispatcher::with_clock(config, credential, clock).expect("Dispatcher should build.");
	let err = dispatcher.get("/me", &[]).await.expect_err("Closed port must fail.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert_eq!(err.status(), None);
}

#[tokio::test]
async fn slow_responses_time_out() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body(ACCESS_TOKEN, 3600));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/me");
			then.status(200).delay(std::time::Duration::from_secs(3)).body("{}");
		})
		.await;

	let config = BrokerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url("/api/token")).expect("Mock token endpoint should parse."),
		)
		.api_base(Url::parse(&server.url("/v1")).expect("Mock API base should parse."))
		.timeout(Duration::seconds(1))
		.build()
		.expect("Config should build.");
	let credential = Credential::new(CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN)
		.expect("Credential should build.");
	let dispatcher = Dispatcher::new(config, credential).expect("Dispatcher should build.");
	let err = dispatcher.get("/me", &[]).await.expect_err("Slow response must time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
}

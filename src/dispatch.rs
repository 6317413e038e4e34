//! Authenticated resource API dispatcher.
//!
//! Every verb obtains a token from the [`TokenCache`], sends one request over the shared pooled
//! client, and folds the response into a [`JsonMap`] or exactly one typed [`Error`] variant.

pub mod api;
pub mod response;

// crates.io
use reqwest::{Method, header::ACCEPT};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	cache::TokenCache,
	clock::{Clock, SystemClock},
	config::BrokerConfig,
	error::{ConfigError, TransportError},
	flows::Refresher,
	http::{self, ReqwestHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// JSON object returned by every verb.
pub type JsonMap = serde_json::Map<String, Value>;

/// HTTP verbs the dispatcher issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl Verb {
	/// Upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}

	fn method(self) -> Method {
		match self {
			Self::Get => Method::GET,
			Self::Post => Method::POST,
			Self::Put => Method::PUT,
			Self::Delete => Method::DELETE,
		}
	}
}
impl Display for Verb {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Executes Bearer-authorized calls against the resource API.
///
/// Build one per process and share it behind an [`Arc`]; it owns the pooled HTTP client and the
/// token cache.
pub struct Dispatcher {
	http: ReqwestHttpClient,
	api_base: Url,
	cache: TokenCache,
	clock: Arc<dyn Clock>,
}
impl Dispatcher {
	/// Builds a dispatcher on the wall clock.
	pub fn new(config: BrokerConfig, credential: Credential) -> Result<Self> {
		Self::with_clock(config, credential, Arc::new(SystemClock))
	}

	/// Builds a dispatcher from `SPOTIFY_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::new(BrokerConfig::from_env()?, Credential::from_env()?)
	}

	/// Builds a dispatcher whose expiry checks read `clock`.
	pub fn with_clock(
		config: BrokerConfig,
		credential: Credential,
		clock: Arc<dyn Clock>,
	) -> Result<Self> {
		let http = ReqwestHttpClient::from_config(&config)?;
		let refresher = Refresher::new(http.clone(), &config, credential, clock.clone());
		let cache = TokenCache::new(refresher, clock.clone());

		Ok(Self { http, api_base: config.endpoints.api_base, cache, clock })
	}

	/// Token cache backing this dispatcher.
	pub fn token_cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Issues a `GET`.
	pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<JsonMap> {
		self.send(Verb::Get, endpoint, params, None).await
	}

	/// Issues a `POST` with an optional JSON body.
	pub async fn post(
		&self,
		endpoint: &str,
		params: &[(&str, String)],
		body: Option<&Value>,
	) -> Result<JsonMap> {
		self.send(Verb::Post, endpoint, params, body).await
	}

	/// Issues a `PUT` with an optional JSON body.
	pub async fn put(
		&self,
		endpoint: &str,
		params: &[(&str, String)],
		body: Option<&Value>,
	) -> Result<JsonMap> {
		self.send(Verb::Put, endpoint, params, body).await
	}

	/// Issues a `DELETE`.
	pub async fn delete(&self, endpoint: &str, params: &[(&str, String)]) -> Result<JsonMap> {
		self.send(Verb::Delete, endpoint, params, None).await
	}

	/// Issues an arbitrary verb against `endpoint`, relative to the API base.
	pub async fn send(
		&self,
		verb: Verb,
		endpoint: &str,
		params: &[(&str, String)],
		body: Option<&Value>,
	) -> Result<JsonMap> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, verb.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_inner(verb, endpoint, params, body)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn send_inner(
		&self,
		verb: Verb,
		endpoint: &str,
		params: &[(&str, String)],
		body: Option<&Value>,
	) -> Result<JsonMap> {
		let url = self.endpoint_url(endpoint)?;
		let token = self.cache.get_access_token().await?;
		let mut request = self
			.http
			.request(verb.method(), url)
			.bearer_auth(token)
			.header(ACCEPT, "application/json");

		if !params.is_empty() {
			request = request.query(params);
		}
		if let Some(body) = body {
			request = request.json(body);
		}

		let response = request.send().await.map_err(|e| {
			if e.is_builder() {
				return Error::from(ConfigError::request_build(e));
			}

			obs::trace_transport_failure(verb.as_str(), endpoint, &e);

			TransportError::from(e).into()
		})?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers(), self.clock.now());
		let text = response.text().await.map_err(|e| {
			obs::trace_transport_failure(verb.as_str(), endpoint, &e);

			TransportError::from(e)
		})?;

		obs::record_api_response(verb.as_str(), status.as_u16());

		response::classify(status, &text, retry_after).map_err(|e| {
			obs::trace_api_error(verb.as_str(), endpoint, e.status);

			e.into()
		})
	}

	fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		join_endpoint(&self.api_base, endpoint)
	}
}
impl Debug for Dispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("api_base", &self.api_base.as_str())
			.field("cache", &self.cache)
			.finish()
	}
}

/// Appends `endpoint` to `base` verbatim, inserting a single `/` between them.
///
/// Unlike [`Url::join`], the base's last path segment (`/v1`) is always kept. Blank endpoints
/// and absolute URLs are rejected.
pub fn join_endpoint(base: &Url, endpoint: &str) -> Result<Url, ConfigError> {
	if endpoint.trim().is_empty() || endpoint.contains("://") {
		return Err(ConfigError::InvalidPath { path: endpoint.to_owned() });
	}

	let trimmed = base.as_str().trim_end_matches('/');
	let raw = if endpoint.starts_with('/') {
		format!("{trimmed}{endpoint}")
	} else {
		format!("{trimmed}/{endpoint}")
	};

	Url::parse(&raw).map_err(|_| ConfigError::InvalidPath { path: endpoint.to_owned() })
}

//! Broker-level error taxonomy shared by the token cache, refresher, and dispatcher.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Every failure path of the broker resolves to exactly one of these variants; nothing is
/// retried and nothing is downgraded to an empty success.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected at construction or request-build time.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No usable access token could be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// The resource API answered with an error status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Network-level failure while talking to the resource API.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(err) => Some(err.status),
			Self::Auth(AuthError::Rejected { status, .. }) => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required credential field was missing or empty.
	#[error("Required credential `{name}` is missing.")]
	MissingCredential {
		/// Environment variable or field name that was absent.
		name: &'static str,
	},
	/// The client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] crate::auth::IdentifierError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// An endpoint URL cannot be parsed or uses an unsupported scheme.
	#[error("Endpoint `{endpoint}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Endpoint label (token, authorize, api_base).
		endpoint: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Request timeout must be strictly positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Resource endpoint path cannot be joined onto the API base URL.
	#[error("Endpoint path `{path}` cannot be joined onto the API base URL.")]
	InvalidPath {
		/// Offending endpoint path.
		path: String,
	},
	/// Outbound request could not be assembled (e.g. a body that fails to serialize).
	#[error("Request could not be built.")]
	RequestBuild {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// Token state builder validation failed.
	#[error("Unable to build token state.")]
	TokenBuild(#[from] crate::auth::TokenStateBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a request builder failure inside [`ConfigError`].
	pub fn request_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::RequestBuild { source: Box::new(src) }
	}
}

/// Failures raised while obtaining an access token.
///
/// The type is [`Clone`] so a single failed refresh can be handed to every caller that waited on
/// it.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// No refresh token is available, so no access token can be minted.
	#[error("No refresh token is available; complete the authorization flow first.")]
	MissingRefreshToken,
	/// Token endpoint answered with a non-success status.
	#[error("Token refresh failed: {status} - {body}")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint could not be reached.
	#[error("Network error occurred while calling the token endpoint.")]
	Unreachable {
		/// Transport failure.
		#[source]
		source: Arc<ReqwestError>,
	},
	/// Token endpoint responded with a success status but an unusable body.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Token endpoint returned an `expires_in` that cannot be represented.
	#[error("The expires_in value {expires_in} is outside the supported range.")]
	ExpiresInOutOfRange {
		/// Raw `expires_in` value.
		expires_in: u64,
	},
	/// Authorization redirect carried a state value that does not match the session.
	#[error("Authorization state mismatch.")]
	StateMismatch,
}
impl From<ReqwestError> for AuthError {
	fn from(e: ReqwestError) -> Self {
		Self::Unreachable { source: Arc::new(e) }
	}
}

/// Error status returned by the resource API.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Spotify API error {status}: {message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Best-effort message (`error.message` or the raw body).
	pub message: String,
	/// Retry-After hint supplied by the API, surfaced verbatim and never acted upon.
	pub retry_after: Option<Duration>,
}
impl ApiError {
	/// Creates an error without a retry hint.
	pub fn new(status: u16, message: impl Into<String>) -> Self {
		Self { status, message: message.into(), retry_after: None }
	}

	/// Attaches a retry hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request did not complete before the configured timeout.
	#[error("Request timed out while calling the Spotify API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Spotify API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the Spotify API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

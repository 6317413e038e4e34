//! Normalizes resource API responses into a JSON object or an [`ApiError`].

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, dispatch::JsonMap, error::ApiError};

/// Key used when a successful body is valid JSON but not an object.
pub const WRAPPED_VALUE_KEY: &str = "value";

#[derive(Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

/// Classifies a completed response.
///
/// Order matters: `204` succeeds with an empty object, then any status of `400` or above
/// becomes an [`ApiError`] (even with a blank body), then a blank body succeeds with an empty
/// object, and only then is the body parsed as JSON.
pub fn classify(
	status: StatusCode,
	body: &str,
	retry_after: Option<Duration>,
) -> Result<JsonMap, ApiError> {
	if status == StatusCode::NO_CONTENT {
		return Ok(JsonMap::new());
	}
	if status.as_u16() >= 400 {
		let error = ApiError::new(status.as_u16(), error_message(body));

		return Err(error.with_retry_after(retry_after));
	}
	if body.trim().is_empty() {
		return Ok(JsonMap::new());
	}

	Ok(match serde_json::from_str::<Value>(body) {
		Ok(Value::Object(map)) => map,
		Ok(other) => JsonMap::from_iter([(WRAPPED_VALUE_KEY.to_owned(), other)]),
		// Player control endpoints answer plain text on success.
		Err(_) => JsonMap::new(),
	})
}

fn error_message(body: &str) -> String {
	if body.trim().is_empty() {
		return String::new();
	}

	serde_json::from_str::<ErrorEnvelope>(body)
		.map(|envelope| envelope.error.message)
		.unwrap_or_else(|_| body.to_owned())
}

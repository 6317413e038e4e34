// self
use crate::{_prelude::*, auth::ScopeValidationError, error::AuthError, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("spotify_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Notes a completed refresh; `rotated` flags a new refresh token from the provider.
pub fn trace_refresh_success(expires_in: Duration, rotated: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(expires_in = expires_in.whole_seconds(), rotated, "access token refreshed");

		if rotated {
			tracing::warn!(
				"provider rotated the refresh token; the new value is held in memory only"
			);
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (expires_in, rotated);
	}
}

/// Notes a failed refresh.
pub fn trace_refresh_failure(error: &AuthError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "access token refresh failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Notes a caller that reused the outcome of a refresh it waited on.
pub fn trace_refresh_shared(success: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(success, "reused in-flight refresh outcome");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = success;
	}
}

/// Notes a granted scope string that could not be normalized and was dropped.
pub fn trace_unparsed_scope(raw: &str, error: &ScopeValidationError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(scope = raw, %error, "granted scope could not be parsed; dropping it");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (raw, error);
	}
}

/// Notes an error status returned by the resource API.
pub fn trace_api_error(method: &'static str, endpoint: &str, status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(method, endpoint, status, "Spotify API returned an error status");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, endpoint, status);
	}
}

/// Notes a network-level failure while calling the resource API.
pub fn trace_transport_failure(method: &'static str, endpoint: &str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(method, endpoint, %error, "Spotify API request failed in transport");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, endpoint, error);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn event_helpers_accept_all_inputs() {
		trace_refresh_success(Duration::hours(1), true);
		trace_refresh_failure(&AuthError::MissingRefreshToken);
		trace_refresh_shared(false);
		trace_api_error("GET", "/me", 404);
		trace_unparsed_scope("a b", &ScopeValidationError::Empty);
	}
}

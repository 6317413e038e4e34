//! Single-flight access-token cache.
//!
//! Readers take a shared lock and return the cached token while it is outside the expiry
//! buffer. Once it is not, callers queue on one async gate; the first through performs the
//! refresh and every caller that queued behind it adopts that outcome, success or failure,
//! instead of starting another exchange.

// self
use crate::{
	_prelude::*,
	auth::TokenState,
	clock::Clock,
	error::AuthError,
	flows::{RefreshMetrics, Refresher},
	obs,
};

#[derive(Default)]
struct Slot {
	state: Option<TokenState>,
	// Bumped once per completed refresh attempt.
	epoch: u64,
	last_failure: Option<AuthError>,
}

/// Holds at most one [`TokenState`] and guarantees at most one refresh in flight.
pub struct TokenCache {
	refresher: Refresher,
	clock: Arc<dyn Clock>,
	slot: RwLock<Slot>,
	gate: AsyncMutex<()>,
}
impl TokenCache {
	/// Creates an empty cache; the first [`TokenCache::get_access_token`] call refreshes.
	pub fn new(refresher: Refresher, clock: Arc<dyn Clock>) -> Self {
		Self { refresher, clock, slot: Default::default(), gate: AsyncMutex::new(()) }
	}

	/// Returns a usable access token, refreshing first when the cached one is missing or inside
	/// the expiry buffer.
	///
	/// A failed refresh leaves the previously cached state untouched and is reported to every
	/// caller that waited on it.
	pub async fn get_access_token(&self) -> Result<String, AuthError> {
		let observed_epoch = {
			let slot = self.slot.read();
			let now = self.clock.now();

			if let Some(state) = slot.state.as_ref().filter(|state| !state.is_expired_at(now)) {
				return Ok(state.access_token.expose().to_owned());
			}

			slot.epoch
		};
		let _gate = self.gate.lock().await;

		{
			let slot = self.slot.read();

			// Someone else refreshed while this caller was queued; adopt their outcome.
			if slot.epoch != observed_epoch {
				let shared = match (&slot.last_failure, &slot.state) {
					(Some(e), _) => Err(e.clone()),
					(None, Some(state)) => Ok(state.access_token.expose().to_owned()),
					(None, None) => Err(AuthError::MissingRefreshToken),
				};

				self.refresher.metrics().record_shared();
				obs::trace_refresh_shared(shared.is_ok());

				return shared;
			}
		}

		let outcome = self.refresher.refresh().await;
		let mut slot = self.slot.write();

		slot.epoch = slot.epoch.wrapping_add(1);

		match outcome {
			Ok(state) => {
				let token = state.access_token.expose().to_owned();

				slot.state = Some(state);
				slot.last_failure = None;

				Ok(token)
			},
			Err(e) => {
				slot.last_failure = Some(e.clone());

				Err(e)
			},
		}
	}

	/// Copy of the cached state, if any.
	pub fn snapshot(&self) -> Option<TokenState> {
		self.slot.read().state.clone()
	}

	/// Exchange counters of the underlying refresher.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresher.metrics()
	}

	/// Underlying refresher, e.g. to read a rotated refresh token.
	pub fn refresher(&self) -> &Refresher {
		&self.refresher
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slot = self.slot.read();

		f.debug_struct("TokenCache")
			.field("refresher", &self.refresher)
			.field("state", &slot.state)
			.field("epoch", &slot.epoch)
			.finish()
	}
}

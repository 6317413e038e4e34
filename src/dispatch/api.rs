//! Typed convenience operations over the four verbs.
//!
//! Each method maps to one Spotify Web API endpoint and returns the normalized [`JsonMap`]
//! unchanged. Optional arguments are only put on the wire when present.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	dispatch::{Dispatcher, JsonMap},
	error::ConfigError,
};

/// Market used for artist top tracks when none is given.
pub const DEFAULT_MARKET: &str = "US";
/// Album groups requested for an artist's discography when none are given.
pub const DEFAULT_INCLUDE_GROUPS: &str = "album,single";

/// Repeat modes accepted by the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatState {
	/// Repeat the current track.
	Track,
	/// Repeat the current context (album, playlist, ...).
	Context,
	/// Disable repeat.
	Off,
}
impl RepeatState {
	/// Wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Track => "track",
			Self::Context => "context",
			Self::Off => "off",
		}
	}
}
impl FromStr for RepeatState {
	type Err = UnknownRepeatState;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"track" => Ok(Self::Track),
			"context" => Ok(Self::Context),
			"off" => Ok(Self::Off),
			other => Err(UnknownRepeatState(other.to_owned())),
		}
	}
}

/// Returned when a repeat mode string is not `track`, `context`, or `off`.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown repeat state `{0}`.")]
pub struct UnknownRepeatState(pub String);

/// Body of a start/resume playback request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlayRequest {
	/// Album, artist, or playlist URI to play.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context_uri: Option<String>,
	/// Track URIs to play.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub uris: Option<Vec<String>>,
	/// Position inside the context, e.g. `{"position": 5}` or `{"uri": "..."}`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub offset: Option<Value>,
	/// Start position in milliseconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub position_ms: Option<u64>,
}
impl PlayRequest {
	fn is_empty(&self) -> bool {
		self.context_uri.is_none()
			&& self.uris.as_ref().is_none_or(Vec::is_empty)
			&& self.offset.is_none()
			&& self.position_ms.is_none()
	}
}

/// Search request parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
	/// Free-text query.
	pub query: String,
	/// Item types, joined with `,` on the wire.
	pub types: Vec<String>,
	/// Page size, clamped to `1..=50`.
	pub limit: u32,
	/// Page offset.
	pub offset: u32,
	/// Optional market filter.
	pub market: Option<String>,
}
impl SearchQuery {
	/// Track search with the default page size.
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			types: vec!["track".into()],
			limit: 20,
			offset: 0,
			market: None,
		}
	}

	/// Overrides the searched item types.
	pub fn types<I, S>(mut self, types: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.types = types.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the page size.
	pub fn limit(mut self, limit: u32) -> Self {
		self.limit = limit;

		self
	}

	/// Overrides the page offset.
	pub fn offset(mut self, offset: u32) -> Self {
		self.offset = offset;

		self
	}

	/// Restricts results to a market.
	pub fn market(mut self, market: impl Into<String>) -> Self {
		self.market = Some(market.into());

		self
	}

	fn params(&self) -> Vec<(&'static str, String)> {
		let mut params = vec![
			("q", self.query.clone()),
			("type", self.types.join(",")),
			("limit", self.limit.clamp(1, 50).to_string()),
			("offset", self.offset.to_string()),
		];

		push_opt(&mut params, "market", self.market.as_deref());

		params
	}
}

impl Dispatcher {
	/// Current playback state.
	pub async fn playback_state(&self) -> Result<JsonMap> {
		self.get("/me/player", &[]).await
	}

	/// Currently playing item.
	pub async fn currently_playing(&self) -> Result<JsonMap> {
		self.get("/me/player/currently-playing", &[]).await
	}

	/// Starts or resumes playback.
	pub async fn play(&self, request: &PlayRequest, device_id: Option<&str>) -> Result<JsonMap> {
		let body = if request.is_empty() {
			None
		} else {
			Some(serde_json::to_value(request).map_err(ConfigError::request_build)?)
		};

		self.put("/me/player/play", &device_params(device_id), body.as_ref()).await
	}

	/// Pauses playback.
	pub async fn pause(&self, device_id: Option<&str>) -> Result<JsonMap> {
		self.put("/me/player/pause", &device_params(device_id), None).await
	}

	/// Skips to the next item.
	pub async fn skip_to_next(&self, device_id: Option<&str>) -> Result<JsonMap> {
		self.post("/me/player/next", &device_params(device_id), None).await
	}

	/// Skips to the previous item.
	pub async fn skip_to_previous(&self, device_id: Option<&str>) -> Result<JsonMap> {
		self.post("/me/player/previous", &device_params(device_id), None).await
	}

	/// Seeks within the current item.
	pub async fn seek(&self, position_ms: u64, device_id: Option<&str>) -> Result<JsonMap> {
		let mut params = vec![("position_ms", position_ms.to_string())];

		push_opt(&mut params, "device_id", device_id);

		self.put("/me/player/seek", &params, None).await
	}

	/// Sets the volume; values outside `0..=100` are clamped.
	pub async fn set_volume(
		&self,
		volume_percent: i32,
		device_id: Option<&str>,
	) -> Result<JsonMap> {
		let mut params = vec![("volume_percent", volume_percent.clamp(0, 100).to_string())];

		push_opt(&mut params, "device_id", device_id);

		self.put("/me/player/volume", &params, None).await
	}

	/// Toggles shuffle.
	pub async fn set_shuffle(&self, state: bool, device_id: Option<&str>) -> Result<JsonMap> {
		let mut params = vec![("state", state.to_string())];

		push_opt(&mut params, "device_id", device_id);

		self.put("/me/player/shuffle", &params, None).await
	}

	/// Sets the repeat mode.
	pub async fn set_repeat(
		&self,
		state: RepeatState,
		device_id: Option<&str>,
	) -> Result<JsonMap> {
		let mut params = vec![("state", state.as_str().to_owned())];

		push_opt(&mut params, "device_id", device_id);

		self.put("/me/player/repeat", &params, None).await
	}

	/// Available playback devices.
	pub async fn devices(&self) -> Result<JsonMap> {
		self.get("/me/player/devices", &[]).await
	}

	/// Moves playback to `device_id`, optionally starting it.
	pub async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<JsonMap> {
		let body = json!({ "device_ids": [device_id], "play": play });

		self.put("/me/player", &[], Some(&body)).await
	}

	/// Appends an item to the queue.
	pub async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<JsonMap> {
		let mut params = vec![("uri", uri.to_owned())];

		push_opt(&mut params, "device_id", device_id);

		self.post("/me/player/queue", &params, None).await
	}

	/// Current queue.
	pub async fn queue(&self) -> Result<JsonMap> {
		self.get("/me/player/queue", &[]).await
	}

	/// Searches the catalog.
	pub async fn search(&self, query: &SearchQuery) -> Result<JsonMap> {
		self.get("/search", &query.params()).await
	}

	/// Track details.
	pub async fn track(&self, track_id: &str) -> Result<JsonMap> {
		self.get(&format!("/tracks/{track_id}"), &[]).await
	}

	/// Album details.
	pub async fn album(&self, album_id: &str) -> Result<JsonMap> {
		self.get(&format!("/albums/{album_id}"), &[]).await
	}

	/// One page of an album's tracks.
	pub async fn album_tracks(&self, album_id: &str, limit: u32, offset: u32) -> Result<JsonMap> {
		self.get(&format!("/albums/{album_id}/tracks"), &page(limit, offset)).await
	}

	/// Artist details.
	pub async fn artist(&self, artist_id: &str) -> Result<JsonMap> {
		self.get(&format!("/artists/{artist_id}"), &[]).await
	}

	/// An artist's top tracks in `market` (default [`DEFAULT_MARKET`]).
	pub async fn artist_top_tracks(
		&self,
		artist_id: &str,
		market: Option<&str>,
	) -> Result<JsonMap> {
		let params = [("market", market.unwrap_or(DEFAULT_MARKET).to_owned())];

		self.get(&format!("/artists/{artist_id}/top-tracks"), &params).await
	}

	/// An artist's albums (default groups [`DEFAULT_INCLUDE_GROUPS`]).
	pub async fn artist_albums(
		&self,
		artist_id: &str,
		include_groups: Option<&str>,
		limit: u32,
	) -> Result<JsonMap> {
		let params = [
			("include_groups", include_groups.unwrap_or(DEFAULT_INCLUDE_GROUPS).to_owned()),
			("limit", limit.to_string()),
		];

		self.get(&format!("/artists/{artist_id}/albums"), &params).await
	}

	/// Playlist details.
	pub async fn playlist(&self, playlist_id: &str) -> Result<JsonMap> {
		self.get(&format!("/playlists/{playlist_id}"), &[]).await
	}

	/// One page of a playlist's items.
	pub async fn playlist_tracks(
		&self,
		playlist_id: &str,
		limit: u32,
		offset: u32,
	) -> Result<JsonMap> {
		self.get(&format!("/playlists/{playlist_id}/tracks"), &page(limit, offset)).await
	}

	/// One page of the current user's playlists.
	pub async fn my_playlists(&self, limit: u32, offset: u32) -> Result<JsonMap> {
		self.get("/me/playlists", &page(limit, offset)).await
	}

	/// Creates a playlist owned by `user_id`.
	pub async fn create_playlist(
		&self,
		user_id: &str,
		name: &str,
		public: bool,
		description: &str,
	) -> Result<JsonMap> {
		let body = json!({ "name": name, "public": public, "description": description });

		self.post(&format!("/users/{user_id}/playlists"), &[], Some(&body)).await
	}

	/// Adds items to a playlist, appending unless `position` is given.
	pub async fn add_tracks_to_playlist(
		&self,
		playlist_id: &str,
		uris: &[&str],
		position: Option<u32>,
	) -> Result<JsonMap> {
		let mut body = json!({ "uris": uris });

		if let (Some(position), Some(object)) = (position, body.as_object_mut()) {
			object.insert("position".into(), position.into());
		}

		self.post(&format!("/playlists/{playlist_id}/tracks"), &[], Some(&body)).await
	}

	/// Current user's profile.
	pub async fn me(&self) -> Result<JsonMap> {
		self.get("/me", &[]).await
	}

	/// One page of the current user's saved tracks.
	pub async fn saved_tracks(&self, limit: u32, offset: u32) -> Result<JsonMap> {
		self.get("/me/tracks", &page(limit, offset)).await
	}

	/// Saves tracks to the library.
	pub async fn save_tracks(&self, track_ids: &[&str]) -> Result<JsonMap> {
		let body = json!({ "ids": track_ids });

		self.put("/me/tracks", &[], Some(&body)).await
	}

	/// Removes tracks from the library.
	pub async fn remove_saved_tracks(&self, track_ids: &[&str]) -> Result<JsonMap> {
		self.delete("/me/tracks", &[("ids", track_ids.join(","))]).await
	}

	/// Recently played tracks.
	pub async fn recently_played(&self, limit: u32) -> Result<JsonMap> {
		self.get("/me/player/recently-played", &[("limit", limit.to_string())]).await
	}
}

fn device_params(device_id: Option<&str>) -> Vec<(&'static str, String)> {
	let mut params = Vec::new();

	push_opt(&mut params, "device_id", device_id);

	params
}

fn page(limit: u32, offset: u32) -> [(&'static str, String); 2] {
	[("limit", limit.to_string()), ("offset", offset.to_string())]
}

fn push_opt(params: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
	if let Some(value) = value.filter(|v| !v.is_empty()) {
		params.push((key, value.to_owned()));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn search_clamps_limit_and_joins_types() {
		let params = SearchQuery::new("daft punk").types(["track", "artist"]).limit(500).params();

		assert_eq!(params[0], ("q", "daft punk".into()));
		assert_eq!(params[1], ("type", "track,artist".into()));
		assert_eq!(params[2], ("limit", "50".into()));
		assert_eq!(params.len(), 4);

		let params = SearchQuery::new("x").limit(0).market("SE").params();

		assert_eq!(params[2], ("limit", "1".into()));
		assert_eq!(params[4], ("market", "SE".into()));
	}

	#[test]
	fn device_id_is_only_sent_when_present() {
		assert!(device_params(None).is_empty());
		assert!(device_params(Some("")).is_empty());
		assert_eq!(device_params(Some("dev-1")), vec![("device_id", "dev-1".to_owned())]);
	}

	#[test]
	fn empty_play_request_has_no_body() {
		assert!(PlayRequest::default().is_empty());

		let request = PlayRequest { position_ms: Some(0), ..Default::default() };

		assert!(!request.is_empty());
		assert_eq!(
			serde_json::to_value(&request).expect("Play request should serialize."),
			json!({ "position_ms": 0 })
		);
	}

	#[test]
	fn repeat_state_round_trips_wire_values() {
		assert_eq!("context".parse::<RepeatState>(), Ok(RepeatState::Context));
		assert_eq!(RepeatState::Track.as_str(), "track");
		assert!("forever".parse::<RepeatState>().is_err());
	}
}

use async_trait::async_trait;
use rspotify::clients::{BaseClient, OAuthClient};
use rspotify::model::{IdError, PlayableId, PlaylistId, SearchResult, SearchType, TrackId, UserId};
use rspotify::prelude::Id;
use rspotify::{AuthCodeSpotify, ClientError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Spotify API error: {0}")]
    SpotifyApiError(#[from] ClientError),
    #[error("Invalid Spotify id: {0}")]
    InvalidId(#[from] IdError),
    #[error("Search returned no track listing")]
    UnexpectedSearchResult,
}

/// Service-assigned id of a track that matched a chart entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub public: bool,
    pub description: String,
}

/// The streaming-service operations the pipeline needs, behind a seam so the
/// resolver and playlist code can run against a scripted double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamingApi: Send + Sync {
    /// Runs a track search and returns candidate ids in service order.
    async fn search_tracks(&self, query: &str) -> Result<Vec<ResolvedTrack>, ApiError>;

    /// Creates a private, non-collaborative playlist owned by `user_id`.
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist, ApiError>;

    async fn add_tracks(&self, playlist_id: &str, tracks: Vec<ResolvedTrack>)
        -> Result<(), ApiError>;
}

/// [`StreamingApi`] backed by an authorized rspotify client.
pub struct SpotifyApi {
    spotify: AuthCodeSpotify,
}

impl SpotifyApi {
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        Self { spotify }
    }

    pub async fn current_user_id(&self) -> Result<String, ApiError> {
        let user = self.spotify.current_user().await?;
        Ok(user.id.id().to_string())
    }
}

#[async_trait]
impl StreamingApi for SpotifyApi {
    async fn search_tracks(&self, query: &str) -> Result<Vec<ResolvedTrack>, ApiError> {
        let result = self
            .spotify
            .search(query, SearchType::Track, None, None, Some(1), None)
            .await?;

        match result {
            SearchResult::Tracks(tracks) => Ok(tracks
                .items
                .into_iter()
                .filter_map(|track| track.id)
                .map(|id| ResolvedTrack(id.id().to_string()))
                .collect()),
            _ => Err(ApiError::UnexpectedSearchResult),
        }
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist, ApiError> {
        let user_id = UserId::from_id(user_id)?;
        let playlist = self
            .spotify
            .user_playlist_create(user_id, name, Some(false), Some(false), Some(description))
            .await?;

        Ok(Playlist {
            id: playlist.id.id().to_string(),
            name: playlist.name,
            public: playlist.public.unwrap_or(false),
            description: description.to_string(),
        })
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        tracks: Vec<ResolvedTrack>,
    ) -> Result<(), ApiError> {
        let playlist_id = PlaylistId::from_id(playlist_id)?;
        let playable_ids = tracks
            .into_iter()
            .map(|track| TrackId::from_id(track.0).map(PlayableId::from))
            .collect::<Result<Vec<_>, _>>()?;

        self.spotify
            .playlist_add_items(playlist_id, playable_ids, None)
            .await?;

        Ok(())
    }
}

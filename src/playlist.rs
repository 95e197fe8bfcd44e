use tracing::{debug, error, info};

use crate::date::ChartDate;
use crate::spotify::{ApiError, Playlist, ResolvedTrack, StreamingApi};

/// Largest item count the bulk-append endpoint accepts per call.
pub const BATCH_SIZE: usize = 100;

/// Result of a batched append. Batches before a failure stay committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub appended: usize,
    pub requested: usize,
    pub batches: usize,
    /// 1-based index of the batch that failed, if any.
    pub failed_batch: Option<usize>,
}

impl AppendOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_batch.is_none()
    }
}

pub fn playlist_name(date: &ChartDate) -> String {
    format!("Billboard 100 - {date}")
}

pub fn playlist_description(date: &ChartDate) -> String {
    format!("Billboard Hot 100 songs from {date}")
}

pub struct PlaylistService<'a, S: StreamingApi> {
    api: &'a S,
}

impl<'a, S: StreamingApi> PlaylistService<'a, S> {
    pub fn new(api: &'a S) -> Self {
        Self { api }
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist, ApiError> {
        match self.api.create_playlist(user_id, name, description).await {
            Ok(playlist) => {
                let visibility = if playlist.public { "public" } else { "private" };
                info!("Created {} playlist '{}' ({})", visibility, playlist.name, playlist.id);
                debug!("Playlist description: {}", playlist.description);
                Ok(playlist)
            }
            Err(e) => {
                error!("Failed to create playlist: {}", e);
                Err(e)
            }
        }
    }

    /// Appends `tracks` in order, one call per batch of [`BATCH_SIZE`].
    /// Stops at the first failed batch without retrying or rolling back.
    pub async fn append_tracks(&self, playlist_id: &str, tracks: &[ResolvedTrack]) -> AppendOutcome {
        let mut outcome = AppendOutcome {
            appended: 0,
            requested: tracks.len(),
            batches: 0,
            failed_batch: None,
        };

        if tracks.is_empty() {
            info!("No songs to add to playlist");
            return outcome;
        }

        for (index, chunk) in tracks.chunks(BATCH_SIZE).enumerate() {
            match self.api.add_tracks(playlist_id, chunk.to_vec()).await {
                Ok(()) => {
                    outcome.appended += chunk.len();
                    outcome.batches += 1;
                    info!("Added batch of {} songs", chunk.len());
                }
                Err(e) => {
                    outcome.failed_batch = Some(index + 1);
                    error!(
                        batch = index + 1,
                        "Failed to add songs to playlist: {} ({} of {} added)",
                        e,
                        outcome.appended,
                        outcome.requested
                    );
                    break;
                }
            }
        }

        if outcome.is_complete() {
            info!("Successfully added total of {} songs", outcome.appended);
        }

        outcome
    }
}

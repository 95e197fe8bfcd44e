use tracing::{info, warn};

use crate::spotify::{ResolvedTrack, StreamingApi};

pub struct TrackResolver<'a, S: StreamingApi> {
    api: &'a S,
}

impl<'a, S: StreamingApi> TrackResolver<'a, S> {
    pub fn new(api: &'a S) -> Self {
        Self { api }
    }

    /// Best match for `title` among tracks released in `year`, trusting the
    /// service's own ranking. Search failures count as no match.
    pub async fn resolve(&self, title: &str, year: i32) -> Option<ResolvedTrack> {
        let query = search_query(title, year);

        match self.api.search_tracks(&query).await {
            Ok(tracks) => match tracks.into_iter().next() {
                Some(track) => {
                    info!("Found: {}", title);
                    Some(track)
                }
                None => {
                    info!("No results found for '{}'", title);
                    None
                }
            },
            Err(e) => {
                warn!(title = %title, "Spotify API error while searching: {}", e);
                None
            }
        }
    }

    /// Resolves every title in rank order; unmatched titles are left out.
    pub async fn resolve_all(&self, titles: &[String], year: i32) -> Vec<ResolvedTrack> {
        let mut resolved = Vec::with_capacity(titles.len());
        for title in titles {
            if let Some(track) = self.resolve(title, year).await {
                resolved.push(track);
            }
        }
        resolved
    }
}

fn search_query(title: &str, year: i32) -> String {
    format!("track:\"{}\" year:{}", title.replace('"', ""), year)
}

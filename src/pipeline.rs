use std::fmt;

use tokio::io::{AsyncBufRead, Lines};
use tracing::{debug, info, warn};

use crate::date::{validate, ChartDate};
use crate::playlist::{playlist_description, playlist_name, AppendOutcome, PlaylistService};
use crate::resolver::TrackResolver;
use crate::spotify::StreamingApi;
use crate::web_scraper::ChartSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingDate,
    ChartFetched,
    PlaylistCreated,
    TracksResolved,
    Completed,
    Aborted,
}

/// Why a run stopped before populating a playlist. None of these is a
/// process failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    ChartUnavailable,
    NoSongsFound,
    PlaylistCreationFailed,
    NoTracksResolved,
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            AbortReason::ChartUnavailable => "chart unavailable",
            AbortReason::NoSongsFound => "no songs found",
            AbortReason::PlaylistCreationFailed => "failed to create playlist",
            AbortReason::NoTracksResolved => "no songs found on service",
            AbortReason::Cancelled => "cancelled by user",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(AppendOutcome),
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            RunOutcome::Completed(_) => PipelineState::Completed,
            RunOutcome::Aborted(_) => PipelineState::Aborted,
        }
    }
}

/// Chart-to-playlist run for one authenticated user.
pub struct Pipeline<'a, C: ChartSource, S: StreamingApi> {
    chart: &'a C,
    api: &'a S,
    user_id: &'a str,
}

impl<'a, C: ChartSource, S: StreamingApi> Pipeline<'a, C, S> {
    pub fn new(chart: &'a C, api: &'a S, user_id: &'a str) -> Self {
        Self { chart, api, user_id }
    }

    pub async fn run(&self, date: &ChartDate) -> RunOutcome {
        let titles = match self.chart.fetch_titles(date).await {
            Ok(titles) if titles.is_empty() => return abort(AbortReason::NoSongsFound),
            Ok(titles) => titles,
            Err(e) => {
                debug!("Chart fetch failed: {}", e);
                return abort(AbortReason::ChartUnavailable);
            }
        };
        transition(PipelineState::ChartFetched);
        info!("Found {} songs on the chart for {}", titles.len(), date);

        let playlists = PlaylistService::new(self.api);
        let playlist = match playlists
            .create_playlist(self.user_id, &playlist_name(date), &playlist_description(date))
            .await
        {
            Ok(playlist) => playlist,
            Err(_) => return abort(AbortReason::PlaylistCreationFailed),
        };
        transition(PipelineState::PlaylistCreated);

        let tracks = TrackResolver::new(self.api)
            .resolve_all(&titles, date.year())
            .await;
        if tracks.is_empty() {
            return abort(AbortReason::NoTracksResolved);
        }
        transition(PipelineState::TracksResolved);
        info!("Resolved {} of {} songs", tracks.len(), titles.len());

        let outcome = playlists.append_tracks(&playlist.id, &tracks).await;
        if !outcome.is_complete() {
            warn!(
                "Playlist '{}' holds {} of {} songs",
                playlist.name, outcome.appended, outcome.requested
            );
        }
        transition(PipelineState::Completed);

        RunOutcome::Completed(outcome)
    }
}

fn transition(state: PipelineState) {
    debug!(?state, "pipeline state");
}

fn abort(reason: AbortReason) -> RunOutcome {
    transition(PipelineState::Aborted);
    RunOutcome::Aborted(reason)
}

/// Logs the terminal state of a run.
pub fn report(outcome: &RunOutcome) {
    debug!(state = ?outcome.state(), "run finished");
    match outcome {
        RunOutcome::Completed(append) => info!(
            "Done: {} of {} songs added in {} batches",
            append.appended, append.requested, append.batches
        ),
        RunOutcome::Aborted(AbortReason::Cancelled) => info!("Operation cancelled by user"),
        RunOutcome::Aborted(reason) => info!("Stopped: {}. Exiting.", reason),
    }
}

/// Prompts until a valid date is entered. `None` once input is exhausted.
pub async fn prompt_for_date<R>(input: &mut Lines<R>) -> std::io::Result<Option<ChartDate>>
where
    R: AsyncBufRead + Unpin,
{
    use std::io::Write;

    transition(PipelineState::AwaitingDate);
    loop {
        print!("Enter date (YYYY-MM-DD): ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };

        let text = line.trim();
        if validate(text) {
            return Ok(ChartDate::parse(text));
        }
        println!("Invalid date format. Please use YYYY-MM-DD");
    }
}

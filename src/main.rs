mod config;
mod date;
mod logging;
mod pipeline;
mod playlist;
mod resolver;
mod spotify;
mod spotify_auth;
mod web_scraper;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::date::ChartDate;
use crate::pipeline::{prompt_for_date, report, AbortReason, Pipeline, RunOutcome};
use crate::spotify::{ApiError, SpotifyApi};
use crate::spotify_auth::{authenticate, AuthError};
use crate::web_scraper::ChartClient;

/// Turns a Billboard Hot 100 chart into a private Spotify playlist.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Redirect URI registered for the Spotify application
    #[arg(long, env = "SPOTIFY_REDIRECT_URI")]
    redirect_uri: Option<String>,

    /// Chart listing the date is appended to
    #[arg(
        long,
        env = "CHART_BASE_URL",
        default_value = "https://www.billboard.com/charts/hot-100/"
    )]
    chart_url: String,

    /// Where the Spotify token is cached between runs
    #[arg(
        long,
        env = "SPOTIFY_TOKEN_CACHE",
        default_value = "spotify_cache/.spotify_token_cache.json"
    )]
    token_cache: PathBuf,

    /// Chart date (YYYY-MM-DD); prompts when omitted
    #[arg(short, long)]
    date: Option<String>,

    /// Log filter, e.g. `info` or `chart_playlist=debug`
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

/// Failures that end the process with a non-zero status.
#[derive(Debug, Error)]
enum RunError {
    #[error("Failed to authenticate with Spotify: {0}")]
    Auth(#[from] AuthError),
    #[error("Failed to authenticate with Spotify: {0}")]
    CurrentUser(#[from] ApiError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();

    if let Err(e) = logging::init_tracing(&args.log_level) {
        eprintln!("Invalid log level '{}': {}", args.log_level, e);
        return ExitCode::FAILURE;
    }

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = until_cancelled(run(&config, args.date.as_deref()), tokio::signal::ctrl_c()).await;
    match &result {
        Ok(outcome) => report(outcome),
        Err(e) => error!("{}", e),
    }

    std::process::exit(exit_status(&result))
}

/// Drives `run` to completion unless `cancel` fires first.
async fn until_cancelled<F, C>(run: F, cancel: C) -> Result<RunOutcome, RunError>
where
    F: Future<Output = Result<RunOutcome, RunError>>,
    C: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = run => result,
        Ok(()) = cancel => Ok(RunOutcome::Aborted(AbortReason::Cancelled)),
    }
}

/// Every pipeline outcome, aborted or not, exits cleanly.
fn exit_status(result: &Result<RunOutcome, RunError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

async fn run(config: &Config, date_arg: Option<&str>) -> Result<RunOutcome, RunError> {
    let chart = match ChartClient::new(config.chart_url.clone()) {
        Ok(chart) => chart,
        Err(e) => {
            warn!("{}", e);
            return Ok(RunOutcome::Aborted(AbortReason::ChartUnavailable));
        }
    };

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let spotify = SpotifyApi::new(
        authenticate(&config.credentials, &config.token_cache, &mut input).await?,
    );
    let user_id = spotify.current_user_id().await?;
    info!("Authenticated as {}", user_id);

    let Some(date) = chart_date(date_arg, &mut input).await else {
        return Ok(RunOutcome::Aborted(AbortReason::Cancelled));
    };

    Ok(Pipeline::new(&chart, &spotify, &user_id).run(&date).await)
}

/// The `--date` argument when valid, otherwise the interactive prompt.
/// `None` when stdin closes before a valid date arrives.
async fn chart_date<R>(date_arg: Option<&str>, input: &mut Lines<R>) -> Option<ChartDate>
where
    R: AsyncBufRead + Unpin,
{
    if let Some(text) = date_arg {
        match ChartDate::parse(text) {
            Some(date) => return Some(date),
            None => warn!("Ignoring invalid --date '{}'", text),
        }
    }

    match prompt_for_date(input).await {
        Ok(date) => date,
        Err(e) => {
            warn!("Failed to read date: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use super::*;
    use crate::playlist::AppendOutcome;

    #[tokio::test]
    async fn interrupt_cancels_a_run_blocked_on_input() {
        let result = until_cancelled(pending(), async { Ok(()) }).await;

        assert!(matches!(
            result,
            Ok(RunOutcome::Aborted(AbortReason::Cancelled))
        ));
        assert_eq!(exit_status(&result), 0);
    }

    #[tokio::test]
    async fn finished_run_passes_through() {
        let outcome = RunOutcome::Aborted(AbortReason::NoSongsFound);
        let expected = outcome.clone();

        let result = until_cancelled(async move { Ok(outcome) }, pending()).await;

        assert_eq!(result.unwrap(), expected);
    }

    #[tokio::test]
    async fn failed_signal_listener_does_not_cancel() {
        let result = until_cancelled(
            async { Ok(RunOutcome::Aborted(AbortReason::NoTracksResolved)) },
            async { Err(std::io::Error::other("no signal handler")) },
        )
        .await;

        assert!(matches!(
            result,
            Ok(RunOutcome::Aborted(AbortReason::NoTracksResolved))
        ));
    }

    #[test]
    fn only_fatal_errors_exit_non_zero() {
        let completed = Ok(RunOutcome::Completed(AppendOutcome {
            appended: 100,
            requested: 137,
            batches: 1,
            failed_batch: Some(2),
        }));
        assert_eq!(exit_status(&completed), 0);

        for reason in [
            AbortReason::ChartUnavailable,
            AbortReason::NoSongsFound,
            AbortReason::PlaylistCreationFailed,
            AbortReason::NoTracksResolved,
            AbortReason::Cancelled,
        ] {
            assert_eq!(exit_status(&Ok(RunOutcome::Aborted(reason))), 0);
        }

        assert_eq!(exit_status(&Err(RunError::Auth(AuthError::NoRedirect))), 1);
        assert_eq!(
            exit_status(&Err(RunError::CurrentUser(ApiError::UnexpectedSearchResult))),
            1
        );
    }
}

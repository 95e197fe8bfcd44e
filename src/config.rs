use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::Args;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing Spotify credentials: {0} is not set")]
    Missing(&'static str),
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// OAuth application credentials for the Spotify Web API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Per-date chart listing; the date is appended as the last path segment.
    pub chart_url: Url,
    pub token_cache: PathBuf,
}

impl Config {
    /// Builds the run configuration from parsed arguments, which already fold
    /// in the environment and `.env`.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let client_id = required(&args.client_id, "SPOTIFY_CLIENT_ID")?;
        let client_secret = required(&args.client_secret, "SPOTIFY_CLIENT_SECRET")?;
        let redirect_uri = required(&args.redirect_uri, "SPOTIFY_REDIRECT_URI")?;
        let redirect_uri = parse_url(&redirect_uri, "SPOTIFY_REDIRECT_URI")?;

        let mut chart_url = args.chart_url.trim().to_string();
        if !chart_url.ends_with('/') {
            chart_url.push('/');
        }
        let chart_url = parse_url(&chart_url, "CHART_BASE_URL")?;

        Ok(Self {
            credentials: Credentials {
                client_id,
                client_secret,
                redirect_uri,
            },
            chart_url,
            token_cache: args.token_cache.clone(),
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_url(value: &str, name: &'static str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}

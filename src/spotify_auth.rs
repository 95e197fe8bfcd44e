use std::fs;
use std::path::Path;

use rspotify::prelude::OAuthClient;
use rspotify::{scopes, AuthCodeSpotify, ClientError, Credentials as ClientCredentials, OAuth};
use thiserror::Error;
use tokio::io::{AsyncBufRead, Lines};
use tracing::{info, warn};
use url::Url;

use crate::config::Credentials;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Spotify authentication failed: {0}")]
    SpotifyApiError(#[from] ClientError),
    #[error("Failed to prepare token cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("Failed to read redirected URL: {0}")]
    Input(#[source] std::io::Error),
    #[error("No redirected URL was entered")]
    NoRedirect,
    #[error("Redirected URL is invalid: {0}")]
    InvalidRedirect(#[from] url::ParseError),
    #[error("Redirected URL carries no authorization code")]
    MissingCode,
    #[error("Redirected URL state does not match this authorization request")]
    StateMismatch,
    #[error("Token store is unavailable")]
    TokenLock,
}

/// Exchanges application credentials for a client acting as the current user.
///
/// A cached token is reused when present; otherwise the user authorizes in
/// the browser and pastes the redirected URL back, read from `input`.
pub async fn authenticate<R>(
    credentials: &Credentials,
    token_cache: &Path,
    input: &mut Lines<R>,
) -> Result<AuthCodeSpotify, AuthError>
where
    R: AsyncBufRead + Unpin,
{
    let mut oauth = OAuth::default();
    oauth.scopes = scopes!("playlist-modify-private");
    oauth.redirect_uri = credentials.redirect_uri.to_string();

    let creds = ClientCredentials::new(&credentials.client_id, &credentials.client_secret);

    if let Some(dir) = token_cache.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(AuthError::CacheDir)?;
    }

    let config = rspotify::Config {
        token_cached: true,
        token_refreshing: true,
        cache_path: token_cache.to_path_buf(),
        ..Default::default()
    };

    let spotify = AuthCodeSpotify::with_config(creds, oauth, config);

    if !has_token_cache(token_cache) {
        info!("No cached Spotify token, starting authorization");
        handle_authorization_flow(&spotify, input).await?;
        return Ok(spotify);
    }

    match spotify.read_token_cache(true).await {
        Ok(Some(token)) => {
            *spotify.token.lock().await.map_err(|_| AuthError::TokenLock)? = Some(token);
        }
        Ok(None) => {
            handle_authorization_flow(&spotify, input).await?;
        }
        Err(e) => {
            warn!("Failed to read token cache: {}", e);
            handle_authorization_flow(&spotify, input).await?;
        }
    }

    Ok(spotify)
}

async fn handle_authorization_flow<R>(
    spotify: &AuthCodeSpotify,
    input: &mut Lines<R>,
) -> Result<(), AuthError>
where
    R: AsyncBufRead + Unpin,
{
    let auth_url = spotify.get_authorize_url(false)?;

    if webbrowser::open(&auth_url).is_err() {
        info!(
            "Failed to open the authorization URL. Please visit the URL manually: {}",
            auth_url
        );
    }

    println!("Enter redirected url:");
    let url_input = input
        .next_line()
        .await
        .map_err(AuthError::Input)?
        .ok_or(AuthError::NoRedirect)?;

    let code = authorization_code(url_input.trim(), &spotify.oauth.state)?;
    spotify.request_token(&code).await?;

    Ok(())
}

fn has_token_cache(path: &Path) -> bool {
    path.is_file()
}

fn authorization_code(redirected: &str, expected_state: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirected)?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        if key == "code" {
            code = Some(value.to_string());
        } else if key == "state" {
            state = Some(value.to_string());
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }

    code.filter(|code| !code.is_empty())
        .ok_or(AuthError::MissingCode)
}

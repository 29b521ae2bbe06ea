use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::FetchOptions;

use super::{parse_films, MovieRecord};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("malformed films body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Something that can GET a URL and hand back the body of a 2xx response.
pub trait FilmsTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let timeout =
            (options.timeout_secs > 0).then(|| Duration::from_secs(options.timeout_secs));
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FilmsTransport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// One GET against `url`, decoded into records.
pub fn fetch_films(
    transport: &dyn FilmsTransport,
    url: &str,
) -> Result<Vec<MovieRecord>, FetchError> {
    let body = transport.get(url)?;
    let movies = parse_films(&body)?;
    tracing::debug!(url, count = movies.len(), bytes = body.len(), "decoded films body");
    Ok(movies)
}

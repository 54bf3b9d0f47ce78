use super::protocol::{
    CellRequest, Dimensions, FlipResponse, Position, ResultsAck, ResultsPayload, RotateResponse,
    SelectResponse, StartResponse, SubmitRequest, SubmitResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a puzzle authority call
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// Client could not be built from the given settings.
    #[error("remote configuration error: {0}")]
    Configuration(String),

    /// Request never produced an HTTP response.
    #[error("remote transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status.
    #[error("remote service error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("remote decode error: {0}")]
    Decode(String),

    /// Service started a session without issuing an identifier.
    #[error("remote service did not issue a session id")]
    MissingSession,
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// The service that owns canonical grid state and validates moves
pub trait PuzzleAuthority: Send {
    fn start(&self, dimensions: Dimensions) -> Result<StartResponse, RemoteError>;

    fn select(&self, session_id: &str, cell: Position) -> Result<SelectResponse, RemoteError>;

    fn rotate(&self, session_id: &str, cell: Position) -> Result<RotateResponse, RemoteError>;

    fn flip(&self, session_id: &str, cell: Position) -> Result<FlipResponse, RemoteError>;

    fn submit(&self, session_id: &str) -> Result<SubmitResponse, RemoteError>;

    fn post_results(&self, payload: &ResultsPayload) -> Result<ResultsAck, RemoteError>;
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-over-HTTP authority
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpAuthority {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(RemoteError::Configuration(
                "base url must not be empty".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Configuration(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    fn post<B, R>(&self, name: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.client.post(self.endpoint(name)).json(body).send()?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl PuzzleAuthority for HttpAuthority {
    fn start(&self, dimensions: Dimensions) -> Result<StartResponse, RemoteError> {
        self.post("start", &dimensions)
    }

    fn select(&self, session_id: &str, cell: Position) -> Result<SelectResponse, RemoteError> {
        self.post("select", &cell_request(session_id, cell))
    }

    fn rotate(&self, session_id: &str, cell: Position) -> Result<RotateResponse, RemoteError> {
        self.post("rotate", &cell_request(session_id, cell))
    }

    fn flip(&self, session_id: &str, cell: Position) -> Result<FlipResponse, RemoteError> {
        self.post("flip", &cell_request(session_id, cell))
    }

    fn submit(&self, session_id: &str) -> Result<SubmitResponse, RemoteError> {
        self.post("submit", &SubmitRequest { session_id })
    }

    fn post_results(&self, payload: &ResultsPayload) -> Result<ResultsAck, RemoteError> {
        self.post("results", payload)
    }
}

fn cell_request(session_id: &str, cell: Position) -> CellRequest<'_> {
    CellRequest {
        session_id,
        row: cell.row,
        col: cell.col,
    }
}

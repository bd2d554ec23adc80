use thiserror::Error;

use crate::routing::RoutingError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }
}

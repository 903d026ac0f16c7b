//! Failures rendered as a JSON object on stdout.

use config::ConfigError;
use errors::{BeatLogError, CacheError, ChainError, ClusterError, PipelineError};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String
}

impl ErrorBody {
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(ClusterError::Unavailable { hint }) = err.downcast_ref::<ClusterError>() {
            return Self {
                error: "embedding service not available".to_string(),
                message: hint.clone()
            };
        }

        Self {
            error: category(err).to_string(),
            message: format!("{err:#}")
        }
    }
}

fn category(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return "configuration error";
        }
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::BeatNotFound { .. } => "beat not found",
                PipelineError::Log(_) => "beats log error",
                PipelineError::Cache(_) => "cache error"
            };
        }
        if let Some(e) = cause.downcast_ref::<BeatLogError>() {
            return match e {
                BeatLogError::BeatsDirNotFound { .. } => "beats directory not found",
                _ => "beats log error"
            };
        }
        if cause.is::<CacheError>() {
            return "cache error";
        }
        if cause.is::<ChainError>() {
            return "chain error";
        }
        if cause.is::<ClusterError>() {
            return "clustering failed";
        }
    }
    "error"
}

pub fn report(err: &anyhow::Error) {
    let body = ErrorBody::from_error(err);
    match serde_json::to_string_pretty(&body) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{{\"error\": \"{}\"}}", body.error)
    }
}

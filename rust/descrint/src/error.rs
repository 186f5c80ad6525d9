//! Errors returned when binding an engine.

use descrint_error::{DescrError, ErrorCodes};
use thiserror::Error;

use crate::backend::MicroTile;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid descriptor size {0}: must be a positive multiple of 8 up to 32768")]
    InvalidSize(usize),
    #[error("Invalid depth {0}: must be in [4, 8]")]
    InvalidDepth(usize),
    #[error("Invalid cache budget: {level} must be positive")]
    InvalidCache { level: &'static str },
    #[error("Invalid micro tile {tile:?}: must be at most {max_m}x{max_n} and non-empty")]
    InvalidTiling {
        tile: MicroTile,
        max_m: usize,
        max_n: usize,
    },
    #[error("Error loading config: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for EngineError {
    fn from(err: figment::Error) -> Self {
        EngineError::Config(Box::new(err))
    }
}

impl DescrError for EngineError {
    fn code(&self) -> ErrorCodes {
        match self {
            EngineError::InvalidSize(_) => ErrorCodes::InvalidArgument,
            EngineError::InvalidDepth(_) => ErrorCodes::InvalidArgument,
            EngineError::InvalidCache { .. } => ErrorCodes::InvalidArgument,
            EngineError::InvalidTiling { .. } => ErrorCodes::InvalidArgument,
            EngineError::Config(_) => ErrorCodes::Internal,
        }
    }
}

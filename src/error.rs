use crate::app::config::ConfigError;
use crate::computer::ComputerError;
use crate::process::{PipelineError, StepError, StrategyError};
use crate::structure::GraphError;
use thiserror::Error;

/// Exit codes of the command-line tool
pub mod exit_codes {
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_ERROR: i32 = 2;
    pub const PIPELINE_ERROR: i32 = 3;
    pub const JOB_ERROR: i32 = 4;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("Compute error: {0}")]
    Computer(#[from] ComputerError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Graph(_) | Error::Config(_) | Error::InvalidArgument(_) => {
                exit_codes::INPUT_ERROR
            }
            Error::Pipeline(_) | Error::Strategy(_) => exit_codes::PIPELINE_ERROR,
            Error::Step(StepError::Strategy(_)) => exit_codes::PIPELINE_ERROR,
            Error::Step(_) | Error::Computer(_) => exit_codes::JOB_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

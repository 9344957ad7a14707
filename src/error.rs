use thiserror::Error;

use crate::solver::SolveResponse;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid suit: {0}")]
    InvalidSuit(char),

    #[error("Parse error at position {position}: {token:?}")]
    ParseError { token: String, position: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Tree too large: estimated {estimated} nodes exceeds ceiling {ceiling}")]
    TreeTooLarge { estimated: u64, ceiling: u64 },

    #[error("No viable sample after {attempts} attempts")]
    NoViableSample { attempts: usize },

    #[error("Solve cancelled after {} iterations", partial.training_iterations)]
    Cancelled { partial: Box<SolveResponse> },

    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolated(String),

    #[error("Need at least {need} cards, got {got}")]
    NotEnoughCards { need: usize, got: usize },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SolverError {
    pub fn parse(token: impl Into<String>, position: usize) -> SolverError {
        SolverError::ParseError {
            token: token.into(),
            position,
        }
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

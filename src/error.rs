//! Error types for the reservoir scheduling solvers.

use crate::solver::HighsModelStatus;
use thiserror::Error;

/// Every way a scheduling run can fail. None of these is retried: the
/// models are box-bounded and always feasible, so a failure points at a
/// construction defect and is propagated to the caller as-is.
#[derive(Debug, Error)]
pub enum HydroError {
    /// The solver found no feasible point.
    #[error("the {model} model is infeasible")]
    InfeasibleModel { model: String },

    /// The objective is unbounded, usually a missing bound or cut.
    #[error("the {model} model is unbounded")]
    UnboundedModel { model: String },

    /// The model was solved but no usable dual value exists for the row.
    #[error("no dual value available for row {row} of the {model} model")]
    MissingDual { model: String, row: usize },

    /// A HiGHS instance could not be created.
    #[error("LP solver unavailable: {0}")]
    SolverUnavailable(String),

    /// Any other non-optimal outcome reported by the solver.
    #[error("solver failed on the {model} model with status {status:?}")]
    SolverFailure {
        model: String,
        status: HighsModelStatus,
    },

    /// HiGHS rejected a call (bad option, incoherent matrix, ...).
    #[error("HiGHS call {call} returned an error status")]
    SolverCall { call: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, HydroError>;

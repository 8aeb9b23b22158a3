use thiserror::Error;

use crate::models::ConnectorType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("t_max must be > 0 (got {0})")]
    InvalidTimeLimit(f64),
    #[error("n_max must be greater than 0")]
    EventLimitZero,
    #[error("mean interarrival time must be > 0 (got {0})")]
    InvalidMeanInterarrival(f64),
    #[error("validation time must be >= 0 (got {0})")]
    InvalidValidationTime(f64),
    #[error("probability for {0} must be between 0 and 1 (got {1})")]
    InvalidProbability(ConnectorType, f64),
    #[error("connector probabilities must sum to 1 (got {0})")]
    ProbabilitySum(f64),
    #[error("unsupported server count {0}: expected 8 or 10")]
    UnsupportedServerCount(usize),
    #[error("invalid charge profile for {0}: {1}")]
    InvalidChargeProfile(ConnectorType, String),
    #[error("replications must be greater than 0")]
    ReplicationsZero,
    #[error("replications must be at most {max} (got {requested})")]
    ReplicationsTooMany { requested: u64, max: u64 },
    #[error("run aborted after {events} events at clock {clock:.4}: wall-clock budget of {budget_ms}ms exceeded")]
    WallClockExceeded {
        events: u64,
        clock: f64,
        budget_ms: u64,
    },
    #[error("run cancelled after {events} events at clock {clock:.4}")]
    Cancelled { events: u64, clock: f64 },
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
}

impl Error {
    /// True when the run was stopped by its guard rather than by a bad input.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::WallClockExceeded { .. } | Error::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

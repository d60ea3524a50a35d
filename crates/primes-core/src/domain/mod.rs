//! Domain model (ids, candidates, outcomes, run state, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod state;

pub use self::errors::{ErrorKind, PrimesError};
pub use self::ids::RunId;
pub use self::outcome::{Candidate, Outcome};
pub use self::state::{Baseline, RunStatus, RunSummary};

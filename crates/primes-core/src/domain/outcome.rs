//! Candidate and Outcome: the unit of work and its result.
//!
//! An `Outcome` is produced by exactly one task and consumed exactly once by
//! the aggregator, so both types are plain `Copy` values with no shared
//! ownership.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer being tested for primality in the current run.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(u64);

impl Candidate {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Candidate {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The result (prime / not prime) produced for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub candidate: Candidate,
    pub is_prime: bool,
}

impl Outcome {
    pub fn prime(candidate: Candidate) -> Self {
        Self {
            candidate,
            is_prime: true,
        }
    }

    pub fn composite(candidate: Candidate) -> Self {
        Self {
            candidate,
            is_prime: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_flag() {
        let c = Candidate::new(7);
        assert!(Outcome::prime(c).is_prime);
        assert!(!Outcome::composite(c).is_prime);
        assert_eq!(Outcome::prime(c).candidate.value(), 7);
    }

    #[test]
    fn candidate_serializes_as_bare_number() {
        let o = Outcome::prime(Candidate::new(13));
        let v = serde_json::to_value(o).unwrap();
        assert_eq!(v["candidate"], 13);
        assert_eq!(v["is_prime"], true);
    }
}

//! Trial-division primality check.

use std::sync::Arc;

/// A primality check the pool runs once per candidate.
pub type CheckFn = Arc<dyn Fn(u64) -> bool + Send + Sync>;

/// Returns true when `k` is prime.
///
/// Deliberately O(k): every j in [2, k-1] is tried until one divides `k`.
pub fn is_prime(k: u64) -> bool {
    if k <= 1 {
        return false;
    }
    (2..k).all(|j| k % j != 0)
}

/// The default check, wrapped for injection into the pool.
pub fn trial_division() -> CheckFn {
    Arc::new(is_prime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, false)]
    #[case(2, true)]
    #[case(3, true)]
    #[case(4, false)]
    #[case(9, false)]
    #[case(97, true)]
    #[case(7919, true)]
    #[case(7921, false)] // 89 * 89
    fn classifies(#[case] k: u64, #[case] expected: bool) {
        assert_eq!(is_prime(k), expected);
    }

    #[test]
    fn primes_up_to_ten() {
        let found: Vec<u64> = (1..=10).filter(|&k| is_prime(k)).collect();
        assert_eq!(found, vec![2, 3, 5, 7]);
    }

    #[test]
    fn prime_counting_function_at_1000() {
        assert_eq!((1..=1000).filter(|&k| is_prime(k)).count(), 168);
    }

    #[test]
    fn boxed_check_agrees() {
        let check = trial_division();
        assert!(check(13));
        assert!(!check(15));
    }
}

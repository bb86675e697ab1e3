//! Works out the fixed installment amount for a debt's repayment schedule.

/// Round a money amount half-up to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the fixed installment amount for a debt.
///
/// The `term` is the total number of scheduled payments, already expressed
/// in payment-period units, so no frequency multiplier is applied here.
/// Returns `None` when the term is absent or not positive; the caller must
/// then supply the installment amount explicitly.
///
/// The result is deterministic: recomputing with the same inputs always
/// reproduces the same amount.
pub fn installment_amount(principal: f64, term: Option<i64>) -> Option<f64> {
    let term = term.filter(|&term| term > 0)?;

    Some(round2(principal / term as f64))
}

#[cfg(test)]
mod installment_tests {
    use super::{installment_amount, round2};

    #[test]
    fn divides_principal_evenly_over_term() {
        assert_eq!(installment_amount(1200.0, Some(12)), Some(100.0));
        assert_eq!(installment_amount(500.0, Some(4)), Some(125.0));
    }

    #[test]
    fn rounds_half_up_to_cents() {
        // 1000 / 3 = 333.333...
        assert_eq!(installment_amount(1000.0, Some(3)), Some(333.33));
        // 100 / 8 = 12.5, exact at cent resolution.
        assert_eq!(installment_amount(100.0, Some(8)), Some(12.5));
        // 0.125 rounds up, not to even.
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn produces_no_value_without_a_positive_term() {
        assert_eq!(installment_amount(1200.0, None), None);
        assert_eq!(installment_amount(1200.0, Some(0)), None);
        assert_eq!(installment_amount(1200.0, Some(-3)), None);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let first = installment_amount(1234.56, Some(7));

        for _ in 0..10 {
            assert_eq!(installment_amount(1234.56, Some(7)), first);
        }
    }

    #[test]
    fn total_of_installments_stays_within_rounding_bound() {
        for (principal, term) in [(1000.0, 3), (999.99, 7), (1234.56, 13), (10.0, 12)] {
            let installment = installment_amount(principal, Some(term)).unwrap();
            let difference = (installment * term as f64 - principal).abs();

            assert!(
                difference < term as f64 * 0.01,
                "installment {installment} x {term} drifted {difference} from {principal}"
            );
        }
    }
}

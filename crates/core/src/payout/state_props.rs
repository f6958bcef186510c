//! Property-based tests for the withdrawal state machine.

use proptest::prelude::*;

use super::error::PayoutError;
use super::state::WithdrawalStateMachine;
use super::types::{ProviderStatus, WithdrawalStatus};

fn arb_status() -> impl Strategy<Value = WithdrawalStatus> {
    prop_oneof![
        Just(WithdrawalStatus::Pending),
        Just(WithdrawalStatus::Processing),
        Just(WithdrawalStatus::Completed),
        Just(WithdrawalStatus::Failed),
        Just(WithdrawalStatus::Cancelled),
    ]
}

fn arb_provider_status() -> impl Strategy<Value = ProviderStatus> {
    prop_oneof![
        Just(ProviderStatus::Success),
        Just(ProviderStatus::Initiated),
        Just(ProviderStatus::Pending),
        Just(ProviderStatus::Failed),
        Just(ProviderStatus::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Terminal statuses never move.
    #[test]
    fn prop_terminal_is_final(from in arb_status(), to in arb_status()) {
        prop_assume!(from.is_terminal());
        prop_assert!(!WithdrawalStateMachine::is_valid_transition(from, to));
    }

    /// Every valid transition moves the record forward.
    #[test]
    fn prop_valid_transition_increases_progress(from in arb_status(), to in arb_status()) {
        prop_assume!(WithdrawalStateMachine::is_valid_transition(from, to));
        prop_assert!(to.progress() > from.progress());
    }

    /// No transition leads back to pending.
    #[test]
    fn prop_never_back_to_pending(from in arb_status()) {
        prop_assert!(!WithdrawalStateMachine::is_valid_transition(from, WithdrawalStatus::Pending));
    }

    /// Any sequence of provider reports applied through `next` keeps the
    /// record on a valid path and stops changing once terminal.
    #[test]
    fn prop_provider_sequences_stay_valid(
        reports in prop::collection::vec(arb_provider_status(), 1..10),
    ) {
        let mut current = WithdrawalStatus::Pending;
        for report in reports {
            match WithdrawalStateMachine::next(current, report) {
                Ok(Some(next)) => {
                    prop_assert!(WithdrawalStateMachine::is_valid_transition(current, next));
                    current = next;
                }
                Ok(None) => {
                    prop_assert_eq!(WithdrawalStateMachine::map_provider_status(report), current);
                }
                Err(PayoutError::InvalidTransition { from, .. }) => {
                    prop_assert!(from.is_terminal());
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }

    /// Re-applying the same report is idempotent.
    #[test]
    fn prop_same_report_twice_is_noop(report in arb_provider_status()) {
        let first = WithdrawalStateMachine::next(WithdrawalStatus::Pending, report);
        prop_assert!(first.is_ok());
        let after = first.ok().flatten().unwrap_or(WithdrawalStatus::Pending);
        let second = WithdrawalStateMachine::next(after, report);
        prop_assert!(matches!(second, Ok(None)));
    }
}

//! Property-based tests for the coin decoder.
//!
//! These tests use proptest to generate arbitrary line sequences and verify
//! that the decoder's invariants hold regardless of arrival pattern.

use proptest::prelude::*;
use kiosk_core::DenominationSet;
use kiosk_protocol::{CoinDecoder, Effect, RejectReason};
use std::time::{Duration, Instant};

/// Strategy for lines the acceptor might emit, noise included.
fn acceptor_line() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["1", "5", "10", "20", "0", "2"]).prop_map(String::from),
        prop::string::string_regex("[0-9]{1,4}").expect("digit regex"),
        prop::string::string_regex("[A-Z\r ]{0,3}").expect("noise regex"),
    ]
}

/// Run lines through the decoder, firing every timer whose deadline passes
/// before the next line, then flush at the end.
fn run(lines: &[(String, u64)]) -> Vec<Effect> {
    let mut decoder = CoinDecoder::new();
    let mut now = Instant::now();
    let mut effects = Vec::new();

    for (line, gap_ms) in lines {
        now += Duration::from_millis(*gap_ms);
        if let Some((generation, deadline)) = decoder.deadline()
            && deadline <= now
        {
            effects.extend(decoder.expire(generation, deadline));
        }
        effects.extend(decoder.process_line(line, now));
    }
    effects.extend(decoder.flush(now));
    effects
}

proptest! {
    /// Property: every credited value belongs to the denomination set.
    #[test]
    fn prop_credits_are_valid_denominations(
        lines in prop::collection::vec((acceptor_line(), 0u64..400), 0..40),
    ) {
        let set = DenominationSet::default();
        for effect in run(&lines) {
            if let Effect::Credit(acceptance) = effect {
                prop_assert!(set.lookup(u64::from(acceptance.denomination.value())).is_some());
            }
        }
    }

    /// Property: every arm gets a fresh generation and no generation is
    /// cancelled twice.
    #[test]
    fn prop_each_fragment_resolves_once(
        lines in prop::collection::vec((acceptor_line(), 0u64..400), 0..40),
    ) {
        let effects = run(&lines);

        let armed: Vec<u64> = effects.iter().filter_map(|e| match e {
            Effect::ArmTimer { generation, .. } => Some(*generation),
            _ => None,
        }).collect();
        let cancelled: Vec<u64> = effects.iter().filter_map(|e| match e {
            Effect::CancelTimer { generation } => Some(*generation),
            _ => None,
        }).collect();

        // Generations are unique and strictly increasing
        prop_assert!(armed.windows(2).all(|w| w[0] < w[1]));
        // A generation is cancelled at most once
        let mut sorted = cancelled.clone();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), cancelled.len());
    }

    /// Property: lines without digits never produce any effect.
    #[test]
    fn prop_digitless_lines_are_silent(
        line in prop::string::string_regex("[^0-9]{0,12}").expect("non-digit regex"),
    ) {
        let mut decoder = CoinDecoder::new();
        prop_assert!(decoder.process_line(&line, Instant::now()).is_empty());
        prop_assert!(decoder.is_idle());
    }

    /// Property: a complete multi-digit value outside the set is rejected
    /// exactly once and never credited.
    #[test]
    fn prop_unknown_values_rejected_once(value in 21u64..1_000_000) {
        let mut decoder = CoinDecoder::new();
        let effects = decoder.process_line(&value.to_string(), Instant::now());

        prop_assert_eq!(effects.len(), 1);
        prop_assert_eq!(
            effects[0].as_reject().map(|r| r.reason),
            Some(RejectReason::UnsupportedValue)
        );
    }

    /// Property: back-to-back split pairs each credit their combined value,
    /// in order, and never the digits on their own.
    #[test]
    fn prop_split_pairs_credit_combined_value(
        pairs in prop::collection::vec(prop::sample::select(vec![10u32, 20]), 1..10),
    ) {
        let mut decoder = CoinDecoder::new();
        let now = Instant::now();
        let mut credited = Vec::new();

        for value in &pairs {
            let text = value.to_string();
            let (lead, tail) = text.split_at(1);
            for line in [lead, tail] {
                credited.extend(
                    decoder
                        .process_line(line, now)
                        .iter()
                        .filter_map(Effect::as_credit)
                        .map(|a| a.denomination.value()),
                );
            }
        }

        prop_assert_eq!(credited, pairs);
    }
}

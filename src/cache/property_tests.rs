//! Property-Based Tests for Cache Module
//!
//! Uses proptest to drive random operation sequences through an engine and
//! check the counters against a model.

use proptest::prelude::*;
use std::time::Duration;

use crate::cache::{CacheEngine, CacheStats, EngineSettings};
use crate::options::ResolvedOptions;

// == Strategies ==
/// Small key space so that sequences revisit keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, wait: bool },
    Get { key: String },
    Evict { key: String },
    Sleep { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy(), any::<bool>())
            .prop_map(|(key, value, wait)| CacheOp::Set { key, value, wait }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Evict { key }),
        (1u64..80).prop_map(|ms| CacheOp::Sleep { ms }),
    ]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn policy(wait: bool) -> ResolvedOptions {
    ResolvedOptions {
        validity: Duration::from_millis(50),
        evict: Duration::from_millis(50),
        wait_until_done: wait,
        ..ResolvedOptions::default()
    }
}

fn assert_monotonic(before: &CacheStats, after: &CacheStats) -> Result<(), TestCaseError> {
    prop_assert!(after.hits >= before.hits);
    prop_assert!(after.misses >= before.misses);
    prop_assert!(after.stale >= before.stale);
    prop_assert!(after.evictions >= before.evictions);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every get is counted exactly once, as a hit or a miss, and no counter
    // ever goes backwards.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let rt = paused_runtime();
        rt.block_on(async {
            let engine = CacheEngine::spawn("prop", &EngineSettings::default());
            let mut expected_hits = 0u64;
            let mut expected_misses = 0u64;
            let mut previous = engine.stats();

            for op in ops {
                match op {
                    CacheOp::Set { key, value, wait } => {
                        engine.set(key, value, &policy(wait)).await.unwrap();
                    }
                    CacheOp::Get { key } => match engine.get(&key, false).await {
                        Ok(_) => expected_hits += 1,
                        Err(_) => expected_misses += 1,
                    },
                    CacheOp::Evict { key } => {
                        engine.evict(key, true).await.unwrap();
                    }
                    CacheOp::Sleep { ms } => {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                }

                let current = engine.stats();
                assert_monotonic(&previous, &current)?;
                previous = current;
            }

            let stats = engine.stats();
            prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
            prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
            prop_assert!(stats.entries <= 20, "More entries than keys");
            Ok(())
        })?;
    }

    // The last committed write for a key is what the next get sees.
    #[test]
    fn prop_last_write_wins(
        key in key_strategy(),
        values in prop::collection::vec(value_strategy(), 1..20)
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let engine = CacheEngine::spawn("prop", &EngineSettings::default());
            let last = values.last().cloned().unwrap();

            let count = values.len();
            for (i, value) in values.into_iter().enumerate() {
                // Only the final write waits; earlier ones are queued ahead of it.
                engine.set(key.clone(), value, &policy(i + 1 == count)).await.unwrap();
            }

            prop_assert_eq!(engine.get(&key, false).await.unwrap(), last);
            prop_assert_eq!(engine.stats().entries, 1);
            Ok(())
        })?;
    }
}

//! Property-based tests for keyed debouncing

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tabgroups_core::CoalescingBatch;

type Flushed = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

/// Expected flushes: keys in first-seen order, values deduplicated in
/// arrival order
fn expected(items: &[(u8, u8)]) -> Vec<(u8, Vec<u8>)> {
    let mut out: Vec<(u8, Vec<u8>)> = Vec::new();
    for &(key, value) in items {
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => out.push((key, vec![value])),
        }
    }
    out
}

fn run_burst(items: &[(u8, u8)], quiet: Duration) -> Vec<(u8, Vec<u8>)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let flushed: Flushed = Arc::default();
        let sink = Arc::clone(&flushed);
        let batch = CoalescingBatch::spawn(quiet, move |key, values| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push((key, values));
            }
        });

        for &(key, value) in items {
            batch.push(key, value);
        }
        tokio::time::sleep(quiet * 3).await;

        let result = flushed.lock().unwrap().clone();
        drop(batch);
        result
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// A burst inside the quiet period flushes every key exactly once with
    /// all of its distinct items
    #[test]
    fn prop_burst_flushes_each_key_once(
        items in prop::collection::vec((0u8..5, 0u8..10), 1..40),
        quiet_ms in 10u64..500,
    ) {
        let flushed = run_burst(&items, Duration::from_millis(quiet_ms));
        prop_assert_eq!(flushed, expected(&items));
    }
}

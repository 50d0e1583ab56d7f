//! Keyed debounce
//!
//! [`CoalescingBatch`] accumulates work items per key. Once no new item has
//! arrived for the quiet period, every key is flushed exactly once with all
//! of its items. Used for lazy tab moves and `group-updated` broadcasts.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

/// Debounced, keyed accumulator backed by a worker task
pub struct CoalescingBatch<K, V> {
    tx: mpsc::UnboundedSender<(K, V)>,
}

impl<K, V> CoalescingBatch<K, V>
where
    K: PartialEq + Send + 'static,
    V: PartialEq + Send + 'static,
{
    /// Starts the worker; `flush` receives each key with its items in
    /// arrival order
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<F, Fut>(quiet: Duration, flush: F) -> Self
    where
        F: Fn(K, Vec<V>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::worker(rx, quiet, flush));
        Self { tx }
    }

    /// Adds an item; duplicates of a pending item are dropped
    ///
    /// Dropping the batch flushes whatever is pending.
    pub fn push(&self, key: K, value: V) {
        if self.tx.send((key, value)).is_err() {
            tracing::warn!("Coalescing worker stopped, item dropped");
        }
    }

    async fn worker<F, Fut>(mut rx: mpsc::UnboundedReceiver<(K, V)>, quiet: Duration, flush: F)
    where
        F: Fn(K, Vec<V>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        while let Some(first) = rx.recv().await {
            let mut pending: Vec<(K, Vec<V>)> = Vec::new();
            Self::collect(&mut pending, first);

            let closed = loop {
                tokio::select! {
                    item = rx.recv() => match item {
                        Some(item) => Self::collect(&mut pending, item),
                        None => break true,
                    },
                    () = tokio::time::sleep(quiet) => break false,
                }
            };

            for (key, values) in pending {
                flush(key, values).await;
            }

            if closed {
                return;
            }
        }
    }

    fn collect(pending: &mut Vec<(K, Vec<V>)>, (key, value): (K, V)) {
        match pending.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => pending.push((key, vec![value])),
        }
    }
}

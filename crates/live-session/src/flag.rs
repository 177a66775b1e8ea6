use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// A flag that can be raised exactly once, even under concurrent callers.
#[derive(Debug, Default)]
pub(crate) struct OneShot(AtomicBool);

impl OneShot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns `true` only for the caller that raised it.
    pub(crate) fn fire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Resolves once `signal` reads `true`; never resolves if its sender is gone first.
pub(crate) async fn raised(signal: &mut watch::Receiver<bool>) {
    let seen = signal.wait_for(|raised| *raised).await.is_ok();
    if !seen {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fires_once() {
        let flag = OneShot::new();
        assert!(!flag.is_fired());
        assert!(flag.fire());
        assert!(!flag.fire());
        assert!(flag.is_fired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_winner_under_contention() {
        let flag = Arc::new(OneShot::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let flag = flag.clone();
                tokio::spawn(async move { flag.fire() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("task completes") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_raised_wakes_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { raised(&mut rx).await });
        tx.send_replace(true);
        waiter.await.expect("waiter completes");
    }
}

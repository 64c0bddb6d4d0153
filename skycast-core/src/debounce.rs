//! Replaceable one-shot timer used to debounce autocomplete input.

use std::time::Duration;
use tokio::task::JoinHandle;

/// At most one armed timer at a time. Arming again, cancelling or dropping the
/// handle aborts the previous timer before it fires.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    armed: Option<Armed>,
}

#[derive(Debug)]
struct Armed {
    token: u64,
    task: JoinHandle<()>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer; `on_fire` runs once `delay` has elapsed without re-arming.
    ///
    /// `token` identifies this arming so a fire that was already queued when the
    /// timer got replaced can be told apart with [`DebounceTimer::is_armed_with`].
    pub fn arm<F>(&mut self, delay: Duration, token: u64, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });

        self.armed = Some(Armed { token, task });
    }

    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn is_armed_with(&self, token: u64) -> bool {
        self.armed.as_ref().is_some_and(|a| a.token == token)
    }

    /// Disarm after the fire for `token` has been handled. Returns false if that
    /// arming was already replaced or cancelled.
    pub fn complete(&mut self, token: u64) -> bool {
        if self.is_armed_with(token) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || {
            let c = c.clone();
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (count, make) = counter();
        let mut timer = DebounceTimer::new();

        timer.arm(Duration::from_millis(500), 1, make());
        assert!(timer.is_armed_with(1));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(timer.complete(1));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_previous_timer() {
        let (count, make) = counter();
        let mut timer = DebounceTimer::new();

        for token in 1..=4 {
            timer.arm(Duration::from_millis(500), token, make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.complete(3));
        assert!(timer.complete(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_prevent_fire() {
        let (count, make) = counter();

        let mut timer = DebounceTimer::new();
        timer.arm(Duration::from_millis(500), 1, make());
        timer.cancel();
        assert!(!timer.is_armed());

        let mut dropped = DebounceTimer::new();
        dropped.arm(Duration::from_millis(500), 2, make());
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

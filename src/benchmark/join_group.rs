//! Worker join group
//!
//! Tracks how many lookup workers are still running. Workers register before
//! their thread starts and deregister when the registration is dropped, which
//! also happens while unwinding from a panic.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub struct JoinGroup {
    live: Mutex<usize>,
    drained: Condvar,
}

impl JoinGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one worker; it stays live until the returned guard drops
    pub fn register(self: &Arc<Self>) -> WorkerRegistration {
        *self.live.lock() += 1;
        WorkerRegistration {
            group: Arc::clone(self),
        }
    }

    /// Number of workers still running
    pub fn live(&self) -> usize {
        *self.live.lock()
    }

    /// Block until every registered worker has exited
    pub fn wait(&self) {
        let mut live = self.live.lock();
        while *live > 0 {
            self.drained.wait(&mut live);
        }
    }

    /// Like `wait`, but give up after `timeout`. Returns true once drained.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut live = self.live.lock();
        if *live > 0 {
            self.drained
                .wait_while_for(&mut live, |live| *live > 0, timeout);
        }
        *live == 0
    }

    fn deregister(&self) {
        let mut live = self.live.lock();
        *live -= 1;
        if *live == 0 {
            self.drained.notify_all();
        }
    }
}

/// Live membership in a [`JoinGroup`]
pub struct WorkerRegistration {
    group: Arc<JoinGroup>,
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        self.group.deregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_register_and_drop() {
        let group = Arc::new(JoinGroup::new());
        let a = group.register();
        let b = group.register();
        assert_eq!(group.live(), 2);

        drop(a);
        assert_eq!(group.live(), 1);
        drop(b);
        assert_eq!(group.live(), 0);
    }

    #[test]
    fn test_wait_on_empty_group_returns() {
        let group = JoinGroup::new();
        group.wait();
        assert!(group.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_blocks_until_all_exit() {
        let group = Arc::new(JoinGroup::new());
        let start = Instant::now();

        let handles: Vec<_> = (0..3u64)
            .map(|i| {
                let registration = group.register();
                thread::spawn(move || {
                    let _registration = registration;
                    thread::sleep(Duration::from_millis(50 * (i + 1)));
                })
            })
            .collect();

        group.wait();
        assert_eq!(group.live(), 0);
        assert!(start.elapsed() >= Duration::from_millis(150));

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_wait_timeout_expires() {
        let group = Arc::new(JoinGroup::new());
        let registration = group.register();

        assert!(!group.wait_timeout(Duration::from_millis(20)));
        drop(registration);
        assert!(group.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_panicking_worker_deregisters() {
        let group = Arc::new(JoinGroup::new());
        let registration = group.register();

        let handle = thread::spawn(move || {
            let _registration = registration;
            panic!("worker failure");
        });

        group.wait();
        assert!(handle.join().is_err());
        assert_eq!(group.live(), 0);
    }
}

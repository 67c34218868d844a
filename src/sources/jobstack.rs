use log::trace;
use std::sync::{Condvar, Mutex, MutexGuard};

/// A LIFO stack of jobs shared between worker threads, where handling a job
/// may produce further jobs.  Workers stop once every job has been handled or
/// the stack has been shut down.
#[derive(Debug)]
pub(crate) struct JobStack<T> {
    state: Mutex<StackState<T>>,
    cond: Condvar,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct StackState<T> {
    queue: Vec<T>,
    /// Number of jobs either in `queue` or currently being handled
    pending: usize,
    shutdown: bool,
}

impl<T> JobStack<T> {
    pub(crate) fn new<I: IntoIterator<Item = T>>(items: I) -> Self {
        let queue: Vec<T> = items.into_iter().collect();
        let pending = queue.len();
        JobStack {
            state: Mutex::new(StackState {
                queue,
                pending,
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Repeatedly pop a job and pass it to `f`, pushing any jobs that `f`
    /// returns, until there is no more work.  If `f` fails, the stack is shut
    /// down and the error is returned.
    pub(crate) fn handle_many_jobs<F, I, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(T) -> Result<I, E>,
        I: IntoIterator<Item = T>,
    {
        while let Some(job) = self.pop() {
            let guard = JobGuard { stack: self };
            match f(job) {
                Ok(more) => {
                    self.extend(more);
                    drop(guard);
                }
                Err(e) => {
                    drop(guard);
                    self.shutdown();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Discard all queued jobs and stop handing out new ones.  Jobs already
    /// popped are allowed to finish.
    pub(crate) fn shutdown(&self) {
        let mut state = self.lock();
        if !state.shutdown {
            trace!("[JobStack] Shutting down");
            state.pending -= state.queue.len();
            state.queue.clear();
            state.shutdown = true;
            self.cond.notify_all();
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    fn lock(&self) -> MutexGuard<'_, StackState<T>> {
        self.state
            .lock()
            .expect("JobStack mutex should not have been poisoned")
    }

    fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if state.pending == 0 || state.shutdown {
                trace!("[JobStack] No jobs left");
                return None;
            }
            if let job @ Some(_) = state.queue.pop() {
                return job;
            }
            trace!("[JobStack] Queue is empty; waiting");
            state = self
                .cond
                .wait(state)
                .expect("JobStack mutex should not have been poisoned");
        }
    }

    fn job_done(&self) {
        let mut state = self.lock();
        state.pending -= 1;
        trace!("[JobStack] Pending job count decremented to {}", state.pending);
        if state.pending == 0 {
            self.cond.notify_all();
        }
    }

    fn extend<I: IntoIterator<Item = T>>(&self, iter: I) {
        let mut state = self.lock();
        if !state.shutdown {
            let before = state.queue.len();
            state.queue.extend(iter);
            let added = state.queue.len() - before;
            if added > 0 {
                state.pending += added;
                trace!("[JobStack] Pending job count incremented to {}", state.pending);
                self.cond.notify_all();
            }
        }
    }
}

/// Marks a popped job as done when dropped, including while unwinding from a
/// panic in the job's handler, in which case the stack is also shut down so
/// that the other workers do not wait forever for the job.
#[derive(Debug)]
struct JobGuard<'a, T> {
    stack: &'a JobStack<T>,
}

impl<T> Drop for JobGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.stack.shutdown();
        }
        self.stack.job_done();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crossbeam_utils::thread;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handle_generated_jobs() {
        // Each job n > 0 spawns two jobs n - 1, so starting from 4 there are
        // 2^5 - 1 jobs in total.
        let stack = JobStack::new([4u32]);
        let handled = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|_| {
                    stack
                        .handle_many_jobs(|n| {
                            handled.fetch_add(1, Ordering::SeqCst);
                            let more = if n > 0 { vec![n - 1, n - 1] } else { Vec::new() };
                            Ok::<_, ()>(more)
                        })
                        .unwrap();
                });
            }
        })
        .unwrap();
        assert_eq!(handled.load(Ordering::SeqCst), 31);
        assert!(!stack.is_shutdown());
    }

    #[test]
    fn test_error_shuts_down() {
        let stack = JobStack::new(0..100u32);
        let handled = AtomicUsize::new(0);
        let r = stack.handle_many_jobs(|n| {
            handled.fetch_add(1, Ordering::SeqCst);
            if n == 95 {
                Err(n)
            } else {
                Ok(Vec::new())
            }
        });
        assert_eq!(r, Err(95));
        assert!(stack.is_shutdown());
        // Jobs are popped from the top of the stack: 99, 98, 97, 96, 95
        assert_eq!(handled.load(Ordering::SeqCst), 5);
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_panic_shuts_down() {
        // Job 0 panics while the other workers are waiting for the jobs it
        // would have produced
        let stack = JobStack::new([0u32]);
        let handled = AtomicUsize::new(0);
        let r = thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|_| {
                    stack.handle_many_jobs(|n| {
                        handled.fetch_add(1, Ordering::SeqCst);
                        assert!(n != 0, "job {n} failed");
                        Ok::<_, ()>(vec![n - 1])
                    })
                });
            }
        });
        assert!(r.is_err());
        assert!(stack.is_shutdown());
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(stack.lock().pending, 0);
    }
}

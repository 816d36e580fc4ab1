use std::sync::Arc;
use std::thread;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatch: Send + Sync {
    fn dispatch(&self, job: Job);
}

pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct ThreadDispatch {
    waker: Option<Waker>,
}

impl ThreadDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_waker(waker: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            waker: Some(Arc::new(waker)),
        }
    }
}

impl Dispatch for ThreadDispatch {
    fn dispatch(&self, job: Job) {
        let waker = self.waker.clone();
        thread::spawn(move || {
            job();
            if let Some(waker) = waker {
                waker();
            }
        });
    }
}


#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn thread_dispatch_runs_job_then_wakes() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let (tx, rx) = mpsc::channel();
        let (woke_tx, woke_rx) = mpsc::channel();
        let dispatch = ThreadDispatch::with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = woke_tx.send(());
        });

        dispatch.dispatch(Box::new(move || {
            let _ = tx.send(42);
        }));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));
        woke_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_dispatch_holds_jobs() {
        let dispatch = testing::ManualDispatch::default();
        let (tx, rx) = mpsc::channel();

        for value in 0..3 {
            let tx = tx.clone();
            dispatch.dispatch(Box::new(move || {
                let _ = tx.send(value);
            }));
        }

        assert_eq!(dispatch.pending(), 3);
        assert!(rx.try_recv().is_err());
        dispatch.run_all();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}

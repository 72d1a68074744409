// src/engine/pool.rs
use std::{
    thread,
    sync::{ mpsc, atomic::{ AtomicUsize, Ordering }},
};

/// Bounded fan-out for per-match evaluations.
///
/// The pool owns no threads. It hands out permits for helper threads, and
/// the calling thread always takes part in draining its own jobs, so a
/// nested fan-out that finds no free permit just runs inline instead of
/// waiting on one.
pub struct WorkerPool {
    spare: AtomicUsize,
}

/// Returns its helper slot on drop, even if the job panicked.
struct Permit<'a>(&'a AtomicUsize);

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

impl WorkerPool {
    /// `workers` counts the caller; `1` means fully sequential.
    pub fn new(workers: usize) -> Self {
        Self { spare: AtomicUsize::new(workers.saturating_sub(1)) }
    }

    pub fn spare(&self) -> usize {
        self.spare.load(Ordering::Acquire)
    }

    fn acquire(&self, want: usize) -> usize {
        let mut cur = self.spare.load(Ordering::Acquire);
        loop {
            let take = cur.min(want);
            if take == 0 {
                return 0;
            }
            match self.spare.compare_exchange_weak(cur, cur - take, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return take,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Run `job(0..len)` and return the outputs in index order, whatever
    /// order they finished in.
    pub fn run_indexed<T, F>(&self, len: usize, job: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        if len <= 1 {
            return (0..len).map(&job).collect();
        }
        let helpers = self.acquire(len - 1);
        if helpers == 0 {
            return (0..len).map(&job).collect();
        }
        logd!("pool: {len} jobs on {} threads", helpers + 1);

        let counter = AtomicUsize::new(0);
        let (res_tx, res_rx) = mpsc::channel::<(usize, T)>();
        let mut slots: Vec<Option<T>> = (0..len).map(|_| None).collect();

        let drain = |tx: &mpsc::Sender<(usize, T)>| loop {
            let i = counter.fetch_add(1, Ordering::Relaxed);
            if i >= len {
                break;
            }
            let _ = tx.send((i, job(i)));
        };
        let drain = &drain;

        thread::scope(|s| {
            for _ in 0..helpers {
                let tx = res_tx.clone();
                let permit = Permit(&self.spare);
                s.spawn(move || {
                    let _permit = permit;
                    drain(&tx);
                });
            }

            drain(&res_tx);
            drop(res_tx); // helpers hold the remaining senders

            for (i, out) in res_rx.iter() {
                slots[i] = Some(out);
            }
        });

        slots.into_iter().flatten().collect()
    }
}

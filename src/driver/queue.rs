//! Bounded parallel compile queue
//!
//! Jobs are blocking subprocess calls, so they run on tokio's blocking pool
//! under a current-thread runtime. A semaphore caps how many are in flight.
//! Every queued job runs to completion even when another one fails; reports
//! come back in queue order so callers can pick the first failure
//! deterministically.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::process::{Invocation, ProcessError, ProcessExit, ProcessRunner};

/// Upper bound on parallel jobs; the permit count of a tokio semaphore.
pub const MAX_THREADS: usize = Semaphore::MAX_PERMITS;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to start compile workers: {0}")]
    Runtime(#[source] io::Error),

    #[error("compile worker stopped unexpectedly: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("compile worker pool closed")]
    Closed(#[from] tokio::sync::AcquireError),
}

/// One compile command and its `[index/total]` position for echoing.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub index: usize,
    pub total: usize,
    pub invocation: Invocation,
}

#[derive(Debug)]
pub struct JobReport {
    pub invocation: Invocation,
    pub result: Result<ProcessExit, ProcessError>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, Ok(exit) if exit.success())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompileQueue {
    threads: usize,
    echo: bool,
}

impl CompileQueue {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.clamp(1, MAX_THREADS),
            echo: true,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run every job and return one report per job, in queue order.
    #[tracing::instrument(skip_all, fields(jobs = jobs.len(), threads = self.threads))]
    pub fn run(&self, jobs: Vec<QueuedJob>, runner: Arc<dyn ProcessRunner>) -> Result<Vec<JobReport>, QueueError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.threads.min(jobs.len());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(workers)
            .build()
            .map_err(QueueError::Runtime)?;

        let echo = self.echo;
        let permits = Arc::new(Semaphore::new(workers));
        runtime.block_on(async move {
            let count = jobs.len();
            let mut set = JoinSet::new();
            for (slot, job) in jobs.into_iter().enumerate() {
                let permit = Arc::clone(&permits).acquire_owned().await?;
                let runner = Arc::clone(&runner);
                set.spawn_blocking(move || {
                    let _permit = permit;
                    if echo {
                        println!("[{}/{}] {}", job.index, job.total, job.invocation);
                    }
                    let result = runner.run(&job.invocation);
                    (
                        slot,
                        JobReport {
                            invocation: job.invocation,
                            result,
                        },
                    )
                });
            }

            let mut reports = Vec::with_capacity(count);
            while let Some(joined) = set.join_next().await {
                reports.push(joined?);
            }
            reports.sort_by_key(|(slot, _)| *slot);
            Ok::<_, QueueError>(reports.into_iter().map(|(_, report)| report).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Fails every program named `bad*`, tracks peak concurrency.
    #[derive(Default)]
    struct CountingRunner {
        active: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ProcessRunner for CountingRunner {
        fn run(&self, invocation: &Invocation) -> Result<ProcessExit, ProcessError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.seen.lock().unwrap().push(invocation.program.clone());
            self.active.fetch_sub(1, Ordering::SeqCst);
            if invocation.program.starts_with("bad") {
                Ok(ProcessExit::Code(1))
            } else {
                Ok(ProcessExit::Code(0))
            }
        }
    }

    fn jobs(programs: &[&str]) -> Vec<QueuedJob> {
        programs
            .iter()
            .enumerate()
            .map(|(i, p)| QueuedJob {
                index: i + 1,
                total: programs.len(),
                invocation: Invocation::new(*p),
            })
            .collect()
    }

    #[test]
    fn test_all_jobs_run_despite_failure() {
        let runner = Arc::new(CountingRunner::default());
        let reports = CompileQueue::new(2)
            .with_echo(false)
            .run(jobs(&["a", "bad1", "c", "bad2"]), runner.clone())
            .unwrap();
        assert_eq!(runner.seen.lock().unwrap().len(), 4);
        let first_failure = reports.iter().find(|r| !r.succeeded()).unwrap();
        assert_eq!(first_failure.invocation.program, "bad1");
        let order: Vec<_> = reports.iter().map(|r| r.invocation.program.as_str()).collect();
        assert_eq!(order, ["a", "bad1", "c", "bad2"]);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let runner = Arc::new(CountingRunner::default());
        CompileQueue::new(2)
            .with_echo(false)
            .run(jobs(&["a", "b", "c", "d", "e", "f"]), runner.clone())
            .unwrap();
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_threads_clamped() {
        assert_eq!(CompileQueue::new(0).threads(), 1);
    }

    #[test]
    fn test_huge_thread_count_runs() {
        let queue = CompileQueue::new(usize::MAX).with_echo(false);
        assert_eq!(queue.threads(), MAX_THREADS);
        let runner = Arc::new(CountingRunner::default());
        let reports = queue.run(jobs(&["a", "b", "c"]), runner.clone()).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(JobReport::succeeded));
    }
}

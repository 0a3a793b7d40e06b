//! Task executors and the parallel-merge worker loop.
//!
//! The engine never spawns threads on its own: `merge_parallel` hands one task
//! per upstream to an injected [`Executor`]. Each task runs [`run_worker`],
//! which pulls its upstream node and forwards every signal into the merge's
//! bounded channel.
//!
//! Two executors are provided:
//! - [`ThreadExecutor`]: one named OS thread per task.
//! - [`WorkerPool`]: a fixed set of threads fed from a crossbeam job queue.
//!   Tasks occupy a thread until their upstream terminates, so a pool smaller
//!   than the number of never-ending upstreams starves the rest.

use crate::pipeline::bridge::WorkerMessage;
use crate::pipeline::error::{FluxError, FluxResult};
use crate::pipeline::node::{AnyNode, NodeContext, Pull};
use crossbeam_channel::{unbounded, SendTimeoutError, Sender};

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks off the subscriber's thread.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Human-readable name for log output.
    fn name(&self) -> &str;

    /// Start `task`. Must not run it on the calling thread.
    fn execute(&self, task_name: &str, task: Task) -> FluxResult<()>;
}

/// Spawns one detached thread per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl ThreadExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for ThreadExecutor {
    fn name(&self) -> &str {
        "ThreadExecutor"
    }

    fn execute(&self, task_name: &str, task: Task) -> FluxResult<()> {
        std::thread::Builder::new()
            .name(task_name.to_string())
            .spawn(task)
            .map(|_| ())
            .map_err(|e| FluxError::Executor(format!("failed to spawn {}: {}", task_name, e)))
    }
}

/// Fixed-size pool of worker threads.
///
/// Dropping the pool closes the job queue; idle threads exit, busy threads
/// finish their current task first. Threads are not joined.
pub struct WorkerPool {
    jobs: Sender<(String, Task)>,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> FluxResult<Self> {
        let threads = threads.max(1);
        let (jobs, rx) = unbounded::<(String, Task)>();
        for i in 0..threads {
            let rx = rx.clone();
            std::thread::Builder::new()
                .name(format!("rxflow-pool-{}", i))
                .spawn(move || {
                    tracing::trace!("Pool thread {} started", i);
                    while let Ok((name, task)) = rx.recv() {
                        tracing::trace!("Pool thread {} running {}", i, name);
                        task();
                    }
                    tracing::trace!("Pool thread {} exiting", i);
                })
                .map_err(|e| FluxError::Executor(format!("failed to start pool thread: {}", e)))?;
        }
        tracing::debug!("Worker pool started with {} thread(s)", threads);
        Ok(Self { jobs, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Executor for WorkerPool {
    fn name(&self) -> &str {
        "WorkerPool"
    }

    fn execute(&self, task_name: &str, task: Task) -> FluxResult<()> {
        self.jobs
            .send((task_name.to_string(), task))
            .map_err(|_| FluxError::Executor("worker pool is shut down".into()))
    }
}

/// Worker loop for one parallel-merge upstream.
///
/// Runs until the upstream terminates, the merge cancels `cx.cancel`, or the
/// merge drops its receiver. Cancellation is checked before every pull and
/// while blocked on a full channel.
pub fn run_worker(source: usize, mut node: AnyNode, cx: NodeContext, tx: Sender<WorkerMessage>) {
    tracing::trace!("Merge worker {} started ({})", source, node.name());

    loop {
        if cx.cancel.is_cancelled() {
            node.cancel();
            tracing::trace!("Merge worker {} cancelled", source);
            return;
        }

        let seen = cx.wake.generation();
        let signal = match node.next(&cx) {
            Pull::Ready(signal) => signal,
            Pull::Pending => {
                cx.wake.wait_since(seen, cx.idle_wait);
                continue;
            }
        };

        let terminal = signal.is_terminal();
        let mut msg = WorkerMessage { source, signal };
        loop {
            match tx.send_timeout(msg, cx.idle_wait) {
                Ok(()) => {
                    cx.wake.notify();
                    break;
                }
                Err(SendTimeoutError::Timeout(back)) => {
                    if cx.cancel.is_cancelled() {
                        node.cancel();
                        tracing::trace!("Merge worker {} cancelled while blocked", source);
                        return;
                    }
                    msg = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    node.cancel();
                    tracing::trace!("Merge worker {} lost its consumer", source);
                    return;
                }
            }
        }

        if terminal {
            tracing::trace!("Merge worker {} finished", source);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bridge::worker_channel;
    use crate::pipeline::clock::VirtualClock;
    use crate::pipeline::node::BuiltinNode;
    use crate::pipeline::nodes::{JustNode, NeverNode};
    use crate::pipeline::signal::Signal;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    fn cx() -> NodeContext {
        NodeContext::new(Arc::new(VirtualClock::new()), Duration::from_millis(1))
    }

    #[test]
    fn test_thread_executor_runs_task() {
        let (tx, rx) = mpsc::channel();
        ThreadExecutor::new()
            .execute("test-task", Box::new(move || tx.send(42).unwrap()))
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_worker_pool_runs_tasks() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let (tx, rx) = mpsc::channel();
        for i in 0..4 {
            let tx = tx.clone();
            pool.execute("job", Box::new(move || tx.send(i).unwrap()))
                .unwrap();
        }
        let mut got: Vec<i32> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_worker_forwards_until_terminal() {
        let (tx, rx) = worker_channel(8);
        let node = AnyNode::Builtin(BuiltinNode::Just(JustNode::new(vec!["a".into()])));
        run_worker(3, node, cx(), tx);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.source, 3);
        assert_eq!(first.signal, Signal::Value("a".into()));
        assert_eq!(rx.try_recv().unwrap().signal, Signal::Complete);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_worker_stops_on_cancel() {
        let (tx, _rx) = worker_channel(1);
        let cx = cx();
        let token = cx.cancel.clone();
        let node = AnyNode::Builtin(BuiltinNode::Never(NeverNode::new()));
        let handle = std::thread::spawn(move || run_worker(0, node, cx, tx));
        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_executor_failure_surfaces() {
        let mut executor = MockExecutor::new();
        executor.expect_name().return_const("Mock".to_string());
        executor
            .expect_execute()
            .returning(|_, _| Err(FluxError::Executor("rejected".into())));
        let err = executor.execute("x", Box::new(|| {})).unwrap_err();
        assert_eq!(err, FluxError::Executor("rejected".into()));
    }
}

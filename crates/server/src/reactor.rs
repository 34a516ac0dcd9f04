//! A fixed pool of single-threaded event loops.
//!
//! Every [`Reactor`] is a current-thread tokio runtime driven by exactly one OS
//! thread. Connections are placed on reactors round-robin and stay pinned to the
//! reactor they were placed on.
//!
//! ```no_run
//! use av_server::ReactorPool;
//!
//! let pool = ReactorPool::new(4)?;
//! let reactor = pool.next();
//! reactor.spawn(async { println!("running on a reactor") });
//!
//! let stop = pool.stop_handle();
//! std::thread::spawn(move || stop.stop());
//! pool.run()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Owns the runtimes. Dropping the pool shuts them down, so it must not be dropped
/// from inside one of its own reactors.
#[derive(Debug)]
pub struct ReactorPool {
    runtimes: Vec<Runtime>,
    reactors: Arc<Reactors>,
    shutdown: CancellationToken,
}

/// The shared, cheaply cloneable view of a pool used for placement.
#[derive(Debug)]
pub struct Reactors {
    reactors: Vec<Reactor>,
    next: AtomicUsize,
}

/// One event loop of the pool.
#[derive(Debug, Clone)]
pub struct Reactor {
    index: usize,
    handle: Handle,
}

/// Stops a running pool from any thread or task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown: CancellationToken,
}

impl ReactorPool {
    /// Builds `size` reactors. They do not make progress until [`ReactorPool::run`].
    pub fn new(size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "reactor pool size must be greater than 0"));
        }

        let runtimes = (0..size)
            .map(|index| Builder::new_current_thread().thread_name(format!("reactor-{index}")).enable_all().build())
            .collect::<io::Result<Vec<_>>>()?;

        let reactors = runtimes.iter().enumerate().map(|(index, runtime)| Reactor::new(index, runtime.handle().clone())).collect();

        Ok(Self { runtimes, reactors: Arc::new(Reactors::new(reactors)), shutdown: CancellationToken::new() })
    }

    pub fn size(&self) -> usize {
        self.runtimes.len()
    }

    /// Returns the next reactor, round-robin.
    pub fn next(&self) -> Reactor {
        self.reactors.next()
    }

    pub fn reactors(&self) -> Arc<Reactors> {
        Arc::clone(&self.reactors)
    }

    /// Drives every reactor until [`ReactorPool::stop`] is called.
    ///
    /// Reactor 0 runs on the calling thread, every other reactor gets its own
    /// thread. Returns once all of them have exited.
    pub fn run(&self) -> io::Result<()> {
        info!(reactors = self.size(), "reactor pool running");

        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(self.runtimes.len().saturating_sub(1));
            for (index, runtime) in self.runtimes.iter().enumerate().skip(1) {
                let shutdown = self.shutdown.clone();
                let spawned = thread::Builder::new()
                    .name(format!("reactor-{index}"))
                    .spawn_scoped(scope, move || runtime.block_on(shutdown.cancelled()));
                match spawned {
                    Ok(worker) => workers.push(worker),
                    Err(e) => {
                        // release the reactors already started so the scope can join them
                        self.shutdown.cancel();
                        return Err(e);
                    }
                }
            }

            if let Some(runtime) = self.runtimes.first() {
                runtime.block_on(self.shutdown.cancelled());
            }

            for worker in workers {
                if worker.join().is_err() {
                    return Err(io::Error::other("reactor thread panicked"));
                }
            }
            Ok(())
        })?;

        info!("reactor pool stopped");
        Ok(())
    }

    /// Stops every reactor, [`ReactorPool::run`] returns once they have exited.
    pub fn stop(&self) {
        debug!("stopping reactor pool");
        self.shutdown.cancel();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { shutdown: self.shutdown.clone() }
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Reactors {
    fn new(reactors: Vec<Reactor>) -> Self {
        Self { reactors, next: AtomicUsize::new(0) }
    }

    /// Returns the next reactor, round-robin. Consistent across threads.
    pub fn next(&self) -> Reactor {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.reactors.len();
        self.reactors[index].clone()
    }

    pub fn len(&self) -> usize {
        self.reactors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Reactor> {
        self.reactors.get(index)
    }
}

impl Reactor {
    pub(crate) fn new(index: usize, handle: Handle) -> Self {
        Self { index, handle }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a task pinned to this reactor.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn empty_pool_rejected() {
        let error = ReactorPool::new(0).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn round_robin() {
        let pool = ReactorPool::new(3).unwrap();

        let indices = (0..2 * pool.size()).map(|_| pool.next().index()).collect::<Vec<_>>();

        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn round_robin_shared_cursor() {
        let pool = ReactorPool::new(2).unwrap();
        let reactors = pool.reactors();

        assert_eq!(pool.next().index(), 0);
        assert_eq!(reactors.next().index(), 1);
        assert_eq!(pool.next().index(), 0);
        assert_eq!(reactors.len(), 2);
    }

    #[test]
    fn run_until_stopped() {
        let pool = ReactorPool::new(2).unwrap();
        let (sender, receiver) = mpsc::channel();

        for _ in 0..pool.size() {
            let sender = sender.clone();
            pool.next().spawn(async move {
                let name = thread::current().name().map(str::to_owned);
                sender.send(name).unwrap();
            });
        }

        let stop = pool.stop_handle();
        let stopper = thread::spawn(move || {
            let mut names = (0..2).map(|_| receiver.recv_timeout(Duration::from_secs(5)).unwrap()).collect::<Vec<_>>();
            stop.stop();
            names.sort();
            names
        });

        pool.run().unwrap();
        let names = stopper.join().unwrap();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&Some("reactor-1".to_owned())));
    }

    #[test]
    fn stop_before_run() {
        let pool = ReactorPool::new(1).unwrap();
        pool.stop();
        pool.run().unwrap();
    }
}

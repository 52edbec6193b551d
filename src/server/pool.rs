//! # Pool de Workers
//! src/server/pool.rs
//!
//! N threads con nombre `worker-{id}` que consumen de una `WorkQueue`
//! compartida. Cada item se procesa hasta el final antes de pedir el
//! siguiente.
//!
//! Un panic dentro del handler queda aislado con `catch_unwind`: el item se
//! descarta (para una conexión, eso la cierra) y el worker vuelve al loop.

use super::queue::WorkQueue;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

/// Pool de tamaño fijo
pub struct WorkerPool<T: Send + 'static> {
    queue: Arc<WorkQueue<T>>,
    workers: Vec<Worker>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Lanza `size` workers que ejecutan `handler` sobre cada item de `queue`
    ///
    /// # Ejemplo
    /// ```
    /// use minihttpd::server::pool::WorkerPool;
    /// use minihttpd::server::queue::WorkQueue;
    /// use std::sync::Arc;
    ///
    /// let queue = Arc::new(WorkQueue::new(8));
    /// let mut pool = WorkerPool::start(2, Arc::clone(&queue), |n: u32| {
    ///     let _ = n * 2;
    /// }).unwrap();
    ///
    /// queue.enqueue(21).unwrap();
    /// pool.stop();
    /// ```
    pub fn start<F>(size: usize, queue: Arc<WorkQueue<T>>, handler: F) -> io::Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut pool = Self {
            queue: Arc::clone(&queue),
            workers: Vec::with_capacity(size),
        };

        for id in 0..size {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, &queue, handler.as_ref()));

            match spawned {
                Ok(handle) => pool.workers.push(Worker {
                    id,
                    handle: Some(handle),
                }),
                Err(e) => {
                    error!(worker = id, error = %e, "failed to spawn worker");
                    pool.stop();
                    return Err(e);
                }
            }
        }

        info!(workers = size, capacity = queue.capacity(), "worker pool started");
        Ok(pool)
    }

    /// Cantidad de workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Pide shutdown a la cola, despierta a todos los workers y espera a que
    /// terminen el item que tengan en curso
    ///
    /// Los items que seguían en la cola se descartan sin procesar.
    pub fn stop(&mut self) {
        let leftover = self.queue.shutdown();
        if !leftover.is_empty() {
            warn!(count = leftover.len(), "dropping queued items on pool stop");
        }
        drop(leftover);

        let mut joined = 0;
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!(worker = worker.id, "worker thread terminated abnormally");
                }
                joined += 1;
            }
        }

        if joined > 0 {
            info!(workers = joined, "worker pool stopped");
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<T, F>(id: usize, queue: &WorkQueue<T>, handler: &F)
where
    F: Fn(T),
{
    debug!(worker = id, "worker started");

    while let Some(item) = queue.dequeue() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(item)));

        if let Err(payload) = outcome {
            error!(
                worker = id,
                panic = panic_message(payload.as_ref()),
                "handler panicked, item dropped"
            );
        }
    }

    debug!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

//! # Cola de Trabajo Acotada
//! src/server/queue.rs
//!
//! Ring buffer de capacidad fija compartido entre el acceptor (productor)
//! y los workers (consumidores).
//!
//! - `enqueue` nunca bloquea: si la cola está llena devuelve el item.
//! - `dequeue` bloquea hasta que haya un item o se pida shutdown.
//! - `shutdown` despierta a todos los workers y devuelve, en orden FIFO,
//!   los items que quedaron sin procesar. El llamador decide qué hacer con
//!   ellos (el servidor los cierra sin atenderlos).
//!
//! `count` es la única fuente de verdad para lleno/vacío y solo se toca con
//! el lock tomado.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Rechazo de `enqueue`. Devuelve el item al llamador.
#[derive(Debug, Error)]
pub enum EnqueueError<T> {
    #[error("work queue is full")]
    Full(T),

    #[error("work queue is shut down")]
    ShutDown(T),
}

impl<T> EnqueueError<T> {
    /// Recupera el item rechazado
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::Full(item) | EnqueueError::ShutDown(item) => item,
        }
    }
}

struct QueueState<T> {
    slots: Vec<Option<T>>,
    front: usize,
    rear: usize,
    count: usize,
    shutdown: bool,
}

impl<T> QueueState<T> {
    fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let item = self.slots[self.front].take();
        self.front = (self.front + 1) % self.slots.len();
        self.count -= 1;
        item
    }
}

/// Cola FIFO acotada, thread-safe
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    capacity: usize,
}

impl<T> WorkQueue<T> {
    /// Crea una cola con `capacity` slots
    ///
    /// # Panics
    ///
    /// Si `capacity` es 0. La configuración lo valida antes.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "work queue capacity must be positive");

        Self {
            state: Mutex::new(QueueState {
                slots: (0..capacity).map(|_| None).collect(),
                front: 0,
                rear: 0,
                count: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    // Los panics de los handlers ocurren fuera del lock; un lock envenenado
    // no deja el estado a medio modificar.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola sin bloquear
    ///
    /// # Ejemplo
    /// ```
    /// use minihttpd::server::queue::{EnqueueError, WorkQueue};
    ///
    /// let queue = WorkQueue::new(1);
    /// queue.enqueue("a").unwrap();
    ///
    /// match queue.enqueue("b") {
    ///     Err(EnqueueError::Full(item)) => assert_eq!(item, "b"),
    ///     other => panic!("unexpected: {:?}", other),
    /// }
    /// ```
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let mut state = self.lock();

        if state.shutdown {
            return Err(EnqueueError::ShutDown(item));
        }
        if state.count == self.capacity {
            return Err(EnqueueError::Full(item));
        }

        let rear = state.rear;
        state.slots[rear] = Some(item);
        state.rear = (rear + 1) % self.capacity;
        state.count += 1;
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Desencola bloqueando hasta que haya un item
    ///
    /// Retorna `None` cuando se pidió shutdown, aunque queden items: esos
    /// los devuelve `shutdown()`.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.lock();

        loop {
            if state.shutdown {
                return None;
            }
            if let Some(item) = state.pop() {
                return Some(item);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marca la cola como cerrada, despierta a todos los consumidores y
    /// devuelve los items pendientes en orden FIFO
    ///
    /// Es idempotente: una segunda llamada devuelve un vector vacío.
    pub fn shutdown(&self) -> Vec<T> {
        let mut state = self.lock();
        state.shutdown = true;

        let mut drained = Vec::with_capacity(state.count);
        while let Some(item) = state.pop() {
            drained.push(item);
        }
        drop(state);

        self.available.notify_all();
        drained
    }

    pub fn len(&self) -> usize {
        self.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = WorkQueue::new(4);
        for i in 0..4 {
            queue.enqueue(i).unwrap();
        }
        let out: Vec<_> = (0..4).map(|_| queue.dequeue().unwrap()).collect();
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_rejects_and_keeps_state() {
        let queue = WorkQueue::new(3);
        for i in 0..3 {
            queue.enqueue(i).unwrap();
        }

        match queue.enqueue(99) {
            Err(EnqueueError::Full(item)) => assert_eq!(item, 99),
            other => panic!("expected Full, got {:?}", other),
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some(0));
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
    }

    #[test]
    fn test_wraparound() {
        let queue = WorkQueue::new(2);
        for round in 0..10 {
            queue.enqueue(round * 2).unwrap();
            queue.enqueue(round * 2 + 1).unwrap();
            assert!(queue.enqueue(-1).is_err());
            assert_eq!(queue.dequeue(), Some(round * 2));
            assert_eq!(queue.dequeue(), Some(round * 2 + 1));
        }
        assert!(queue.is_empty());
    }

    // Política de drenado: lo que quedó en la cola se devuelve en FIFO
    // y no se entrega a ningún worker.
    #[test]
    fn test_shutdown_drains_in_fifo_order() {
        let queue = WorkQueue::new(5);
        for i in 0..5 {
            queue.enqueue(i).unwrap();
        }
        queue.dequeue().unwrap();

        let drained = queue.shutdown();
        assert_eq!(drained, vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
        assert!(queue.is_shut_down());
        assert_eq!(queue.dequeue(), None);
        assert!(queue.shutdown().is_empty());
    }

    #[test]
    fn test_enqueue_after_shutdown() {
        let queue = WorkQueue::new(2);
        queue.shutdown();
        match queue.enqueue(7) {
            Err(EnqueueError::ShutDown(item)) => assert_eq!(item, 7),
            other => panic!("expected ShutDown, got {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumers() {
        let queue = Arc::new(WorkQueue::<u32>::new(2));
        let (tx, rx) = mpsc::channel();

        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            thread::spawn(move || {
                tx.send(queue.dequeue()).unwrap();
            });
        }

        thread::sleep(Duration::from_millis(50));
        queue.shutdown();

        for _ in 0..3 {
            let result = rx.recv_timeout(Duration::from_secs(2)).expect("consumer did not wake");
            assert_eq!(result, None);
        }
    }

    #[test]
    fn test_blocked_consumer_receives_item() {
        let queue = Arc::new(WorkQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue("conn").unwrap();
        assert_eq!(consumer.join().unwrap(), Some("conn"));
    }

    // Cada consumidor ve sus items en orden creciente y ningún item se
    // pierde ni se duplica.
    #[test]
    fn test_fifo_across_concurrent_consumers() {
        const ITEMS: usize = 2000;
        let queue = Arc::new(WorkQueue::new(8));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.dequeue() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..ITEMS {
            let mut item = i;
            loop {
                match queue.enqueue(item) {
                    Ok(()) => break,
                    Err(e) => {
                        item = e.into_inner();
                        thread::yield_now();
                    }
                }
            }
        }

        while !queue.is_empty() {
            thread::yield_now();
        }
        let drained = queue.shutdown();

        let mut all = drained;
        for consumer in consumers {
            let seen = consumer.join().unwrap();
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "consumer saw out-of-order items");
            all.extend(seen);
        }

        all.sort_unstable();
        assert_eq!(all, (0..ITEMS).collect::<Vec<_>>());
    }
}

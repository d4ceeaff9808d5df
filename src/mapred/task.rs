/*! A bounded, blocking FIFO queue for handing work between threads

# About
The only synchronization primitive in the whole pipeline. The
[scheduler](crate::mapred::scheduler) produces onto a *commands* queue that every worker
consumes, and consumes a *results* queue that every worker produces onto; both are
instances of the [`TaskQueue`] here. A full queue blocks its producers, an empty queue
blocks its consumers, and that back-pressure is the entirety of the pipeline's flow
control — nothing else in the crate ever suspends.

std's channels are single-consumer, which rules them out for the commands side (many
workers pop from it), so the queue is built the classic way: one mutex around a fixed
ring, plus two condition variables — `fill`, signalled after a push for blocked
consumers, and `drain`, signalled after a pop for blocked producers. Signals fire after
the lock is released; nothing about the hand-off needs the extra determinism of
signalling under the lock.

# Design
The ring is a `head + count` circular buffer over `CAPACITY` option slots, the same
wrap-around arithmetic as the Vec-based circular queue pattern. FIFO order per queue is
a hard guarantee; fairness between multiple blocked consumers is whatever the OS
condvar provides, which is all the pipeline needs (any worker may take any work).

Lock poisoning is treated as a contract violation: a worker panicking mid-queue
operation means the run is already lost, so the queue panics along with it rather than
limping on.

# Example
```rust
    use heapred::mapred::task::TaskQueue;
    use std::thread;

    let queue: TaskQueue<u32> = TaskQueue::new();

    thread::scope(|scope| {
        scope.spawn(|| {
            for value in 0..100 {
                queue.push(value);
            }
        });

        // FIFO order holds across the blocking hand-off
        for expect in 0..100 {
            assert_eq!(queue.pop(), expect);
        }
    });
```
*/

use std::sync::{Condvar, Mutex};

/// Maximum number of work units a queue holds before pushes block.
pub const QUEUE_CAPACITY: usize = 32;

struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    count: usize,
}

/// # About
///
/// See the [module-level documentation](crate::mapred::task) for more
/// information.
pub struct TaskQueue<T> {
    ring: Mutex<Ring<T>>,
    /// Signalled after a push: the queue has something to consume.
    fill: Condvar,
    /// Signalled after a pop: the queue has room to produce into.
    drain: Condvar,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue of [`QUEUE_CAPACITY`] slots.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(QUEUE_CAPACITY);
        slots.resize_with(QUEUE_CAPACITY, || None);

        TaskQueue {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                count: 0,
            }),
            fill: Condvar::new(),
            drain: Condvar::new(),
        }
    }

    /// Appends a work unit, blocking while the queue is full.
    pub fn push(&self, value: T) {
        let mut ring = self.ring.lock().expect("task queue poisoned");

        while ring.count == QUEUE_CAPACITY {
            // Wait for a consumer to drain a slot
            ring = self.drain.wait(ring).expect("task queue poisoned");
        }

        let slot = (ring.head + ring.count) % QUEUE_CAPACITY;
        ring.slots[slot] = Some(value);
        ring.count += 1;

        drop(ring);

        // Wake a consumer, outside the critical section
        self.fill.notify_one();
    }

    /// Removes and returns the oldest work unit, blocking while the queue is
    /// empty.
    pub fn pop(&self) -> T {
        let mut ring = self.ring.lock().expect("task queue poisoned");

        while ring.count == 0 {
            // Wait for a producer to fill a slot
            ring = self.fill.wait(ring).expect("task queue poisoned");
        }

        let head = ring.head;
        let value = ring.slots[head].take().expect("counted slot is occupied");
        ring.head = (head + 1) % QUEUE_CAPACITY;
        ring.count -= 1;

        drop(ring);

        // Wake a producer, outside the critical section
        self.drain.notify_one();

        value
    }

    /// Returns the number of work units currently queued. Advisory only: the
    /// answer can be stale the moment the lock drops.
    pub fn len(&self) -> usize {
        self.ring.lock().expect("task queue poisoned").count
    }

    /// Returns `true` if the queue is currently empty. Advisory only.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_within_capacity() {
        let queue: TaskQueue<u32> = TaskQueue::new();

        for value in 0..QUEUE_CAPACITY as u32 {
            queue.push(value);
        }
        assert_eq!(queue.len(), QUEUE_CAPACITY);

        for expect in 0..QUEUE_CAPACITY as u32 {
            assert_eq!(queue.pop(), expect);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn producer_blocks_on_full_queue() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        let pushed = AtomicUsize::new(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                // One more than capacity: the last push must block until the
                // main thread pops
                for value in 0..=QUEUE_CAPACITY as u32 {
                    queue.push(value);
                    pushed.fetch_add(1, Ordering::SeqCst);
                }
            });

            while pushed.load(Ordering::SeqCst) < QUEUE_CAPACITY {
                thread::yield_now();
            }
            // Give the producer a chance to (wrongly) squeeze one more in
            thread::sleep(Duration::from_millis(20));
            assert_eq!(pushed.load(Ordering::SeqCst), QUEUE_CAPACITY);

            assert_eq!(queue.pop(), 0);

            // The blocked push completes now
            for expect in 1..=QUEUE_CAPACITY as u32 {
                assert_eq!(queue.pop(), expect);
            }
        });
    }

    #[test]
    fn consumer_blocks_until_fill() {
        let queue: TaskQueue<u32> = TaskQueue::new();

        thread::scope(|scope| {
            let popper = scope.spawn(|| queue.pop());

            thread::sleep(Duration::from_millis(20));
            queue.push(77);

            assert_eq!(popper.join().expect("popper thread panicked"), 77);
        });
    }

    #[test]
    fn many_producers_many_consumers_conserve_items() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let queue: TaskQueue<usize> = TaskQueue::new();
        let sum = AtomicUsize::new(0);

        thread::scope(|scope| {
            for p in 0..PRODUCERS {
                let queue = &queue;
                scope.spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push(p * PER_PRODUCER + i);
                    }
                });
            }

            for _ in 0..CONSUMERS {
                let queue = &queue;
                let sum = &sum;
                scope.spawn(move || {
                    for _ in 0..(PRODUCERS * PER_PRODUCER / CONSUMERS) {
                        sum.fetch_add(queue.pop(), Ordering::SeqCst);
                    }
                });
            }
        });

        let n = PRODUCERS * PER_PRODUCER;
        assert_eq!(sum.load(Ordering::SeqCst), n * (n - 1) / 2);
        assert!(queue.is_empty());
    }
}

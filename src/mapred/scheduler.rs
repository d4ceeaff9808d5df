/*! Work scheduling for the map-reduce pipeline

# About
The conductor of the word-frequency pipeline. Given a flat byte buffer and a worker
count, [`Scheduler::run`] cuts the input into delimiter-aligned chunks, fans one *map*
work per chunk out to a pool of worker threads, pairs the finished token stores back
together through *reduce* works until a single store remains, and shuts the pool down
with an explicit Exit handshake before returning that store to the caller.

Ownership does the heavy lifting in the concurrency story. A [`WorkUnit`] owns its token
store; pushing it onto a queue *moves* it to whichever thread pops it, so at every
instant each store has exactly one owner and nobody locks anything except the queues
themselves. The input buffer is the one shared thing, and it is shared read-only.

# Design
Workers are scoped, named threads: the borrow checker proves nothing outlives the run,
and the scope joins them after the Exit handshake — the handshake (one Exit work per
worker, one acknowledgement back per worker) is still what gates teardown, exactly
because a worker must have drained every work assigned to it before it sees its Exit.

The phases, in order:

1. Spawn `task_count` workers, all blocking on the commands queue.
2. Partition: each non-terminal chunk gets `len / task_count` bytes, retreated to the
   nearest preceding delimiter so no token straddles chunks; the remainder lands in the
   last chunk. Inputs that cannot be cut this way (no delimiter anywhere near a
   boundary, or fewer bytes than workers) are reported as errors rather than mis-mapped.
3. Post one map work per chunk.
4. Reduce: pop two finished stores, rebind one as a reduce of the other, repost; repeat
   until two remain. The final merge runs inline on the scheduler thread, overlapping
   with the exit phase.
5. Exit: post one Exit per worker, drain one acknowledgement per worker, fall off the
   scope (joining the — by now finished — threads).

If spawning or partitioning fails midway, the already-spawned workers get their Exit
works immediately, their acknowledgements are drained, and the error is returned; no
partial output escapes.

# Example
```no_run
    use heapred::mapred::scheduler::Scheduler;

    let data = std::fs::read("big.txt").expect("readable input");

    let store = Scheduler::new(4).run(&data).expect("schedulable input");
    store.dump(&mut std::io::stdout()).expect("writable stdout");
```
*/

use crate::mapred::task::TaskQueue;
use crate::mapred::token::{backward_token_len, is_delim, TokenStore};
use std::fmt;
use std::io;
use std::thread;

/// Hard ceiling on the worker count.
pub const TASK_COUNT_MAX: usize = 256;

// Matches the thread name workers run under, mostly to ease debugging.
const WORKER_NAME: &str = "worker";

/// Why a run could not produce a merged store.
#[derive(Debug)]
pub enum SchedulerError {
    /// The OS refused to spawn a worker thread.
    Spawn(io::Error),
    /// The input holds no bytes at all.
    EmptyInput,
    /// The input cannot be cut into per-worker chunks at delimiter
    /// boundaries (e.g. one huge token, or fewer bytes than workers).
    UnsplittableInput,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Spawn(err) => write!(f, "failed to spawn worker: {err}"),
            SchedulerError::EmptyInput => write!(f, "input is empty"),
            SchedulerError::UnsplittableInput => {
                write!(f, "input has no delimiter near a chunk boundary")
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

// What a worker is asked to do with the store it was handed.
enum WorkKind<'a> {
    // Tokenize a chunk of the input into the unit's store.
    Map { data: &'a [u8] },
    // Fold another store into the unit's store.
    Reduce { source: TokenStore<'a> },
    // Acknowledge and break out of the worker loop.
    Exit,
}

// One unit of work travelling the queues; ownership of the store transfers
// with it on every hop.
struct WorkUnit<'a> {
    tokens: TokenStore<'a>,
    kind: WorkKind<'a>,
}

impl<'a> WorkUnit<'a> {
    fn map(data: &'a [u8]) -> Self {
        WorkUnit {
            tokens: TokenStore::new(),
            kind: WorkKind::Map { data },
        }
    }

    fn reduce(tokens: TokenStore<'a>, source: TokenStore<'a>) -> Self {
        WorkUnit {
            tokens,
            kind: WorkKind::Reduce { source },
        }
    }

    fn exit() -> Self {
        WorkUnit {
            tokens: TokenStore::new(),
            kind: WorkKind::Exit,
        }
    }
}

// Worker thread body: pop, run, post the completed store, repeat until Exit.
// The Exit acknowledgement reuses the (empty) store as the token.
fn worker_loop<'a>(commands: &TaskQueue<WorkUnit<'a>>, results: &TaskQueue<TokenStore<'a>>) {
    loop {
        let WorkUnit { mut tokens, kind } = commands.pop();

        match kind {
            WorkKind::Map { data } => {
                tokens.tokenize(data);
                results.push(tokens);
            }
            WorkKind::Reduce { mut source } => {
                tokens.merge(&mut source);
                results.push(tokens);
            }
            WorkKind::Exit => {
                results.push(tokens);
                return;
            }
        }
    }
}

// Trims a prospective chunk back to the nearest delimiter boundary: if the
// last byte already is one, the cut is clean; otherwise drop the trailing
// partial token.
fn adjust_chunk(chunk: &[u8]) -> usize {
    if is_delim(chunk[chunk.len() - 1]) {
        chunk.len()
    } else {
        chunk.len() - backward_token_len(chunk)
    }
}

// Cuts the input into `count` non-empty, delimiter-aligned chunks; the last
// chunk soaks up the rounding remainder.
fn partition(data: &[u8], count: usize) -> Result<Vec<&[u8]>, SchedulerError> {
    let target = data.len() / count;
    let mut chunks = Vec::with_capacity(count);
    let mut rest = data;

    for _ in 0..count - 1 {
        let want = target.min(rest.len());
        if want == 0 {
            return Err(SchedulerError::UnsplittableInput);
        }

        let bytes = adjust_chunk(&rest[..want]);
        if bytes == 0 {
            return Err(SchedulerError::UnsplittableInput);
        }

        chunks.push(&rest[..bytes]);
        rest = &rest[bytes..];
    }

    if rest.is_empty() {
        return Err(SchedulerError::UnsplittableInput);
    }
    chunks.push(rest);

    Ok(chunks)
}

/// # About
///
/// See the [module-level documentation](crate::mapred::scheduler) for more
/// information.
pub struct Scheduler {
    task_count: usize,
}

impl Scheduler {
    /// Creates a scheduler driving `task_count` workers. The count must lie
    /// in `2..=`[`TASK_COUNT_MAX`]; anything else is a caller bug.
    pub fn new(task_count: usize) -> Self {
        assert!(
            (2..=TASK_COUNT_MAX).contains(&task_count),
            "task count out of range"
        );
        Scheduler { task_count }
    }

    /// Runs the full map-reduce pipeline over `data` and returns the merged
    /// token store.
    ///
    /// On any failure the already-spawned workers are shut down through the
    /// regular Exit handshake before the error is returned; no partial
    /// output is produced.
    pub fn run<'a>(&self, data: &'a [u8]) -> Result<TokenStore<'a>, SchedulerError> {
        if data.is_empty() {
            return Err(SchedulerError::EmptyInput);
        }

        let commands: TaskQueue<WorkUnit<'a>> = TaskQueue::new();
        let results: TaskQueue<TokenStore<'a>> = TaskQueue::new();

        thread::scope(|scope| {
            // Spawn the pool; on failure, exit whatever part of it came up
            let mut spawned = 0;
            for _ in 0..self.task_count {
                let spawn = thread::Builder::new()
                    .name(WORKER_NAME.into())
                    .spawn_scoped(scope, || worker_loop(&commands, &results));

                match spawn {
                    Ok(_) => spawned += 1,
                    Err(err) => {
                        Self::unwind(&commands, &results, spawned);
                        return Err(SchedulerError::Spawn(err));
                    }
                }
            }

            // Carve the input and fan the map works out
            let chunks = match partition(data, self.task_count) {
                Ok(chunks) => chunks,
                Err(err) => {
                    Self::unwind(&commands, &results, spawned);
                    return Err(err);
                }
            };
            for chunk in chunks {
                commands.push(WorkUnit::map(chunk));
            }

            // Pair finished stores into reduce works until two remain
            let mut pending = self.task_count - 1;
            while pending > 1 {
                let result = results.pop();
                let source = results.pop();

                commands.push(WorkUnit::reduce(result, source));
                pending -= 1;
            }

            let mut merged = results.pop();
            let mut last = results.pop();

            // Ask the pool to wind down, then run the final merge inline
            // while the workers drain their Exits
            for _ in 0..self.task_count {
                commands.push(WorkUnit::exit());
            }

            merged.merge(&mut last);

            for _ in 0..self.task_count {
                results.pop();
            }

            Ok(merged)
        })
    }

    // Failure path: hand every spawned worker its Exit and collect the
    // acknowledgements, so the scope join below cannot hang.
    fn unwind<'a>(
        commands: &TaskQueue<WorkUnit<'a>>,
        results: &TaskQueue<TokenStore<'a>>,
        spawned: usize,
    ) {
        for _ in 0..spawned {
            commands.push(WorkUnit::exit());
        }
        for _ in 0..spawned {
            results.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries<'a>(store: &TokenStore<'a>) -> Vec<(Vec<u8>, u32)> {
        store.iter().map(|t| (t.data.to_vec(), t.rate)).collect()
    }

    #[test]
    fn end_to_end_word_frequencies() {
        let input = b"foo bar foo. baz bar foo!";
        let store = Scheduler::new(4).run(input).expect("splittable input");

        assert_eq!(
            entries(&store),
            [
                (b"bar".to_vec(), 2),
                (b"baz".to_vec(), 1),
                (b"foo".to_vec(), 3),
            ]
        );
        assert_eq!(store.unique(), 3);
        assert_eq!(store.total(), 6);
    }

    #[test]
    fn agrees_with_single_threaded_tokenizer() {
        // A few kilobytes with a skewed word distribution
        let mut text = String::new();
        for i in 0..600 {
            text.push_str("lorem ipsum dolor sit amet, ");
            text.push_str(if i % 3 == 0 { "alpha " } else { "beta. " });
            if i % 7 == 0 {
                text.push_str("consectetur-adipiscing elit!\n");
            }
        }
        let data = text.as_bytes();

        let mut expect = TokenStore::new();
        expect.tokenize(data);

        for task_count in [2usize, 3, 4, 8, 16] {
            let store = Scheduler::new(task_count)
                .run(data)
                .expect("splittable input");

            assert_eq!(entries(&store), entries(&expect), "{task_count} workers");
            assert_eq!(store.unique(), expect.unique());
            assert_eq!(store.total(), expect.total());
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        match Scheduler::new(2).run(b"") {
            Err(SchedulerError::EmptyInput) => {}
            other => panic!("expected EmptyInput, got {other:?}"),
        }
    }

    #[test]
    fn undelimited_input_unwinds_cleanly() {
        // One giant token: no chunk boundary can retreat to a delimiter. The
        // run must fail and still join every worker (the scope would hang
        // otherwise).
        let data = vec![b'x'; 64];
        match Scheduler::new(4).run(&data) {
            Err(SchedulerError::UnsplittableInput) => {}
            other => panic!("expected UnsplittableInput, got {other:?}"),
        };
    }

    #[test]
    fn tiny_input_is_rejected() {
        match Scheduler::new(4).run(b"a b") {
            Err(SchedulerError::UnsplittableInput) => {}
            other => panic!("expected UnsplittableInput, got {other:?}"),
        }
    }

    #[test]
    fn partition_aligns_to_delimiters() {
        let data = b"alpha beta gamma delta epsilon zeta";
        let chunks = partition(data, 4).expect("splittable input");

        assert_eq!(chunks.len(), 4);

        // No token straddles a boundary: every non-terminal chunk ends on a
        // delimiter, and reassembly gives the input back
        for chunk in &chunks[..3] {
            assert!(is_delim(chunk[chunk.len() - 1]));
        }
        let rejoined: Vec<u8> = chunks.concat();
        assert_eq!(rejoined, data);
    }

    #[test]
    #[should_panic(expected = "task count out of range")]
    fn single_worker_is_a_caller_bug() {
        let _ = Scheduler::new(1);
    }
}

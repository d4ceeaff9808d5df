//! The `mapred` binary: word-frequency counting over a file, optionally
//! fanned out across worker threads.
//!
//! `mapred [-h|--help] FILE [TASK_COUNT]`
//!
//! With no task count (or a count of 0 or 1) the file is tokenized directly
//! on the main thread; with a count in `2..=256` the scheduler runs the full
//! map-reduce pipeline. Either way the resulting store is dumped to stdout as
//! one `token: count` line per unique token plus a totals trailer.

use heapred::mapred::scheduler::{Scheduler, TASK_COUNT_MAX};
use heapred::mapred::token::TokenStore;
use std::io::Write;
use std::process::ExitCode;

fn usage(me: &str) {
    eprintln!("Usage: {me} [-h|--help] FILE [TASK_COUNT]");
}

fn run_single(data: &[u8]) -> ExitCode {
    let mut store = TokenStore::new();
    store.tokenize(data);

    dump(&store)
}

fn run_multiple(data: &[u8], task_count: usize) -> ExitCode {
    match Scheduler::new(task_count).run(data) {
        Ok(store) => dump(&store),
        Err(err) => {
            eprintln!("Failed to run work scheduler: {err}.");
            ExitCode::FAILURE
        }
    }
}

fn dump(store: &TokenStore<'_>) -> ExitCode {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Err(err) = store.dump(&mut out).and_then(|()| out.flush()) {
        eprintln!("Failed to dump tokens: {err}.");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let me = args.first().map(String::as_str).unwrap_or("mapred");

    let mut positional = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                usage(me);
                return ExitCode::SUCCESS;
            }
            flag if flag.starts_with('-') => {
                usage(me);
                return ExitCode::FAILURE;
            }
            _ => positional.push(arg.as_str()),
        }
    }

    let (path, task_count) = match positional.as_slice() {
        [path] => (*path, 0),
        [path, count] => match count.parse::<usize>() {
            Ok(count) if count <= TASK_COUNT_MAX => (*path, count),
            _ => {
                eprintln!("Invalid number of workers (<= {TASK_COUNT_MAX}).");
                return ExitCode::FAILURE;
            }
        },
        _ => {
            eprintln!("Missing argument.");
            usage(me);
            return ExitCode::FAILURE;
        }
    };

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Failed to open \"{path}\" file: {err}.");
            return ExitCode::FAILURE;
        }
    };

    if task_count <= 1 {
        run_single(&data)
    } else {
        run_multiple(&data, task_count)
    }
}

// Copyright (C) 2017-2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run asynchronous tasks strictly one after the other.
//!
//! A [`Serializer`] accepts tasks from any number of callers and runs
//! them one at a time, in the order in which they were submitted. Each
//! submission yields a [`Handle`] reporting the outcome of exactly that
//! task. A task failing, be it by returning an error or by panicking,
//! is scoped to its `Handle` and never affects tasks submitted after
//! it.
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! use serialtx::Serializer;
//!
//! let serializer = Serializer::new();
//! let first = serializer.enqueue(|| async { Ok::<_, anyhow::Error>(1) });
//! let second = serializer.enqueue_fn(|| Ok::<_, anyhow::Error>(2));
//!
//! assert_eq!(first.await?, 1);
//! assert_eq!(second.await?, 2);
//! # Ok(())
//! # }
//! ```

mod log;

mod args;
mod error;
mod handle;
mod serializer;
#[cfg(any(test, feature = "test"))]
pub mod test;

pub use crate::args::Args;
pub use crate::error::Error;
pub use crate::handle::Handle;
pub use crate::serializer::Builder;
pub use crate::serializer::Serializer;

use std::env::args_os;
use std::io::stdout;
use std::io::Write;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::ensure;
use anyhow::Context as _;
use anyhow::Result;

use clap::error::ErrorKind as ClapError;
use clap::Parser as _;

#[cfg(feature = "coredump")]
use coredump::register_panic_handler;

use tokio::runtime::Builder as RuntimeBuilder;
use tokio::time::sleep;

use crate::log::info;


/// What a task run by the program is supposed to do once its delay
/// expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
  /// Increment the shared counter and report the new value.
  Count,
  /// Report an error.
  Fail,
  /// Panic.
  Panic,
}


/// The body of a single task run by the program.
async fn run_task(
  index: usize,
  delay: Duration,
  outcome: Outcome,
  counter: Arc<AtomicUsize>,
) -> Result<usize> {
  let () = sleep(delay).await;

  match outcome {
    Outcome::Count => Ok(counter.fetch_add(1, Ordering::SeqCst) + 1),
    Outcome::Fail => bail!("task {index} was asked to fail"),
    Outcome::Panic => panic!("task {index} was asked to panic"),
  }
}


/// Run the program, writing task outcomes to `out`.
pub async fn run_prog<W>(args: &Args, mut out: W) -> Result<()>
where
  W: Write,
{
  let Args {
    delays,
    fail,
    panic,
    ..
  } = args;

  for index in fail.iter().chain(panic.iter()) {
    ensure!(
      *index < delays.len(),
      "task index {index} is out of range; only {} task(s) provided",
      delays.len()
    );
  }

  let serializer = Serializer::builder().name("serialtx").build();
  let counter = Arc::new(AtomicUsize::new(0));
  info!(count = delays.len(), "running tasks");

  let handles = delays
    .iter()
    .enumerate()
    .map(|(index, delay)| {
      let outcome = if panic.contains(&index) {
        Outcome::Panic
      } else if fail.contains(&index) {
        Outcome::Fail
      } else {
        Outcome::Count
      };
      let delay = Duration::from_millis(*delay);
      let counter = Arc::clone(&counter);

      serializer.enqueue(move || run_task(index, delay, outcome, counter))
    })
    .collect::<Vec<_>>();

  for (index, handle) in handles.into_iter().enumerate() {
    let result = match handle.await {
      Ok(value) => writeln!(out, "task {index}: {value}"),
      Err(err) => writeln!(out, "task {index}: failed: {err}"),
    };
    let () = result.context("failed to write task outcome")?;
  }
  Ok(())
}


/// Run an instance of the program in the default configuration.
fn run_now(args: &Args) -> Result<()> {
  let rt = RuntimeBuilder::new_current_thread()
    .enable_time()
    .build()
    .context("failed to instantiate async runtime")?;

  let stdout = stdout();
  let future = run_prog(args, stdout.lock());
  rt.block_on(future)
}

/// Parse the arguments and run the program.
fn run_with_args() -> Result<()> {
  let args = match Args::try_parse_from(args_os()) {
    Ok(args) => args,
    Err(err) => match err.kind() {
      ClapError::DisplayHelp | ClapError::DisplayVersion => {
        print!("{err}");
        return Ok(())
      },
      _ => return Err(err.into()),
    },
  };

  let () = log::init(args.log_file.as_deref(), args.verbosity)?;
  #[cfg(feature = "coredump")]
  {
    let () = register_panic_handler().or_else(|(ctx, err)| {
      Err(err)
        .context(ctx)
        .context("failed to register core dump panic handler")
    })?;
  }

  run_now(&args)
}

/// Run the program and handle errors.
pub fn run() -> i32 {
  match run_with_args() {
    Ok(()) => 0,
    Err(err) => {
      eprintln!("{err:?}");
      1
    },
  }
}

// Copyright (C) 2024-2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt::Debug;
use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;


/// Run delayed tasks through a serializer and report their outcomes.
///
/// One task is enqueued per provided delay. Each task sleeps for its
/// delay and then increments a shared counter, reporting the new
/// value. Because tasks run strictly in submission order, the reported
/// values follow the order of the delays on the command line, not
/// their magnitude.
#[derive(Debug, Parser)]
#[clap(version = env!("SERIALTX_VERSION"))]
pub struct Args {
  /// The delays of the tasks to run, in milliseconds.
  #[clap(value_name = "DELAY_MS")]
  pub delays: Vec<u64>,
  /// The zero-based index of a task that should fail instead of
  /// reporting a value.
  #[clap(long = "fail", value_name = "INDEX")]
  pub fail: Vec<usize>,
  /// The zero-based index of a task that should panic instead of
  /// reporting a value.
  #[clap(long = "panic", value_name = "INDEX")]
  pub panic: Vec<usize>,
  /// The file to log to.
  ///
  /// Logging is only available if support for it was enabled at
  /// compile time.
  #[clap(long, value_name = "PATH")]
  pub log_file: Option<PathBuf>,
  /// Increase log verbosity (can be supplied multiple times).
  #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
  pub verbosity: u8,
}


#[cfg(test)]
mod tests {
  use super::*;


  /// Check that we can parse a typical command line.
  #[test]
  fn parse_args() {
    let args =
      Args::try_parse_from(["serialtx", "-vv", "10", "30", "--fail", "1", "20", "--panic", "2"])
        .unwrap();
    assert_eq!(args.delays, vec![10, 30, 20]);
    assert_eq!(args.fail, vec![1]);
    assert_eq!(args.panic, vec![2]);
    assert_eq!(args.log_file, None);
    assert_eq!(args.verbosity, 2);
  }

  /// Make sure that bogus delays are rejected.
  #[test]
  fn parse_invalid_delay() {
    let result = Args::try_parse_from(["serialtx", "ten"]);
    assert!(result.is_err());
  }
}

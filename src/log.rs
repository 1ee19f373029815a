// Copyright (C) 2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later


#[cfg(feature = "log")]
#[expect(clippy::module_inception)]
mod log {
  use std::env::temp_dir;
  use std::fs::File;
  use std::panic::set_hook;
  use std::panic::take_hook;
  use std::path::Path;

  use anyhow::Context as _;
  use anyhow::Result;

  use tracing::subscriber::set_global_default as set_global_subscriber;
  use tracing::Level;
  use tracing::Subscriber;
  use tracing_subscriber::fmt::time::SystemTime;
  use tracing_subscriber::FmtSubscriber;

  pub(crate) use tracing::debug;
  pub(crate) use tracing::error;
  pub(crate) use tracing::info;
  pub(crate) use tracing::trace;


  /// Map a verbosity count, as provided on the command line, to a
  /// maximum log level.
  fn level(verbosity: u8) -> Level {
    match verbosity {
      0 => Level::INFO,
      1 => Level::DEBUG,
      _ => Level::TRACE,
    }
  }

  /// Create a `Subscriber` that logs events up to `max_level` to a file
  /// at the given path.
  fn make_subscriber(
    log_path: &Path,
    max_level: Level,
  ) -> Result<impl Subscriber + Send + Sync + 'static> {
    let log_file = File::options()
      .create(true)
      .truncate(true)
      .read(false)
      .write(true)
      .open(log_path)
      .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let subscriber = FmtSubscriber::builder()
      .with_ansi(false)
      .with_level(true)
      .with_target(false)
      .with_thread_ids(true)
      .with_max_level(max_level)
      .with_timer(SystemTime)
      .with_writer(log_file)
      .finish();

    Ok(subscriber)
  }

  /// Install a global subscriber logging to `log_path` (or a file in
  /// the system's temporary directory) and make sure that panics get
  /// logged as well.
  pub(crate) fn init(log_path: Option<&Path>, verbosity: u8) -> Result<()> {
    let default_path;
    let log_path = match log_path {
      Some(log_path) => log_path,
      None => {
        default_path = temp_dir().join("serialtx.log");
        &default_path
      },
    };

    let subscriber = make_subscriber(log_path, level(verbosity))
      .context("failed to create tracing subscriber")?;
    let () = set_global_subscriber(subscriber).context("failed to set tracing subscriber")?;

    let default_panic = take_hook();
    let () = set_hook(Box::new(move |panic_info| {
      error!("Panic: {panic_info}");
      default_panic(panic_info);
    }));
    Ok(())
  }


  #[cfg(test)]
  mod tests {
    use super::*;

    use std::fs::remove_file;
    use std::process;


    /// Check that verbosity counts map to increasingly chatty levels.
    #[test]
    fn verbosity_levels() {
      assert_eq!(level(0), Level::INFO);
      assert_eq!(level(1), Level::DEBUG);
      assert_eq!(level(2), Level::TRACE);
      assert_eq!(level(u8::MAX), Level::TRACE);
    }

    /// Check that initialization creates the requested log file.
    #[test]
    fn init_creates_log_file() {
      let log_path = temp_dir().join(format!("serialtx-test-{}.log", process::id()));
      let () = init(Some(&log_path), 2).unwrap();
      debug!("log file initialized");

      assert!(log_path.exists());
      let () = remove_file(&log_path).unwrap();
    }
  }
}

#[cfg(not(feature = "log"))]
#[expect(unused_imports, clippy::module_inception)]
mod log {
  use std::path::Path;

  use anyhow::Result;

  macro_rules! noop {
    ($($args:tt)*) => {};
  }
  pub(crate) use noop as debug;
  pub(crate) use noop as error;
  pub(crate) use noop as info;
  pub(crate) use noop as trace;

  pub(crate) fn init(_log_path: Option<&Path>, _verbosity: u8) -> Result<()> {
    Ok(())
  }
}

pub(crate) use log::*;

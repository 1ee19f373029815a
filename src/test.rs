// Copyright (C) 2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Helpers for exercising serializers in tests.

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;

use tokio::time::sleep;


/// Create a task body that sleeps for `delay` and then increments
/// `counter`, resolving to the incremented value.
pub fn delayed_increment(
  counter: Arc<AtomicUsize>,
  delay: Duration,
) -> impl Future<Output = Result<usize>> + Send + 'static {
  async move {
    let () = sleep(delay).await;
    Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
  }
}

/// Create a task body that sleeps for `delay` and then moves `state`
/// from `from` to `to`, failing if `state` did not contain `from` at
/// that point.
pub fn delayed_transition(
  state: Arc<AtomicUsize>,
  from: usize,
  to: usize,
  delay: Duration,
) -> impl Future<Output = Result<()>> + Send + 'static {
  async move {
    let () = sleep(delay).await;
    match state.compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst) {
      Ok(_) => Ok(()),
      Err(actual) => bail!("expected state {from} but found {actual}"),
    }
  }
}

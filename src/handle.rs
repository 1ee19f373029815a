// Copyright (C) 2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use anyhow::Result;

use tokio::sync::oneshot::Receiver;
use tokio::task::JoinHandle;

use crate::error::Error;


enum State<T> {
  /// The task got scheduled and is driven by the runtime.
  Scheduled {
    /// The receiving end for the task's outcome, which is published
    /// before the next task is allowed to start.
    outcome: Receiver<Result<T>>,
    /// The handle of the runtime task driving ours.
    driver: JoinHandle<()>,
  },
  /// The task was rejected before it could be scheduled. The error is
  /// taken out once it has been reported.
  Rejected(Option<Error>),
}


/// A handle representing the eventual outcome of a single task.
///
/// A `Handle` is a [`Future`] resolving to the task's result once it
/// settled. Dropping it does not affect the task: it will still run at
/// its turn, and tasks enqueued after it will still run afterwards.
pub struct Handle<T> {
  /// The task's position in its serializer's pipeline.
  seq: Option<u64>,
  state: State<T>,
}

impl<T> Handle<T> {
  pub(crate) fn scheduled(seq: u64, outcome: Receiver<Result<T>>, driver: JoinHandle<()>) -> Self {
    Self {
      seq: Some(seq),
      state: State::Scheduled { outcome, driver },
    }
  }

  pub(crate) fn rejected(error: Error) -> Self {
    Self {
      seq: None,
      state: State::Rejected(Some(error)),
    }
  }

  /// Retrieve the zero-based sequence number the task was admitted
  /// with, if it was admitted to the pipeline at all.
  #[inline]
  pub fn seq(&self) -> Option<u64> {
    self.seq
  }

  /// Check whether the task has settled.
  ///
  /// Once a task has settled its successor may start. This method
  /// reports `true` at the latest by then.
  pub fn is_finished(&self) -> bool {
    match &self.state {
      // A closed channel counts as empty, so we have to consult the
      // driver to catch the case of it having been cancelled.
      State::Scheduled { outcome, driver } => !outcome.is_empty() || driver.is_finished(),
      State::Rejected(..) => true,
    }
  }
}

impl<T> Future for Handle<T> {
  type Output = Result<T>;

  fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    match &mut this.state {
      State::Scheduled { outcome, .. } => Pin::new(outcome).poll(ctx).map(|result| match result {
        Ok(result) => result,
        // The driver only ever goes away without publishing an outcome
        // when the runtime shuts down.
        Err(_closed) => Err(Error::Cancelled.into()),
      }),
      State::Rejected(error) => {
        // SANITY: A `Handle` is only ever polled to completion once,
        //         just as any other `Future`.
        let error = error.take().expect("handle polled after completion");
        Poll::Ready(Err(error.into()))
      },
    }
  }
}

impl<T> Debug for Handle<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    let Self { seq, state: _ } = self;

    f.debug_struct("Handle")
      .field("seq", seq)
      .field("finished", &self.is_finished())
      .finish()
  }
}

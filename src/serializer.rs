// Copyright (C) 2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

//! A module providing the means for running asynchronous tasks one
//! after the other, in the order in which they were submitted.
//!
//! The pipeline is not materialized as a list. Instead, each task holds
//! on to the link its predecessor will close once settled and, in turn,
//! owns the link its successor waits on. The serializer itself only
//! remembers the most recent link: the "tail".

use std::future::Future;
use std::mem::replace;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use anyhow::Error as AnyError;
use anyhow::Result;

use tokio::runtime::Handle as Runtime;
use tokio::sync::oneshot::channel;
use tokio::sync::oneshot::Receiver;
use tokio::task::spawn;

use crate::error::Error;
use crate::handle::Handle;
use crate::log::debug;
use crate::log::trace;


/// The name used for serializers not given one explicitly.
const DEFAULT_NAME: &str = "serializer";


/// The end of a serializer's pipeline.
#[derive(Debug)]
struct Tail {
  /// A receiver that resolves once every task enqueued so far has
  /// settled.
  ///
  /// It does not matter whether it resolves with a value or because
  /// the sending side got dropped: both mean "settled".
  settled: Receiver<()>,
  /// The sequence number to assign to the next task.
  next_seq: u64,
}

impl Tail {
  /// Create a `Tail` representing an empty pipeline.
  fn new() -> Self {
    let (done, settled) = channel();
    // The receiver is still around, so this cannot fail.
    let () = done.send(()).unwrap_or_default();

    Self {
      settled,
      next_seq: 0,
    }
  }

  /// Make `settled` the new end of the pipeline, returning the previous
  /// end along with the sequence number of the task guarding `settled`.
  fn advance(&mut self, settled: Receiver<()>) -> (Receiver<()>, u64) {
    let prev = replace(&mut self.settled, settled);
    let seq = self.next_seq;
    self.next_seq += 1;
    (prev, seq)
  }
}


#[derive(Debug)]
struct Inner {
  /// The name of the serializer, as used in log messages.
  name: String,
  /// The runtime to run tasks on, if one was configured explicitly.
  runtime: Option<Runtime>,
  tail: Mutex<Tail>,
}


/// A builder for [`Serializer`] objects.
#[derive(Debug, Default)]
pub struct Builder {
  name: Option<String>,
  runtime: Option<Runtime>,
}

impl Builder {
  /// Set the name of the serializer, which is included in log
  /// messages.
  pub fn name<S>(mut self, name: S) -> Self
  where
    S: Into<String>,
  {
    self.name = Some(name.into());
    self
  }

  /// Set the runtime tasks are run on.
  ///
  /// By default, the runtime the caller of one of the `enqueue`
  /// methods runs on is used. Setting one explicitly allows for
  /// submitting tasks from outside of any runtime context.
  pub fn runtime(mut self, runtime: Runtime) -> Self {
    self.runtime = Some(runtime);
    self
  }

  /// Create the [`Serializer`].
  pub fn build(self) -> Serializer {
    let Self { name, runtime } = self;

    let inner = Inner {
      name: name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
      runtime,
      tail: Mutex::new(Tail::new()),
    };

    Serializer {
      inner: Arc::new(inner),
    }
  }
}


/// A serializer for asynchronous tasks.
///
/// Tasks submitted to a `Serializer` run strictly one at a time and
/// start in the order in which they were submitted. A task only starts
/// once its predecessor has settled, be it successfully, with an error,
/// or by panicking. A failing task never prevents later ones from
/// running.
///
/// Every submission returns a [`Handle`] through which the task's
/// outcome can be observed. Submission itself never blocks and never
/// fails; all errors are reported through the `Handle`.
///
/// Clones of a `Serializer` share the same pipeline. Separately created
/// serializers are fully independent of each other.
///
/// # Notes
/// There is no timeout: a task that never settles stalls all tasks
/// submitted after it.
#[derive(Clone, Debug)]
pub struct Serializer {
  inner: Arc<Inner>,
}

impl Serializer {
  /// Create a new `Serializer` with an empty pipeline and default
  /// configuration.
  pub fn new() -> Self {
    Self::builder().build()
  }

  /// Retrieve a [`Builder`] for configuring a new `Serializer`.
  pub fn builder() -> Builder {
    Builder::default()
  }

  /// Retrieve the serializer's name.
  #[inline]
  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Enqueue an asynchronous task.
  ///
  /// `task` is invoked once all previously enqueued tasks have settled
  /// and the returned [`Handle`] resolves with the outcome of the
  /// future it returned.
  pub fn enqueue<F, Fut, T, E>(&self, task: F) -> Handle<T>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<AnyError>,
  {
    self.schedule(async move { task().await.map_err(Into::into) })
  }

  /// Enqueue a synchronous task.
  ///
  /// This is the equivalent of [`enqueue`][Self::enqueue] for tasks
  /// that produce their result directly. The next task may start right
  /// after `task` returned.
  pub fn enqueue_fn<F, T, E>(&self, task: F) -> Handle<T>
  where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<AnyError>,
  {
    self.schedule(async move { task().map_err(Into::into) })
  }

  /// Enqueue an asynchronous task along with the context and the
  /// arguments to invoke it with.
  ///
  /// At its turn, `task` is called as `task(context, args)`. A task of
  /// `None` is not invocable: the returned [`Handle`] fails with
  /// [`Error::NotInvocable`] and the pipeline is left untouched.
  pub fn enqueue_with<F, C, A, Fut, T, E>(
    &self,
    task: Option<F>,
    context: C,
    args: A,
  ) -> Handle<T>
  where
    F: FnOnce(C, A) -> Fut + Send + 'static,
    C: Send + 'static,
    A: Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<AnyError>,
  {
    match task {
      Some(task) => self.enqueue(move || task(context, args)),
      None => {
        debug!(serializer = self.name(), "rejecting non-invocable task");
        Handle::rejected(Error::NotInvocable)
      },
    }
  }

  /// Retrieve the runtime to spawn tasks on.
  fn runtime(&self) -> Option<Runtime> {
    self
      .inner
      .runtime
      .clone()
      .or_else(|| Runtime::try_current().ok())
  }

  /// Append `task` to the pipeline.
  fn schedule<Fut, T>(&self, task: Fut) -> Handle<T>
  where
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
  {
    let runtime = match self.runtime() {
      Some(runtime) => runtime,
      None => {
        debug!(serializer = self.name(), "no runtime available; rejecting task");
        return Handle::rejected(Error::NoRuntime)
      },
    };

    let (done, settled) = channel::<()>();
    let (publish, outcome) = channel::<Result<T>>();
    // The tail has to be swapped while holding the lock and before
    // anything is spawned, or submission order could get lost.
    let (prev, seq) = self
      .inner
      .tail
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .advance(settled);
    trace!(serializer = self.name(), seq, "task enqueued");

    let driver = runtime.spawn(async move {
      // We are only interested in our predecessor having settled, not
      // in how it did so.
      let _settled = prev.await;
      trace!(seq, "task started");

      // The task runs separately, so that a panic is contained in its
      // own `JoinHandle` instead of unwinding through here. That way
      // the outcome is always published before the successor is
      // unblocked.
      let result = match spawn(task).await {
        Ok(result) => result,
        Err(error) => Err(Error::from_join(error).into()),
      };
      trace!(seq, success = result.is_ok(), "task settled");

      // Nobody may be interested in the outcome anymore.
      let _sent = publish.send(result);
      drop(done);
    });

    Handle::scheduled(seq, outcome, driver)
  }
}

impl Default for Serializer {
  fn default() -> Self {
    Self::new()
  }
}

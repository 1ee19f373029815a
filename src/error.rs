// Copyright (C) 2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::any::Any;
use std::error::Error as StdError;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use tokio::task::JoinError;


/// An error originating from the serializer itself, as opposed to one
/// reported by a task.
///
/// Errors of this type are reported through a task's
/// [`Handle`][crate::Handle], wrapped in an [`anyhow::Error`]. Use
/// [`anyhow::Error::downcast_ref`] to get at them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
  /// The submitted task was not invocable.
  NotInvocable,
  /// No async runtime was available to run the task on.
  NoRuntime,
  /// The task panicked, with the contained message.
  Panicked(String),
  /// The runtime shut down before the task settled.
  Cancelled,
}

impl Error {
  /// Convert a [`JoinError`] as reported by the runtime into an
  /// [`Error`].
  pub(crate) fn from_join(error: JoinError) -> Self {
    if error.is_panic() {
      Self::Panicked(panic_message(error.into_panic()))
    } else {
      Self::Cancelled
    }
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::NotInvocable => f.write_str("task is not invocable"),
      Self::NoRuntime => f.write_str("no async runtime available to run task"),
      Self::Panicked(message) => write!(f, "task panicked: {message}"),
      Self::Cancelled => f.write_str("task was cancelled before it settled"),
    }
  }
}

impl StdError for Error {}


/// Extract a human readable message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send + 'static>) -> String {
  match payload.downcast::<String>() {
    Ok(message) => *message,
    Err(payload) => match payload.downcast_ref::<&'static str>() {
      Some(message) => (*message).to_string(),
      None => "<non-string payload>".to_string(),
    },
  }
}

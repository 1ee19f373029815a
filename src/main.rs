// Copyright (C) 2017-2025 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

//! A program running delayed tasks through a serializer.

use std::process::exit;


fn main() {
  exit(serialtx::run())
}

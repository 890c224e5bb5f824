// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command validation against the build/format allowlist.

mod command;

pub use command::{validate_command, CommandValidationError};

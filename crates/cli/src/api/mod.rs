// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation API client and wire models.

mod client;
mod models;

pub use client::{ApiClient, ApiError};
pub use models::{CreditTracking, FetchOutcome, PromptDetails};

// ABOUTME: Core types and error taxonomy for the SportSync engine
// ABOUTME: Foundation crate with canonical records, credentials, watermarks and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![deny(unsafe_code)]

//! # SportSync Core
//!
//! Foundation crate shared by the provider clients and the sync engine. It
//! changes rarely and has no I/O.
//!
//! ## Modules
//!
//! - **errors**: `SyncError` taxonomy and transport-level `ProviderError`
//! - **models**: canonical `Measurement`, `Activity`, `Credentials`, `Watermarks`
//! - **constants**: provider names, measure type codes, run defaults
//! - **units**: provider unit-exponent conversion

/// Application constants organized by domain
pub mod constants;

/// Sync error taxonomy and provider errors
pub mod errors;

/// Canonical record model
pub mod models;

/// Unit-exponent conversion
pub mod units;

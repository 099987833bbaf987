// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side trip recording.

pub mod client;
pub mod session;

pub use client::TripApiClient;
pub use session::{FlushPolicy, PathSink, RecordingHandle, SessionSnapshot, SessionState};

//! # `legit_core`
//!
//! This is the `legit_core` library!
//! It keeps a single-document editor consistent with a branch of a
//! versioned store that is only reachable through a virtual path namespace.
//!
//! The pieces, leaves first:
//! 1. `diff` computes semantic diffs between two snapshots
//! 2. `history` turns the store's commit list into an enriched, diff-ready list
//! 3. `poller` notices when the branch head moves
//! 4. `checkout` decides what is selected and whether the draft is editable
//! 5. `session` wires them to a store and runs the poll loop
//!
//! The `legit` binary drives a session from the terminal.

#![warn(missing_docs)]

/// Checkout state machine
pub mod checkout;

/// Config docs
pub mod config;

/// Semantic text diff
pub mod diff;

/// Draft buffer
pub mod editor;

/// Error docs
pub mod error;

/// Session events and handlers
pub mod events;

/// History loading and enrichment
pub mod history;

/// Virtual path layout
pub mod paths;

pub mod poller;
pub mod session;
pub mod store;

/// Commit and selection types
pub mod types;

pub use error::{LegitError, Result};
pub use session::{EditorSession, SaveOutcome, SessionSnapshot};

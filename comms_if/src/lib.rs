//! # Communications interface crate.
//!
//! Provides the messages exchanged between the planner, the tracker and the
//! rest of the vehicle, and the network layer which carries them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for every bus topic
pub mod msg;

/// Network module
pub mod net;

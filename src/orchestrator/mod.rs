//! Session orchestration modules.
//!
//! Covers agent process supervision and the session lifecycle controller
//! that sequences provisioning, launch, timing, and teardown.

pub mod lifecycle;
pub mod supervisor;

//! Local viewer: static asset server and browser launch.
//!
//! The viewer page joins the room with its own token and plays the
//! conversation audio. The orchestrator only serves the files and opens the
//! page; it never talks to the page afterwards.

pub mod launch;
pub mod server;

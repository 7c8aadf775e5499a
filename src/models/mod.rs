//! Domain model module declarations.

pub mod agent;
pub mod room;
pub mod session;

//! Request handlers.

pub mod session;

pub use session::{Session, TurnOutcome};

//! Encrypted command channel

mod session;


pub use session::{CommandKind, CommandOutcome, CommandSession, CommandState, CommandStep};

mod controller;
mod state;

pub use controller::{GenerateOutcome, SessionController};
pub use state::{SessionSnapshot, SessionState, SlotSummary};

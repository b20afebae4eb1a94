// ==============
// crates/client-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_INBOUND: &str = "session.inbound";
pub const SESSION_MOVES_SENT: &str = "session.moves_sent";
pub const SESSION_NUMBERS_SENT: &str = "session.numbers_sent";
pub const SESSION_REJECTED_INPUT: &str = "session.rejected_input";
pub const SESSION_DELAYED_CANCELLED: &str = "session.delayed_cancelled";
pub const SESSION_ROUNDS_FINISHED: &str = "session.rounds_finished";

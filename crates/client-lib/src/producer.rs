// ============================
// gameofthree-client/src/producer.rs
// ============================
//! Move and opening-number production.
use std::ops::RangeInclusive;

use gameofthree_common::OutboundMessage;
use rand::Rng;

use crate::display::DisplayEmitter;
use crate::error::ClientError;
use crate::policy::{adjustment_for, is_valid_move, DIVISOR};

/// Range of automatically generated opening numbers
pub const STARTING_NUMBER_RANGE: RangeInclusive<i64> = 1..=100;

/// Where the adjustment of a move comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    /// Computed by [`adjustment_for`]
    Automatic,
    /// Typed by the player, still to be validated
    Manual(i64),
}

/// A validated move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub value: i64,
    pub adjustment: i64,
}

impl Move {
    /// Value after the adjustment, before dividing
    pub fn adjusted(&self) -> i64 {
        self.value + self.adjustment
    }

    pub fn quotient(&self) -> i64 {
        self.adjusted() / DIVISOR
    }

    pub fn message(&self) -> OutboundMessage {
        OutboundMessage::MoveSubmission {
            value: self.value,
            adjustment: self.adjustment,
        }
    }

    /// Report the move in the game history
    pub fn announce(&self, display: &DisplayEmitter) {
        display.message(format!(
            "You added {} to {} to make it divisible by {DIVISOR}",
            self.adjustment, self.value
        ));
        display.message(format!(
            "{} divided by {DIVISOR} = {}",
            self.adjusted(),
            self.quotient()
        ));
    }
}

/// Build the move for `value`
pub fn produce_move(value: i64, source: MoveSource) -> Result<Move, ClientError> {
    let adjustment = match source {
        MoveSource::Automatic => adjustment_for(value),
        MoveSource::Manual(adjustment) => adjustment,
    };
    // also rejects the automatic move at the very bottom of the i64 range
    if !is_valid_move(value, adjustment) {
        return Err(ClientError::InvalidMove { value, adjustment });
    }
    Ok(Move { value, adjustment })
}

/// Uniformly drawn opening number
pub fn random_starting_number<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.random_range(STARTING_NUMBER_RANGE)
}

/// Largest value the server accepts in an instruction (a 32-bit int)
pub const MAX_SERVER_VALUE: i64 = i32::MAX as i64;

/// Parse an opening number typed by the player
pub fn parse_starting_number(input: &str) -> Result<i64, ClientError> {
    match input.trim().parse::<i64>() {
        Ok(n) if (1..=MAX_SERVER_VALUE).contains(&n) => Ok(n),
        _ => Err(ClientError::InvalidStartingNumber(input.trim().to_string())),
    }
}

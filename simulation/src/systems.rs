//! Creature systems - behaviour driven by listeners and scheduled tasks

pub mod breeding;
pub mod taming;
pub mod targeting;

pub use breeding::{break_pair, evaluate_pair, toggle_leash, LeashOutcome, PairId};
pub use taming::{recall, register_hit};
pub use targeting::{command_placed, marked_target};

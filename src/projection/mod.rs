//! Versioned projection of game state.
//!
//! The [`Projector`] turns decoded events into entity rows and writes them to
//! the [`ProjectionStore`], which keeps every version of a row tagged with the
//! block range it was valid for. Rolling back to a block drops the versions
//! written after it.

pub mod entities;
pub mod projector;
pub mod store;

pub use entities::{
    Adventurer, Battle, Beast, BidFields, Collection, Discovery, Entity, Heist, Item, ItemFields,
    Listing, Value,
};
pub use projector::{ApplyOutcome, EventContext, Projector};
pub use store::{ProjectionStore, RollbackSummary, Validity, Version};

//! Event decoding for the game contracts.
//!
//! - [`kinds`]: the closed set of event kinds, their selectors and layouts
//! - [`records`]: named records produced by decoding
//! - [`decoder`]: pure positional decoding of felt payloads
//!
//! ```rust,ignore
//! use survivor_indexer::events::{decode, EventKind};
//!
//! let event = decode(EventKind::UpdateGold, &payload)?;
//! assert_eq!(event.kind(), EventKind::UpdateGold);
//! ```

pub mod decoder;
pub mod kinds;
pub mod records;

pub use decoder::{decode, decode_by_selector};
pub use kinds::{starknet_keccak, ContractRole, EventKind};
pub use records::*;

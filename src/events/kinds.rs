//! The closed set of game event kinds.

use std::sync::OnceLock;

use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};

use crate::core::config::ContractAddresses;
use crate::core::felt::Felt;

/// Contract that emits a given event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractRole {
    /// Adventurer contract
    Adventurer,
    /// Beast contract
    Beast,
    /// Loot and market contract
    Loot,
}

impl ContractRole {
    /// Address of this contract in a deployment
    pub fn address(&self, contracts: &ContractAddresses) -> Felt {
        match self {
            ContractRole::Adventurer => contracts.adventurer,
            ContractRole::Beast => contracts.beast,
            ContractRole::Loot => contracts.loot,
        }
    }
}

/// Event kinds understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// A new adventurer token was minted
    MintAdventurer,
    /// Full adventurer state snapshot
    UpdateAdventurerState,
    /// An adventurer explored and found something
    Discovery,
    /// A thief started or updated a heist
    UpdateThiefState,
    /// A beast was spawned for an adventurer
    CreateBeast,
    /// Full beast state snapshot
    UpdateBeastState,
    /// An adventurer hit a beast
    BeastAttacked,
    /// A beast hit an adventurer
    AdventurerAttacked,
    /// Adventurer gold balance changed
    UpdateGold,
    /// Full item state snapshot
    UpdateItemState,
    /// A market item was claimed by its winning bidder
    ClaimItem,
    /// Market listing and bid update
    ItemMerchantUpdate,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [EventKind; 12] = [
        EventKind::MintAdventurer,
        EventKind::UpdateAdventurerState,
        EventKind::Discovery,
        EventKind::UpdateThiefState,
        EventKind::CreateBeast,
        EventKind::UpdateBeastState,
        EventKind::BeastAttacked,
        EventKind::AdventurerAttacked,
        EventKind::UpdateGold,
        EventKind::UpdateItemState,
        EventKind::ClaimItem,
        EventKind::ItemMerchantUpdate,
    ];

    /// Event name as declared by the contract
    pub fn name(&self) -> &'static str {
        match self {
            Self::MintAdventurer => "MintAdventurer",
            Self::UpdateAdventurerState => "UpdateAdventurerState",
            Self::Discovery => "Discovery",
            Self::UpdateThiefState => "UpdateThiefState",
            Self::CreateBeast => "CreateBeast",
            Self::UpdateBeastState => "UpdateBeastState",
            Self::BeastAttacked => "BeastAttacked",
            Self::AdventurerAttacked => "AdventurerAttacked",
            Self::UpdateGold => "UpdateGold",
            Self::UpdateItemState => "UpdateItemState",
            Self::ClaimItem => "ClaimItem",
            Self::ItemMerchantUpdate => "ItemMerchantUpdate",
        }
    }

    /// Contract expected to emit this kind
    pub fn role(&self) -> ContractRole {
        match self {
            Self::MintAdventurer
            | Self::UpdateAdventurerState
            | Self::Discovery
            | Self::UpdateThiefState
            | Self::UpdateGold => ContractRole::Adventurer,
            Self::CreateBeast
            | Self::UpdateBeastState
            | Self::BeastAttacked
            | Self::AdventurerAttacked => ContractRole::Beast,
            Self::UpdateItemState | Self::ClaimItem | Self::ItemMerchantUpdate => {
                ContractRole::Loot
            }
        }
    }

    /// Number of felts in the event payload
    pub fn arity(&self) -> usize {
        use crate::events::records::{ADVENTURER_STATE_LEN, BEAST_STATE_LEN, BID_LEN, ITEM_STATE_LEN};

        match self {
            Self::MintAdventurer => 2,
            Self::UpdateAdventurerState => 1 + ADVENTURER_STATE_LEN,
            Self::Discovery => 5,
            Self::UpdateThiefState => 3,
            Self::CreateBeast | Self::UpdateBeastState => 1 + BEAST_STATE_LEN,
            Self::BeastAttacked | Self::AdventurerAttacked => 3,
            Self::UpdateGold => 2,
            Self::UpdateItemState => 2 + ITEM_STATE_LEN,
            Self::ClaimItem => 4,
            Self::ItemMerchantUpdate => 1 + ITEM_STATE_LEN + BID_LEN,
        }
    }

    /// Whether a second event on the same key is an integrity violation
    pub fn is_insert_only(&self) -> bool {
        matches!(self, Self::MintAdventurer | Self::CreateBeast | Self::Discovery)
    }

    /// Event selector: keccak256 of the name, truncated to 250 bits
    pub fn selector(&self) -> Felt {
        starknet_keccak(self.name().as_bytes())
    }

    /// Resolve a selector back to its kind
    pub fn from_selector(selector: &Felt) -> Option<EventKind> {
        selector_table()
            .iter()
            .find(|(known, _)| known == selector)
            .map(|(_, kind)| *kind)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn selector_table() -> &'static [(Felt, EventKind); 12] {
    static TABLE: OnceLock<[(Felt, EventKind); 12]> = OnceLock::new();
    TABLE.get_or_init(|| EventKind::ALL.map(|kind| (kind.selector(), kind)))
}

/// keccak256 masked to the low 250 bits
pub fn starknet_keccak(data: &[u8]) -> Felt {
    let mut bytes = keccak256(data).0;
    bytes[0] &= 0x03;
    Felt::from_bytes_be(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_selectors_are_distinct_field_elements() {
        let selectors: HashSet<Felt> = EventKind::ALL.iter().map(|k| k.selector()).collect();
        assert_eq!(selectors.len(), EventKind::ALL.len());
        for selector in &selectors {
            assert!(selector.is_field_element());
            assert!(selector.as_bytes()[0] <= 0x03);
        }
    }

    #[test]
    fn test_from_selector() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_selector(&kind.selector()), Some(kind));
        }
        assert_eq!(EventKind::from_selector(&Felt::from_u64(42)), None);

        let table = selector_table();
        assert!(std::ptr::eq(table, selector_table()));
        assert_eq!(table.len(), EventKind::ALL.len());
        for (selector, kind) in table {
            assert_eq!(*selector, kind.selector());
        }
    }

    #[test]
    fn test_starknet_keccak_known_value() {
        // Selector of `transfer`, as published in every Starknet ERC20 ABI
        let expected =
            Felt::from_hex("0x83afd3f4caedc6eebf44246fe54e38c95e3179a5ec9ea81740eca5b482d12e")
                .unwrap();
        assert_eq!(starknet_keccak(b"transfer"), expected);
    }

    #[test]
    fn test_roles_and_arity() {
        assert_eq!(EventKind::UpdateGold.role(), ContractRole::Adventurer);
        assert_eq!(EventKind::AdventurerAttacked.role(), ContractRole::Beast);
        assert_eq!(EventKind::ClaimItem.role(), ContractRole::Loot);

        assert_eq!(EventKind::UpdateAdventurerState.arity(), 29);
        assert_eq!(EventKind::UpdateBeastState.arity(), 12);
        assert_eq!(EventKind::UpdateItemState.arity(), 15);
        assert_eq!(EventKind::ItemMerchantUpdate.arity(), 18);
    }

    #[test]
    fn test_insert_only_kinds() {
        let insert_only: Vec<_> =
            EventKind::ALL.into_iter().filter(|k| k.is_insert_only()).collect();
        assert_eq!(
            insert_only,
            vec![EventKind::MintAdventurer, EventKind::Discovery, EventKind::CreateBeast]
        );
    }
}

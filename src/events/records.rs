//! Decoded event records.
//!
//! Each record is the named form of one fixed positional payload. Fields that
//! the contracts set to zero to mean "nothing here" are `Option`; counters and
//! amounts are always present.

use serde::{Deserialize, Serialize};

use crate::core::felt::Felt;
use crate::events::kinds::EventKind;

/// Felts in an adventurer state block
pub const ADVENTURER_STATE_LEN: usize = 28;
/// Felts in a beast state block
pub const BEAST_STATE_LEN: usize = 11;
/// Felts in an item state block
pub const ITEM_STATE_LEN: usize = 13;
/// Felts in a bid block
pub const BID_LEN: usize = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// NESTED STATE BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Adventurer state block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdventurerState {
    /// Race code
    pub race: Option<Felt>,
    /// Home realm id
    pub home_realm: Option<Felt>,
    /// Birth timestamp, unix seconds
    pub birthdate: Option<Felt>,
    /// Display name
    pub name: Option<String>,
    /// Order code
    pub order: Option<Felt>,
    /// First half of the image hash
    pub image_hash_1: Option<String>,
    /// Second half of the image hash
    pub image_hash_2: Option<String>,
    /// Health points
    pub health: Felt,
    /// Level
    pub level: Felt,
    /// Strength
    pub strength: Felt,
    /// Dexterity
    pub dexterity: Felt,
    /// Vitality
    pub vitality: Felt,
    /// Intelligence
    pub intelligence: Felt,
    /// Wisdom
    pub wisdom: Felt,
    /// Charisma
    pub charisma: Felt,
    /// Luck
    pub luck: Felt,
    /// Experience
    pub xp: Felt,
    /// Equipped weapon item id
    pub weapon_id: Option<Felt>,
    /// Equipped chest item id
    pub chest_id: Option<Felt>,
    /// Equipped head item id
    pub head_id: Option<Felt>,
    /// Equipped waist item id
    pub waist_id: Option<Felt>,
    /// Equipped feet item id
    pub feet_id: Option<Felt>,
    /// Equipped hands item id
    pub hands_id: Option<Felt>,
    /// Equipped neck item id
    pub neck_id: Option<Felt>,
    /// Equipped ring item id
    pub ring_id: Option<Felt>,
    /// Status code
    pub status: Option<Felt>,
    /// Beast currently being fought
    pub beast: Option<Felt>,
    /// Whether a stat upgrade is pending
    pub upgrading: bool,
}

/// Beast state block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeastState {
    /// Beast kind code
    pub beast_type: Option<Felt>,
    /// Attack type code
    pub attack_type: Felt,
    /// Armor type code
    pub armor_type: Felt,
    /// Rank
    pub rank: Option<Felt>,
    /// First name prefix
    pub prefix_1: Option<Felt>,
    /// Second name prefix
    pub prefix_2: Option<Felt>,
    /// Adventurer the beast is bound to
    pub adventurer_id: Option<Felt>,
    /// Experience
    pub xp: Felt,
    /// Level
    pub level: Felt,
    /// Health points
    pub health: Felt,
    /// Slain timestamp, unix seconds; absent while alive
    pub slain_on: Option<Felt>,
}

/// Item state block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemState {
    /// Item kind code
    pub item_type: Option<Felt>,
    /// Equipment slot
    pub slot: Option<Felt>,
    /// Class (attack or armor) type code
    pub class_type: Felt,
    /// Material code
    pub material: Felt,
    /// Rank
    pub rank: Option<Felt>,
    /// First name prefix
    pub prefix_1: Option<Felt>,
    /// Second name prefix
    pub prefix_2: Option<Felt>,
    /// Name suffix
    pub suffix: Option<Felt>,
    /// Greatness
    pub greatness: Option<Felt>,
    /// Block the item was created in
    pub created_block: Option<Felt>,
    /// Experience
    pub xp: Felt,
    /// Owning adventurer
    pub adventurer_id: Option<Felt>,
    /// Bag holding the item
    pub bag_id: Option<Felt>,
}

/// Market bid block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bid {
    /// Bid price
    pub price: Option<Felt>,
    /// Bid expiry, unix seconds
    pub expiry: Option<Felt>,
    /// Bidding adventurer
    pub bidder: Option<Felt>,
    /// Bid status code
    pub status: Option<Felt>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// `MintAdventurer` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAdventurer {
    /// New adventurer id
    pub adventurer_id: Felt,
    /// Owning account
    pub owner: Felt,
}

/// `UpdateAdventurerState` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAdventurerState {
    /// Adventurer id
    pub adventurer_id: Felt,
    /// New state
    pub state: AdventurerState,
}

/// `Discovery` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// Exploring adventurer
    pub adventurer_id: Felt,
    /// Discovery category code
    pub discovery_type: Felt,
    /// Category-specific sub type code
    pub sub_discovery_type: Felt,
    /// Entity revealed by the discovery
    pub entity_id: Option<Felt>,
    /// Amount gained or lost
    pub output_amount: Felt,
}

/// `UpdateThiefState` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateThiefState {
    /// Thief adventurer id
    pub thief_id: Felt,
    /// Heist start timestamp, unix seconds
    pub start_time: Option<Felt>,
    /// Gold carried
    pub gold: Felt,
}

/// `CreateBeast` and `UpdateBeastState` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeastUpdate {
    /// Beast id
    pub beast_id: Felt,
    /// New state
    pub state: BeastState,
}

/// `BeastAttacked` and `AdventurerAttacked` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Beast in the fight
    pub beast_id: Felt,
    /// Adventurer in the fight
    pub adventurer_id: Felt,
    /// Damage dealt
    pub damage: Felt,
}

/// `UpdateGold` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGold {
    /// Adventurer id
    pub adventurer_id: Felt,
    /// New balance
    pub balance: Felt,
}

/// `UpdateItemState` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemState {
    /// Item id
    pub item_id: Felt,
    /// Listing the item came from
    pub market_item_id: Option<Felt>,
    /// New state
    pub state: ItemState,
}

/// `ClaimItem` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItem {
    /// Listing id
    pub market_item_id: Felt,
    /// Item minted for the claim
    pub item_id: Option<Felt>,
    /// Claiming adventurer
    pub adventurer_id: Option<Felt>,
    /// Claiming account
    pub owner: Option<Felt>,
}

/// `ItemMerchantUpdate` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMerchantUpdate {
    /// Listing id
    pub market_item_id: Felt,
    /// Listed item
    pub item: ItemState,
    /// Current bid
    pub bid: Bid,
}

/// A decoded event, one variant per [`EventKind`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedEvent {
    /// See [`EventKind::MintAdventurer`]
    MintAdventurer(MintAdventurer),
    /// See [`EventKind::UpdateAdventurerState`]
    UpdateAdventurerState(UpdateAdventurerState),
    /// See [`EventKind::Discovery`]
    Discovery(Discovery),
    /// See [`EventKind::UpdateThiefState`]
    UpdateThiefState(UpdateThiefState),
    /// See [`EventKind::CreateBeast`]
    CreateBeast(BeastUpdate),
    /// See [`EventKind::UpdateBeastState`]
    UpdateBeastState(BeastUpdate),
    /// See [`EventKind::BeastAttacked`]
    BeastAttacked(Attack),
    /// See [`EventKind::AdventurerAttacked`]
    AdventurerAttacked(Attack),
    /// See [`EventKind::UpdateGold`]
    UpdateGold(UpdateGold),
    /// See [`EventKind::UpdateItemState`]
    UpdateItemState(UpdateItemState),
    /// See [`EventKind::ClaimItem`]
    ClaimItem(ClaimItem),
    /// See [`EventKind::ItemMerchantUpdate`]
    ItemMerchantUpdate(ItemMerchantUpdate),
}

impl DecodedEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MintAdventurer(_) => EventKind::MintAdventurer,
            Self::UpdateAdventurerState(_) => EventKind::UpdateAdventurerState,
            Self::Discovery(_) => EventKind::Discovery,
            Self::UpdateThiefState(_) => EventKind::UpdateThiefState,
            Self::CreateBeast(_) => EventKind::CreateBeast,
            Self::UpdateBeastState(_) => EventKind::UpdateBeastState,
            Self::BeastAttacked(_) => EventKind::BeastAttacked,
            Self::AdventurerAttacked(_) => EventKind::AdventurerAttacked,
            Self::UpdateGold(_) => EventKind::UpdateGold,
            Self::UpdateItemState(_) => EventKind::UpdateItemState,
            Self::ClaimItem(_) => EventKind::ClaimItem,
            Self::ItemMerchantUpdate(_) => EventKind::ItemMerchantUpdate,
        }
    }
}

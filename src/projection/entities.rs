//! Projected entity rows.
//!
//! Rows are what the projector writes and the query executor reads. Every
//! non-key field is optional so that an update arriving before the creating
//! event still yields a row. Field access by dotted path goes through
//! [`Entity::field`], which is the only coupling between rows and queries.

use std::cmp::Ordering;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::core::felt::Felt;
use crate::storage::backend::prefixes;

// ═══════════════════════════════════════════════════════════════════════════════
// VALUES
// ═══════════════════════════════════════════════════════════════════════════════

/// A comparable field value.
///
/// Felts compare by their big-endian bytes, which equals numeric order. Text
/// is a packed short string and compares the way its field element does:
/// shorter strings first, then byte by byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Integer, id or enumeration code
    Felt(Felt),
    /// Decoded short string
    Text(String),
    /// Unix timestamp in seconds
    Time(i64),
    /// Flag
    Bool(bool),
}

impl Value {
    /// Whether two values can be ordered against each other
    pub fn same_kind(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Timestamp value from unix seconds
    pub fn time(seconds: u64) -> Option<Value> {
        i64::try_from(seconds).ok().map(Value::Time)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Felt(_) => 0,
            Value::Text(_) => 1,
            Value::Time(_) => 2,
            Value::Bool(_) => 3,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Felt(a), Value::Felt(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn felt(v: &Option<Felt>) -> Option<Value> {
    v.map(Value::Felt)
}

fn text(v: &Option<String>) -> Option<Value> {
    v.clone().map(Value::Text)
}

fn felt_time(v: &Option<Felt>) -> Option<Value> {
    v.as_ref()
        .and_then(|f| f.to_u64().ok())
        .and_then(Value::time)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Projection collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Adventurers
    Adventurers,
    /// Beasts
    Beasts,
    /// Items
    Items,
    /// Market listings
    Tokens,
    /// Discovery log
    Discoveries,
    /// Battles
    Battles,
    /// Heists
    Heists,
}

impl Collection {
    /// Every collection
    pub const ALL: [Collection; 7] = [
        Collection::Adventurers,
        Collection::Beasts,
        Collection::Items,
        Collection::Tokens,
        Collection::Discoveries,
        Collection::Battles,
        Collection::Heists,
    ];

    /// Collection name
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Adventurers => "adventurers",
            Collection::Beasts => "beasts",
            Collection::Items => "items",
            Collection::Tokens => "tokens",
            Collection::Discoveries => "discoveries",
            Collection::Battles => "battles",
            Collection::Heists => "heists",
        }
    }

    /// Key prefix in the backend
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            Collection::Adventurers => prefixes::ADVENTURERS,
            Collection::Beasts => prefixes::BEASTS,
            Collection::Items => prefixes::ITEMS,
            Collection::Tokens => prefixes::TOKENS,
            Collection::Discoveries => prefixes::DISCOVERIES,
            Collection::Battles => prefixes::BATTLES,
            Collection::Heists => prefixes::HEISTS,
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A row type stored in one collection
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection the rows live in
    const COLLECTION: Collection;

    /// Field paths accepted by filters and sort specifications
    const FIELDS: &'static [&'static str];

    /// Natural key bytes, without the collection prefix
    fn key(&self) -> Vec<u8>;

    /// Value at a dotted path; `None` for null or unknown paths
    fn field(&self, path: &str) -> Option<Value>;

    /// Timestamp of the last write, unix seconds
    fn last_updated(&self) -> u64;

    /// Refresh the last-write timestamp
    fn touch(&mut self, timestamp: u64);

    /// Whether a path names a field of this entity
    fn has_field(path: &str) -> bool {
        Self::FIELDS.contains(&path)
    }
}

/// Concatenated key of several felts
pub fn compound_key(parts: &[&Felt]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.len() * 32);
    for part in parts {
        key.extend_from_slice(part.as_bytes());
    }
    key
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADVENTURER
// ═══════════════════════════════════════════════════════════════════════════════

/// Adventurer row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Adventurer {
    pub id: Felt,
    pub owner: Option<Felt>,
    pub race: Option<Felt>,
    pub home_realm: Option<Felt>,
    pub birthdate: Option<Felt>,
    pub name: Option<String>,
    pub order: Option<Felt>,
    pub image_hash_1: Option<String>,
    pub image_hash_2: Option<String>,
    pub health: Option<Felt>,
    pub level: Option<Felt>,
    pub strength: Option<Felt>,
    pub dexterity: Option<Felt>,
    pub vitality: Option<Felt>,
    pub intelligence: Option<Felt>,
    pub wisdom: Option<Felt>,
    pub charisma: Option<Felt>,
    pub luck: Option<Felt>,
    pub xp: Option<Felt>,
    pub weapon_id: Option<Felt>,
    pub chest_id: Option<Felt>,
    pub head_id: Option<Felt>,
    pub waist_id: Option<Felt>,
    pub feet_id: Option<Felt>,
    pub hands_id: Option<Felt>,
    pub neck_id: Option<Felt>,
    pub ring_id: Option<Felt>,
    pub status: Option<Felt>,
    pub beast: Option<Felt>,
    pub upgrading: Option<bool>,
    pub gold: Option<Felt>,
    pub last_updated: u64,
}

impl Adventurer {
    /// Empty row for an id
    pub fn new(id: Felt) -> Self {
        Self {
            id,
            owner: None,
            race: None,
            home_realm: None,
            birthdate: None,
            name: None,
            order: None,
            image_hash_1: None,
            image_hash_2: None,
            health: None,
            level: None,
            strength: None,
            dexterity: None,
            vitality: None,
            intelligence: None,
            wisdom: None,
            charisma: None,
            luck: None,
            xp: None,
            weapon_id: None,
            chest_id: None,
            head_id: None,
            waist_id: None,
            feet_id: None,
            hands_id: None,
            neck_id: None,
            ring_id: None,
            status: None,
            beast: None,
            upgrading: None,
            gold: None,
            last_updated: 0,
        }
    }
}

impl Entity for Adventurer {
    const COLLECTION: Collection = Collection::Adventurers;
    const FIELDS: &'static [&'static str] = &[
        "id", "owner", "race", "homeRealm", "birthdate", "name", "order", "imageHash1",
        "imageHash2", "health", "level", "strength", "dexterity", "vitality", "intelligence",
        "wisdom", "charisma", "luck", "xp", "weaponId", "chestId", "headId", "waistId",
        "feetId", "handsId", "neckId", "ringId", "status", "beast", "upgrading", "gold",
        "lastUpdated",
    ];

    fn key(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(Value::Felt(self.id)),
            "owner" => felt(&self.owner),
            "race" => felt(&self.race),
            "homeRealm" => felt(&self.home_realm),
            "birthdate" => felt_time(&self.birthdate),
            "name" => text(&self.name),
            "order" => felt(&self.order),
            "imageHash1" => text(&self.image_hash_1),
            "imageHash2" => text(&self.image_hash_2),
            "health" => felt(&self.health),
            "level" => felt(&self.level),
            "strength" => felt(&self.strength),
            "dexterity" => felt(&self.dexterity),
            "vitality" => felt(&self.vitality),
            "intelligence" => felt(&self.intelligence),
            "wisdom" => felt(&self.wisdom),
            "charisma" => felt(&self.charisma),
            "luck" => felt(&self.luck),
            "xp" => felt(&self.xp),
            "weaponId" => felt(&self.weapon_id),
            "chestId" => felt(&self.chest_id),
            "headId" => felt(&self.head_id),
            "waistId" => felt(&self.waist_id),
            "feetId" => felt(&self.feet_id),
            "handsId" => felt(&self.hands_id),
            "neckId" => felt(&self.neck_id),
            "ringId" => felt(&self.ring_id),
            "status" => felt(&self.status),
            "beast" => felt(&self.beast),
            "upgrading" => self.upgrading.map(Value::Bool),
            "gold" => felt(&self.gold),
            "lastUpdated" => Value::time(self.last_updated),
            _ => None,
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEAST
// ═══════════════════════════════════════════════════════════════════════════════

/// Beast row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Beast {
    pub id: Felt,
    pub adventurer_id: Option<Felt>,
    pub beast_type: Option<Felt>,
    pub attack_type: Option<Felt>,
    pub armor_type: Option<Felt>,
    pub rank: Option<Felt>,
    pub prefix_1: Option<Felt>,
    pub prefix_2: Option<Felt>,
    pub health: Option<Felt>,
    pub xp: Option<Felt>,
    pub level: Option<Felt>,
    /// Absent while the beast is alive
    pub slain_on: Option<Felt>,
    /// Block timestamp of the creating event
    pub created_at: Option<u64>,
    pub last_updated: u64,
}

impl Beast {
    /// Empty row for an id
    pub fn new(id: Felt) -> Self {
        Self {
            id,
            adventurer_id: None,
            beast_type: None,
            attack_type: None,
            armor_type: None,
            rank: None,
            prefix_1: None,
            prefix_2: None,
            health: None,
            xp: None,
            level: None,
            slain_on: None,
            created_at: None,
            last_updated: 0,
        }
    }
}

impl Entity for Beast {
    const COLLECTION: Collection = Collection::Beasts;
    const FIELDS: &'static [&'static str] = &[
        "id", "adventurerId", "beastType", "attackType", "armorType", "rank", "prefix1",
        "prefix2", "health", "xp", "level", "slainOnDate", "createdDate", "lastUpdated",
    ];

    fn key(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(Value::Felt(self.id)),
            "adventurerId" => felt(&self.adventurer_id),
            "beastType" => felt(&self.beast_type),
            "attackType" => felt(&self.attack_type),
            "armorType" => felt(&self.armor_type),
            "rank" => felt(&self.rank),
            "prefix1" => felt(&self.prefix_1),
            "prefix2" => felt(&self.prefix_2),
            "health" => felt(&self.health),
            "xp" => felt(&self.xp),
            "level" => felt(&self.level),
            "slainOnDate" => felt_time(&self.slain_on),
            "createdDate" => self.created_at.and_then(Value::time),
            "lastUpdated" => Value::time(self.last_updated),
            _ => None,
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ITEMS AND LISTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Item attributes, shared by item rows and market listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ItemFields {
    pub item_type: Option<Felt>,
    pub slot: Option<Felt>,
    pub class_type: Option<Felt>,
    pub material: Option<Felt>,
    pub rank: Option<Felt>,
    pub prefix_1: Option<Felt>,
    pub prefix_2: Option<Felt>,
    pub suffix: Option<Felt>,
    pub greatness: Option<Felt>,
    pub created_block: Option<Felt>,
    pub xp: Option<Felt>,
    pub adventurer_id: Option<Felt>,
    pub bag_id: Option<Felt>,
}

impl ItemFields {
    /// Field names, relative to wherever the attributes are nested
    pub const FIELDS: &'static [&'static str] = &[
        "type", "slot", "classType", "material", "rank", "prefix1", "prefix2", "suffix",
        "greatness", "createdBlock", "xp", "adventurerId", "bag",
    ];

    /// Value of a relative field
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "type" => felt(&self.item_type),
            "slot" => felt(&self.slot),
            "classType" => felt(&self.class_type),
            "material" => felt(&self.material),
            "rank" => felt(&self.rank),
            "prefix1" => felt(&self.prefix_1),
            "prefix2" => felt(&self.prefix_2),
            "suffix" => felt(&self.suffix),
            "greatness" => felt(&self.greatness),
            "createdBlock" => felt(&self.created_block),
            "xp" => felt(&self.xp),
            "adventurerId" => felt(&self.adventurer_id),
            "bag" => felt(&self.bag_id),
            _ => None,
        }
    }
}

/// Market bid attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct BidFields {
    pub price: Option<Felt>,
    pub expiry: Option<Felt>,
    pub bidder: Option<Felt>,
    pub status: Option<Felt>,
}

impl BidFields {
    /// Field names, relative to the `bid` node
    pub const FIELDS: &'static [&'static str] = &["price", "expiry", "bidder", "status"];

    /// Value of a relative field
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "price" => felt(&self.price),
            "expiry" => felt_time(&self.expiry),
            "bidder" => felt(&self.bidder),
            "status" => felt(&self.status),
            _ => None,
        }
    }
}

/// Item row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Item {
    pub id: Felt,
    pub market_item_id: Option<Felt>,
    pub fields: ItemFields,
    pub last_updated: u64,
}

impl Item {
    /// Empty row for an id
    pub fn new(id: Felt) -> Self {
        Self {
            id,
            market_item_id: None,
            fields: ItemFields::default(),
            last_updated: 0,
        }
    }
}

impl Entity for Item {
    const COLLECTION: Collection = Collection::Items;
    const FIELDS: &'static [&'static str] = &[
        "id", "marketId", "type", "slot", "classType", "material", "rank", "prefix1",
        "prefix2", "suffix", "greatness", "createdBlock", "xp", "adventurerId", "bag",
        "lastUpdated",
    ];

    fn key(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "id" => Some(Value::Felt(self.id)),
            "marketId" => felt(&self.market_item_id),
            "lastUpdated" => Value::time(self.last_updated),
            other => self.fields.field(other),
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

/// Market listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Listing {
    pub market_id: Felt,
    /// Item minted when the listing was claimed
    pub item_id: Option<Felt>,
    pub item: ItemFields,
    pub bid: BidFields,
    /// Adventurer that claimed the listing
    pub claimed_by: Option<Felt>,
    pub owner: Option<Felt>,
    pub claimed_time: Option<u64>,
    pub last_updated: u64,
}

impl Listing {
    /// Empty row for a market id
    pub fn new(market_id: Felt) -> Self {
        Self {
            market_id,
            item_id: None,
            item: ItemFields::default(),
            bid: BidFields::default(),
            claimed_by: None,
            owner: None,
            claimed_time: None,
            last_updated: 0,
        }
    }
}

impl Entity for Listing {
    const COLLECTION: Collection = Collection::Tokens;
    const FIELDS: &'static [&'static str] = &[
        "marketId", "itemId", "claimedBy", "owner", "claimedTime", "lastUpdated",
        "item.type", "item.slot", "item.classType", "item.material", "item.rank",
        "item.prefix1", "item.prefix2", "item.suffix", "item.greatness", "item.createdBlock",
        "item.xp", "item.adventurerId", "item.bag", "bid.price", "bid.expiry", "bid.bidder",
        "bid.status",
    ];

    fn key(&self) -> Vec<u8> {
        self.market_id.as_bytes().to_vec()
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            Some(("item", rest)) => self.item.field(rest),
            Some(("bid", rest)) => self.bid.field(rest),
            Some(_) => None,
            None => match path {
                "marketId" => Some(Value::Felt(self.market_id)),
                "itemId" => felt(&self.item_id),
                "claimedBy" => felt(&self.claimed_by),
                "owner" => felt(&self.owner),
                "claimedTime" => self.claimed_time.and_then(Value::time),
                "lastUpdated" => Value::time(self.last_updated),
                _ => None,
            },
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Discovery row; written once, never updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Discovery {
    pub block_number: u64,
    pub event_index: u32,
    pub adventurer_id: Felt,
    pub discovery_type: Felt,
    pub sub_discovery_type: Felt,
    pub entity_id: Option<Felt>,
    pub output_amount: Felt,
    pub discovery_time: u64,
    pub tx_hash: Felt,
}

impl Discovery {
    /// Key of the discovery emitted at a block position
    pub fn key_for(block_number: u64, event_index: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(12);
        key.extend_from_slice(&block_number.to_be_bytes());
        key.extend_from_slice(&event_index.to_be_bytes());
        key
    }
}

impl Entity for Discovery {
    const COLLECTION: Collection = Collection::Discoveries;
    const FIELDS: &'static [&'static str] = &[
        "adventurerId", "discoveryType", "subDiscoveryType", "entityId", "outputAmount",
        "discoveryTime", "txHash", "lastUpdated",
    ];

    fn key(&self) -> Vec<u8> {
        Self::key_for(self.block_number, self.event_index)
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "adventurerId" => Some(Value::Felt(self.adventurer_id)),
            "discoveryType" => Some(Value::Felt(self.discovery_type)),
            "subDiscoveryType" => Some(Value::Felt(self.sub_discovery_type)),
            "entityId" => felt(&self.entity_id),
            "outputAmount" => Some(Value::Felt(self.output_amount)),
            "discoveryTime" | "lastUpdated" => Value::time(self.discovery_time),
            "txHash" => Some(Value::Felt(self.tx_hash)),
            _ => None,
        }
    }

    fn last_updated(&self) -> u64 {
        self.discovery_time
    }

    fn touch(&mut self, _timestamp: u64) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATTLES AND HEISTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Battle row, one per beast and adventurer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Battle {
    pub beast_id: Felt,
    pub adventurer_id: Felt,
    /// Damage of the most recent attack
    pub damage: Option<Felt>,
    pub last_updated: u64,
}

impl Entity for Battle {
    const COLLECTION: Collection = Collection::Battles;
    const FIELDS: &'static [&'static str] = &["beastId", "adventurerId", "damage", "lastUpdated"];

    fn key(&self) -> Vec<u8> {
        compound_key(&[&self.beast_id, &self.adventurer_id])
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "beastId" => Some(Value::Felt(self.beast_id)),
            "adventurerId" => Some(Value::Felt(self.adventurer_id)),
            "damage" => felt(&self.damage),
            "lastUpdated" => Value::time(self.last_updated),
            _ => None,
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

/// Heist row, keyed by the thief
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Heist {
    pub thief_id: Felt,
    pub start_time: Option<Felt>,
    pub gold: Option<Felt>,
    pub last_updated: u64,
}

impl Entity for Heist {
    const COLLECTION: Collection = Collection::Heists;
    const FIELDS: &'static [&'static str] = &["thiefId", "startTime", "gold", "lastUpdated"];

    fn key(&self) -> Vec<u8> {
        self.thief_id.as_bytes().to_vec()
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            "thiefId" => Some(Value::Felt(self.thief_id)),
            "startTime" => felt_time(&self.start_time),
            "gold" => felt(&self.gold),
            "lastUpdated" => Value::time(self.last_updated),
            _ => None,
        }
    }

    fn last_updated(&self) -> u64 {
        self.last_updated
    }

    fn touch(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }
}

//! Filter input trees.
//!
//! One node type per entity, whose fields mirror the entity's queryable
//! fields. Leaves are small predicate records. Every node rejects unknown
//! fields at deserialization, so a misspelt path never reaches the store.
//!
//! Nodes do not interpret themselves: [`FilterNode::accept`] walks the
//! present fields and hands each one to a [`FilterVisitor`] together with its
//! name and, for label leaves, the enumeration table that resolves it.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};

use crate::core::felt::Felt;
use crate::core::tables::TableId;
use crate::query::QueryError;

// ═══════════════════════════════════════════════════════════════════════════════
// LEAVES
// ═══════════════════════════════════════════════════════════════════════════════

/// Predicate over integer fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeltFilter {
    /// Exact match; other operators are ignored when set
    pub eq: Option<Felt>,
    /// Member of
    #[serde(rename = "in")]
    pub in_set: Option<Vec<Felt>>,
    /// Not a member of
    pub not_in: Option<Vec<Felt>>,
    /// Strictly less than
    pub lt: Option<Felt>,
    /// Less than or equal
    pub lte: Option<Felt>,
    /// Strictly greater than
    pub gt: Option<Felt>,
    /// Greater than or equal
    pub gte: Option<Felt>,
}

/// A felt written as a `0x` hex literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexValue(pub Felt);

impl<'de> Deserialize<'de> for HexValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Felt::from_hex(&literal).map(HexValue).map_err(de::Error::custom)
    }
}

/// Predicate over addresses and hashes, given as hex literals
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HexFilter {
    /// Exact match
    pub eq: Option<HexValue>,
    /// Member of
    #[serde(rename = "in")]
    pub in_set: Option<Vec<HexValue>>,
    /// Not a member of
    pub not_in: Option<Vec<HexValue>>,
    /// Strictly less than
    pub lt: Option<HexValue>,
    /// Less than or equal
    pub lte: Option<HexValue>,
    /// Strictly greater than
    pub gt: Option<HexValue>,
    /// Greater than or equal
    pub gte: Option<HexValue>,
}

/// Predicate over text fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StringFilter {
    /// Exact match
    pub eq: Option<String>,
    /// Member of
    #[serde(rename = "in")]
    pub in_set: Option<Vec<String>>,
    /// Not a member of
    pub not_in: Option<Vec<String>>,
    /// Strictly less than
    pub lt: Option<String>,
    /// Less than or equal
    pub lte: Option<String>,
    /// Strictly greater than
    pub gt: Option<String>,
    /// Greater than or equal
    pub gte: Option<String>,
    /// Substring match
    pub contains: Option<String>,
    /// Prefix match
    pub starts_with: Option<String>,
    /// Suffix match
    pub ends_with: Option<String>,
}

/// Predicate over enumeration fields, written with display labels.
///
/// Same shape as [`StringFilter`]; labels are translated to codes at
/// compile time.
pub type LabelFilter = StringFilter;

/// Predicate over timestamps, given as RFC 3339 strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DateTimeFilter {
    /// Exact match
    pub eq: Option<DateTime<Utc>>,
    /// Member of
    #[serde(rename = "in")]
    pub in_set: Option<Vec<DateTime<Utc>>>,
    /// Not a member of
    pub not_in: Option<Vec<DateTime<Utc>>>,
    /// Strictly before
    pub lt: Option<DateTime<Utc>>,
    /// At or before
    pub lte: Option<DateTime<Utc>>,
    /// Strictly after
    pub gt: Option<DateTime<Utc>>,
    /// At or after
    pub gte: Option<DateTime<Utc>>,
}

/// Predicate over flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BooleanFilter {
    /// Exact match
    pub eq: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// VISITOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives the present fields of a filter tree, depth first.
///
/// Absent fields are passed as `None` and should be ignored.
pub trait FilterVisitor {
    /// Integer leaf
    fn felt(&mut self, name: &str, leaf: Option<&FeltFilter>) -> Result<(), QueryError>;
    /// Hex leaf
    fn hex(&mut self, name: &str, leaf: Option<&HexFilter>) -> Result<(), QueryError>;
    /// Text leaf
    fn string(&mut self, name: &str, leaf: Option<&StringFilter>) -> Result<(), QueryError>;
    /// Label leaf resolved through a table
    fn label(
        &mut self,
        name: &str,
        table: TableId,
        leaf: Option<&LabelFilter>,
    ) -> Result<(), QueryError>;
    /// Timestamp leaf
    fn datetime(&mut self, name: &str, leaf: Option<&DateTimeFilter>) -> Result<(), QueryError>;
    /// Flag leaf
    fn boolean(&mut self, name: &str, leaf: Option<&BooleanFilter>) -> Result<(), QueryError>;
    /// Nested node; implementations recurse with `name` appended to the path
    fn nested(&mut self, name: &str, node: Option<&dyn FilterNode>) -> Result<(), QueryError>;
}

/// A filter tree node
pub trait FilterNode {
    /// Hand every field to the visitor
    fn accept(&self, visitor: &mut dyn FilterVisitor) -> Result<(), QueryError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITY FILTERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter over adventurers
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct AdventurersFilter {
    pub id: Option<FeltFilter>,
    pub owner: Option<HexFilter>,
    pub race: Option<LabelFilter>,
    pub home_realm: Option<FeltFilter>,
    pub birthdate: Option<DateTimeFilter>,
    pub name: Option<StringFilter>,
    pub order: Option<LabelFilter>,
    #[serde(rename = "imageHash1")]
    pub image_hash_1: Option<StringFilter>,
    #[serde(rename = "imageHash2")]
    pub image_hash_2: Option<StringFilter>,
    pub health: Option<FeltFilter>,
    pub level: Option<FeltFilter>,
    pub strength: Option<FeltFilter>,
    pub dexterity: Option<FeltFilter>,
    pub vitality: Option<FeltFilter>,
    pub intelligence: Option<FeltFilter>,
    pub wisdom: Option<FeltFilter>,
    pub charisma: Option<FeltFilter>,
    pub luck: Option<FeltFilter>,
    pub xp: Option<FeltFilter>,
    pub weapon_id: Option<FeltFilter>,
    pub chest_id: Option<FeltFilter>,
    pub head_id: Option<FeltFilter>,
    pub waist_id: Option<FeltFilter>,
    pub feet_id: Option<FeltFilter>,
    pub hands_id: Option<FeltFilter>,
    pub neck_id: Option<FeltFilter>,
    pub ring_id: Option<FeltFilter>,
    pub status: Option<FeltFilter>,
    pub beast: Option<FeltFilter>,
    pub upgrading: Option<BooleanFilter>,
    pub gold: Option<FeltFilter>,
    pub last_updated: Option<DateTimeFilter>,
}

impl FilterNode for AdventurersFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("id", self.id.as_ref())?;
        v.hex("owner", self.owner.as_ref())?;
        v.label("race", TableId::Race, self.race.as_ref())?;
        v.felt("homeRealm", self.home_realm.as_ref())?;
        v.datetime("birthdate", self.birthdate.as_ref())?;
        v.string("name", self.name.as_ref())?;
        v.label("order", TableId::Order, self.order.as_ref())?;
        v.string("imageHash1", self.image_hash_1.as_ref())?;
        v.string("imageHash2", self.image_hash_2.as_ref())?;
        v.felt("health", self.health.as_ref())?;
        v.felt("level", self.level.as_ref())?;
        v.felt("strength", self.strength.as_ref())?;
        v.felt("dexterity", self.dexterity.as_ref())?;
        v.felt("vitality", self.vitality.as_ref())?;
        v.felt("intelligence", self.intelligence.as_ref())?;
        v.felt("wisdom", self.wisdom.as_ref())?;
        v.felt("charisma", self.charisma.as_ref())?;
        v.felt("luck", self.luck.as_ref())?;
        v.felt("xp", self.xp.as_ref())?;
        v.felt("weaponId", self.weapon_id.as_ref())?;
        v.felt("chestId", self.chest_id.as_ref())?;
        v.felt("headId", self.head_id.as_ref())?;
        v.felt("waistId", self.waist_id.as_ref())?;
        v.felt("feetId", self.feet_id.as_ref())?;
        v.felt("handsId", self.hands_id.as_ref())?;
        v.felt("neckId", self.neck_id.as_ref())?;
        v.felt("ringId", self.ring_id.as_ref())?;
        v.felt("status", self.status.as_ref())?;
        v.felt("beast", self.beast.as_ref())?;
        v.boolean("upgrading", self.upgrading.as_ref())?;
        v.felt("gold", self.gold.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())
    }
}

/// Filter over beasts
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct BeastsFilter {
    pub id: Option<FeltFilter>,
    pub adventurer_id: Option<FeltFilter>,
    pub beast_type: Option<LabelFilter>,
    pub attack_type: Option<LabelFilter>,
    pub armor_type: Option<LabelFilter>,
    pub rank: Option<FeltFilter>,
    #[serde(rename = "prefix1")]
    pub prefix_1: Option<FeltFilter>,
    #[serde(rename = "prefix2")]
    pub prefix_2: Option<FeltFilter>,
    pub health: Option<FeltFilter>,
    pub xp: Option<FeltFilter>,
    pub level: Option<FeltFilter>,
    pub slain_on_date: Option<DateTimeFilter>,
    pub created_date: Option<DateTimeFilter>,
    pub last_updated: Option<DateTimeFilter>,
}

impl FilterNode for BeastsFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("id", self.id.as_ref())?;
        v.felt("adventurerId", self.adventurer_id.as_ref())?;
        v.label("beastType", TableId::Beast, self.beast_type.as_ref())?;
        v.label("attackType", TableId::AttackType, self.attack_type.as_ref())?;
        v.label("armorType", TableId::AttackType, self.armor_type.as_ref())?;
        v.felt("rank", self.rank.as_ref())?;
        v.felt("prefix1", self.prefix_1.as_ref())?;
        v.felt("prefix2", self.prefix_2.as_ref())?;
        v.felt("health", self.health.as_ref())?;
        v.felt("xp", self.xp.as_ref())?;
        v.felt("level", self.level.as_ref())?;
        v.datetime("slainOnDate", self.slain_on_date.as_ref())?;
        v.datetime("createdDate", self.created_date.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())
    }
}

/// Item attributes nested under a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ItemAttributesFilter {
    #[serde(rename = "type")]
    pub item_type: Option<LabelFilter>,
    pub slot: Option<FeltFilter>,
    pub class_type: Option<LabelFilter>,
    pub material: Option<LabelFilter>,
    pub rank: Option<FeltFilter>,
    #[serde(rename = "prefix1")]
    pub prefix_1: Option<FeltFilter>,
    #[serde(rename = "prefix2")]
    pub prefix_2: Option<FeltFilter>,
    pub suffix: Option<FeltFilter>,
    pub greatness: Option<FeltFilter>,
    pub created_block: Option<FeltFilter>,
    pub xp: Option<FeltFilter>,
    pub adventurer_id: Option<FeltFilter>,
    pub bag: Option<FeltFilter>,
}

impl FilterNode for ItemAttributesFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.label("type", TableId::Item, self.item_type.as_ref())?;
        v.felt("slot", self.slot.as_ref())?;
        v.label("classType", TableId::AttackType, self.class_type.as_ref())?;
        v.label("material", TableId::Material, self.material.as_ref())?;
        v.felt("rank", self.rank.as_ref())?;
        v.felt("prefix1", self.prefix_1.as_ref())?;
        v.felt("prefix2", self.prefix_2.as_ref())?;
        v.felt("suffix", self.suffix.as_ref())?;
        v.felt("greatness", self.greatness.as_ref())?;
        v.felt("createdBlock", self.created_block.as_ref())?;
        v.felt("xp", self.xp.as_ref())?;
        v.felt("adventurerId", self.adventurer_id.as_ref())?;
        v.felt("bag", self.bag.as_ref())
    }
}

/// Filter over items
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ItemsFilter {
    pub id: Option<FeltFilter>,
    pub market_id: Option<FeltFilter>,
    #[serde(rename = "type")]
    pub item_type: Option<LabelFilter>,
    pub slot: Option<FeltFilter>,
    pub class_type: Option<LabelFilter>,
    pub material: Option<LabelFilter>,
    pub rank: Option<FeltFilter>,
    #[serde(rename = "prefix1")]
    pub prefix_1: Option<FeltFilter>,
    #[serde(rename = "prefix2")]
    pub prefix_2: Option<FeltFilter>,
    pub suffix: Option<FeltFilter>,
    pub greatness: Option<FeltFilter>,
    pub created_block: Option<FeltFilter>,
    pub xp: Option<FeltFilter>,
    pub adventurer_id: Option<FeltFilter>,
    pub bag: Option<FeltFilter>,
    pub last_updated: Option<DateTimeFilter>,
}

impl FilterNode for ItemsFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("id", self.id.as_ref())?;
        v.felt("marketId", self.market_id.as_ref())?;
        v.label("type", TableId::Item, self.item_type.as_ref())?;
        v.felt("slot", self.slot.as_ref())?;
        v.label("classType", TableId::AttackType, self.class_type.as_ref())?;
        v.label("material", TableId::Material, self.material.as_ref())?;
        v.felt("rank", self.rank.as_ref())?;
        v.felt("prefix1", self.prefix_1.as_ref())?;
        v.felt("prefix2", self.prefix_2.as_ref())?;
        v.felt("suffix", self.suffix.as_ref())?;
        v.felt("greatness", self.greatness.as_ref())?;
        v.felt("createdBlock", self.created_block.as_ref())?;
        v.felt("xp", self.xp.as_ref())?;
        v.felt("adventurerId", self.adventurer_id.as_ref())?;
        v.felt("bag", self.bag.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())
    }
}

/// Bid attributes of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct BidFilter {
    pub price: Option<FeltFilter>,
    pub expiry: Option<DateTimeFilter>,
    pub bidder: Option<FeltFilter>,
    pub status: Option<FeltFilter>,
}

impl FilterNode for BidFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("price", self.price.as_ref())?;
        v.datetime("expiry", self.expiry.as_ref())?;
        v.felt("bidder", self.bidder.as_ref())?;
        v.felt("status", self.status.as_ref())
    }
}

/// Filter over market listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ListingsFilter {
    pub market_id: Option<FeltFilter>,
    pub item_id: Option<FeltFilter>,
    pub claimed_by: Option<FeltFilter>,
    pub owner: Option<HexFilter>,
    pub claimed_time: Option<DateTimeFilter>,
    pub last_updated: Option<DateTimeFilter>,
    pub item: Option<ItemAttributesFilter>,
    pub bid: Option<BidFilter>,
}

impl FilterNode for ListingsFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("marketId", self.market_id.as_ref())?;
        v.felt("itemId", self.item_id.as_ref())?;
        v.felt("claimedBy", self.claimed_by.as_ref())?;
        v.hex("owner", self.owner.as_ref())?;
        v.datetime("claimedTime", self.claimed_time.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())?;
        v.nested("item", self.item.as_ref().map(|n| n as &dyn FilterNode))?;
        v.nested("bid", self.bid.as_ref().map(|n| n as &dyn FilterNode))
    }
}

/// Filter over the discovery log
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct DiscoveriesFilter {
    pub adventurer_id: Option<FeltFilter>,
    pub discovery_type: Option<LabelFilter>,
    pub sub_discovery_type: Option<FeltFilter>,
    pub entity_id: Option<FeltFilter>,
    pub output_amount: Option<FeltFilter>,
    pub discovery_time: Option<DateTimeFilter>,
    pub tx_hash: Option<HexFilter>,
}

impl FilterNode for DiscoveriesFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("adventurerId", self.adventurer_id.as_ref())?;
        v.label("discoveryType", TableId::DiscoveryType, self.discovery_type.as_ref())?;
        v.felt("subDiscoveryType", self.sub_discovery_type.as_ref())?;
        v.felt("entityId", self.entity_id.as_ref())?;
        v.felt("outputAmount", self.output_amount.as_ref())?;
        v.datetime("discoveryTime", self.discovery_time.as_ref())?;
        v.hex("txHash", self.tx_hash.as_ref())
    }
}

/// Filter over battles
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct BattlesFilter {
    pub beast_id: Option<FeltFilter>,
    pub adventurer_id: Option<FeltFilter>,
    pub damage: Option<FeltFilter>,
    pub last_updated: Option<DateTimeFilter>,
}

impl FilterNode for BattlesFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("beastId", self.beast_id.as_ref())?;
        v.felt("adventurerId", self.adventurer_id.as_ref())?;
        v.felt("damage", self.damage.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())
    }
}

/// Filter over heists
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct HeistsFilter {
    pub thief_id: Option<FeltFilter>,
    pub start_time: Option<DateTimeFilter>,
    pub gold: Option<FeltFilter>,
    pub last_updated: Option<DateTimeFilter>,
}

impl FilterNode for HeistsFilter {
    fn accept(&self, v: &mut dyn FilterVisitor) -> Result<(), QueryError> {
        v.felt("thiefId", self.thief_id.as_ref())?;
        v.datetime("startTime", self.start_time.as_ref())?;
        v.felt("gold", self.gold.as_ref())?;
        v.datetime("lastUpdated", self.last_updated.as_ref())
    }
}

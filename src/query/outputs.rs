//! Typed query results.
//!
//! Output records resolve enumeration codes to labels (unknown codes read
//! "Unknown"), render timestamps as UTC date-times and keep nulls as `None`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::core::felt::Felt;
use crate::core::tables::{EnumTable, EnumTables};
use crate::projection::entities::{
    Adventurer, Battle, Beast, BidFields, Discovery, Heist, Item, ItemFields, Listing,
};
use crate::query::executor::Queryable;
use crate::query::filter::{
    AdventurersFilter, BattlesFilter, BeastsFilter, DiscoveriesFilter, HeistsFilter, ItemsFilter,
    ListingsFilter,
};

fn datetime(seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds).ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

fn felt_datetime(value: &Option<Felt>) -> Option<DateTime<Utc>> {
    value.as_ref().and_then(|f| f.to_u64().ok()).and_then(datetime)
}

fn label(table: &EnumTable, value: &Option<Felt>) -> Option<&'static str> {
    value.as_ref().map(|code| table.display(code))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADVENTURERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Adventurer result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct AdventurerOutput {
    pub id: Felt,
    pub owner: Option<Felt>,
    pub race: Option<&'static str>,
    pub home_realm: Option<Felt>,
    pub birthdate: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub order: Option<&'static str>,
    #[serde(rename = "imageHash1")]
    pub image_hash_1: Option<String>,
    #[serde(rename = "imageHash2")]
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
    pub beast_id: Option<Felt>,
    pub upgrading: Option<bool>,
    pub gold: Option<Felt>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Adventurer {
    type Filter = AdventurersFilter;
    type Output = AdventurerOutput;

    fn to_output(&self, tables: &EnumTables) -> AdventurerOutput {
        AdventurerOutput {
            id: self.id,
            owner: self.owner,
            race: label(&tables.races, &self.race),
            home_realm: self.home_realm,
            birthdate: felt_datetime(&self.birthdate),
            name: self.name.clone(),
            order: label(&tables.orders, &self.order),
            image_hash_1: self.image_hash_1.clone(),
            image_hash_2: self.image_hash_2.clone(),
            health: self.health,
            level: self.level,
            strength: self.strength,
            dexterity: self.dexterity,
            vitality: self.vitality,
            intelligence: self.intelligence,
            wisdom: self.wisdom,
            charisma: self.charisma,
            luck: self.luck,
            xp: self.xp,
            weapon_id: self.weapon_id,
            chest_id: self.chest_id,
            head_id: self.head_id,
            waist_id: self.waist_id,
            feet_id: self.feet_id,
            hands_id: self.hands_id,
            neck_id: self.neck_id,
            ring_id: self.ring_id,
            status: self.status,
            beast_id: self.beast,
            upgrading: self.upgrading,
            gold: self.gold,
            last_updated: datetime(self.last_updated),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEASTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Beast result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct BeastOutput {
    pub id: Felt,
    pub adventurer_id: Option<Felt>,
    pub beast_type: Option<&'static str>,
    pub attack_type: Option<&'static str>,
    pub armor_type: Option<&'static str>,
    pub rank: Option<Felt>,
    #[serde(rename = "prefix1")]
    pub prefix_1: Option<Felt>,
    #[serde(rename = "prefix2")]
    pub prefix_2: Option<Felt>,
    pub health: Option<Felt>,
    pub xp: Option<Felt>,
    pub level: Option<Felt>,
    pub slain_on_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Beast {
    type Filter = BeastsFilter;
    type Output = BeastOutput;

    fn to_output(&self, tables: &EnumTables) -> BeastOutput {
        BeastOutput {
            id: self.id,
            adventurer_id: self.adventurer_id,
            beast_type: label(&tables.beasts, &self.beast_type),
            attack_type: label(&tables.attack_types, &self.attack_type),
            armor_type: label(&tables.attack_types, &self.armor_type),
            rank: self.rank,
            prefix_1: self.prefix_1,
            prefix_2: self.prefix_2,
            health: self.health,
            xp: self.xp,
            level: self.level,
            slain_on_date: felt_datetime(&self.slain_on),
            created_date: self.created_at.and_then(datetime),
            last_updated: datetime(self.last_updated),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ITEMS AND LISTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Item attributes result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ItemAttributesOutput {
    #[serde(rename = "type")]
    pub item_type: Option<&'static str>,
    pub slot: Option<Felt>,
    pub class_type: Option<&'static str>,
    pub material: Option<&'static str>,
    pub rank: Option<Felt>,
    #[serde(rename = "prefix1")]
    pub prefix_1: Option<Felt>,
    #[serde(rename = "prefix2")]
    pub prefix_2: Option<Felt>,
    pub suffix: Option<Felt>,
    pub greatness: Option<Felt>,
    pub created_block: Option<Felt>,
    pub xp: Option<Felt>,
    pub adventurer_id: Option<Felt>,
    pub bag: Option<Felt>,
}

impl ItemAttributesOutput {
    fn from_fields(fields: &ItemFields, tables: &EnumTables) -> Self {
        Self {
            item_type: label(&tables.items, &fields.item_type),
            slot: fields.slot,
            class_type: label(&tables.attack_types, &fields.class_type),
            material: label(&tables.materials, &fields.material),
            rank: fields.rank,
            prefix_1: fields.prefix_1,
            prefix_2: fields.prefix_2,
            suffix: fields.suffix,
            greatness: fields.greatness,
            created_block: fields.created_block,
            xp: fields.xp,
            adventurer_id: fields.adventurer_id,
            bag: fields.bag_id,
        }
    }
}

/// Item result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutput {
    /// Item id
    pub id: Felt,
    /// Listing the item came from
    pub market_id: Option<Felt>,
    /// Attributes
    #[serde(flatten)]
    pub attributes: ItemAttributesOutput,
    /// Last write
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Item {
    type Filter = ItemsFilter;
    type Output = ItemOutput;

    fn to_output(&self, tables: &EnumTables) -> ItemOutput {
        ItemOutput {
            id: self.id,
            market_id: self.market_item_id,
            attributes: ItemAttributesOutput::from_fields(&self.fields, tables),
            last_updated: datetime(self.last_updated),
        }
    }
}

/// Bid result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct BidOutput {
    pub price: Option<Felt>,
    pub expiry: Option<DateTime<Utc>>,
    pub bidder: Option<Felt>,
    pub status: Option<Felt>,
}

impl From<&BidFields> for BidOutput {
    fn from(bid: &BidFields) -> Self {
        Self {
            price: bid.price,
            expiry: felt_datetime(&bid.expiry),
            bidder: bid.bidder,
            status: bid.status,
        }
    }
}

/// Market listing result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ListingOutput {
    pub market_id: Felt,
    pub item_id: Option<Felt>,
    pub item: ItemAttributesOutput,
    pub bid: BidOutput,
    pub claimed_by: Option<Felt>,
    pub owner: Option<Felt>,
    pub claimed_time: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Listing {
    type Filter = ListingsFilter;
    type Output = ListingOutput;

    fn to_output(&self, tables: &EnumTables) -> ListingOutput {
        ListingOutput {
            market_id: self.market_id,
            item_id: self.item_id,
            item: ItemAttributesOutput::from_fields(&self.item, tables),
            bid: BidOutput::from(&self.bid),
            claimed_by: self.claimed_by,
            owner: self.owner,
            claimed_time: self.claimed_time.and_then(datetime),
            last_updated: datetime(self.last_updated),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERIES, BATTLES, HEISTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Discovery result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct DiscoveryOutput {
    pub adventurer_id: Felt,
    pub discovery_type: &'static str,
    pub sub_discovery_type: &'static str,
    pub entity_id: Option<Felt>,
    pub output_amount: Felt,
    pub discovery_time: Option<DateTime<Utc>>,
    pub tx_hash: Felt,
}

impl Queryable for Discovery {
    type Filter = DiscoveriesFilter;
    type Output = DiscoveryOutput;

    fn to_output(&self, tables: &EnumTables) -> DiscoveryOutput {
        DiscoveryOutput {
            adventurer_id: self.adventurer_id,
            discovery_type: tables.discovery_types.display(&self.discovery_type),
            sub_discovery_type: tables
                .discovery_subtype(&self.discovery_type, &self.sub_discovery_type),
            entity_id: self.entity_id,
            output_amount: self.output_amount,
            discovery_time: datetime(self.discovery_time),
            tx_hash: self.tx_hash,
        }
    }
}

/// Battle result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct BattleOutput {
    pub beast_id: Felt,
    pub adventurer_id: Felt,
    pub damage: Option<Felt>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Battle {
    type Filter = BattlesFilter;
    type Output = BattleOutput;

    fn to_output(&self, _tables: &EnumTables) -> BattleOutput {
        BattleOutput {
            beast_id: self.beast_id,
            adventurer_id: self.adventurer_id,
            damage: self.damage,
            last_updated: datetime(self.last_updated),
        }
    }
}

/// Heist result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct HeistOutput {
    pub thief_id: Felt,
    pub start_time: Option<DateTime<Utc>>,
    pub gold: Option<Felt>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Queryable for Heist {
    type Filter = HeistsFilter;
    type Output = HeistOutput;

    fn to_output(&self, _tables: &EnumTables) -> HeistOutput {
        HeistOutput {
            thief_id: self.thief_id,
            start_time: felt_datetime(&self.start_time),
            gold: self.gold,
            last_updated: datetime(self.last_updated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::{DISCOVERY_OBSTACLE, UNKNOWN_LABEL};

    #[test]
    fn test_adventurer_labels() {
        let tables = EnumTables::default();
        let mut row = Adventurer::new(Felt::from_u64(7));
        row.race = Some(Felt::from_u64(1));
        row.order = Some(Felt::from_u64(999));
        row.last_updated = 1_682_899_200;

        let out = row.to_output(&tables);
        assert_eq!(out.race, Some("Elf"));
        assert_eq!(out.order, Some(UNKNOWN_LABEL));
        assert_eq!(out.name, None);
        assert_eq!(out.last_updated.unwrap().to_rfc3339(), "2023-05-01T00:00:00+00:00");
    }

    #[test]
    fn test_discovery_subtype_follows_category() {
        let tables = EnumTables::default();
        let row = Discovery {
            block_number: 1,
            event_index: 0,
            adventurer_id: Felt::from_u64(7),
            discovery_type: Felt::from_u64(DISCOVERY_OBSTACLE),
            sub_discovery_type: Felt::from_u64(1),
            entity_id: None,
            output_amount: Felt::from_u64(3),
            discovery_time: 100,
            tx_hash: Felt::from_u64(0xfeed),
        };

        let out = row.to_output(&tables);
        assert_eq!(
            out.sub_discovery_type,
            tables.obstacles.display(&Felt::from_u64(1))
        );
    }

    #[test]
    fn test_json_shape() {
        let tables = EnumTables::default();
        let mut listing = Listing::new(Felt::from_u64(21));
        listing.bid.price = Some(Felt::from_u64(30));

        let json = serde_json::to_value(listing.to_output(&tables)).unwrap();
        assert_eq!(json["marketId"], "0x15");
        assert_eq!(json["bid"]["price"], "0x1e");
        assert!(json["item"]["type"].is_null());
    }
}

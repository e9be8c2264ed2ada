//! Applies decoded events to the projection.
//!
//! Creation events are insert-only and refuse to overwrite an existing row.
//! Every other event is an upsert: the current row (or an empty one) has the
//! event's fields merged in and its timestamp refreshed. The result of an
//! apply depends only on the prior row and the event, never on how many
//! times the event was seen.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::felt::Felt;
use crate::error::{Error, Result};
use crate::events::kinds::EventKind;
use crate::events::records::{self as rec, DecodedEvent};
use crate::projection::entities::{
    compound_key, Adventurer, Battle, Beast, BidFields, Discovery, Entity, Heist, Item,
    ItemFields, Listing,
};
use crate::projection::store::ProjectionStore;
use crate::storage::backend::StorageBackend;

/// Where an event sits on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Block number
    pub block_number: u64,
    /// Block timestamp, unix seconds
    pub block_timestamp: u64,
    /// Emitting transaction
    pub tx_hash: Felt,
    /// Position of the event inside the block
    pub event_index: u32,
}

/// Effect of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// A new row was created
    Inserted,
    /// An existing row was updated
    Updated,
}

/// Single writer over a projection store
pub struct Projector<B: StorageBackend> {
    store: ProjectionStore<B>,
}

impl<B: StorageBackend> Projector<B> {
    /// Create a projector that owns the store
    pub fn new(store: ProjectionStore<B>) -> Self {
        Self { store }
    }

    /// Read access for queries
    pub fn store(&self) -> &ProjectionStore<B> {
        &self.store
    }

    /// Release the store
    pub fn into_store(self) -> ProjectionStore<B> {
        self.store
    }

    /// Apply one decoded event
    pub fn apply(&mut self, ctx: &EventContext, event: &DecodedEvent) -> Result<ApplyOutcome> {
        let kind = event.kind();
        let outcome = match event {
            DecodedEvent::MintAdventurer(e) => self.write(
                ctx,
                kind,
                || Adventurer::new(e.adventurer_id),
                |row| row.owner = e.owner.non_zero(),
            )?,
            DecodedEvent::UpdateAdventurerState(e) => self.write(
                ctx,
                kind,
                || Adventurer::new(e.adventurer_id),
                |row| merge_adventurer_state(row, &e.state),
            )?,
            DecodedEvent::UpdateGold(e) => self.write(
                ctx,
                kind,
                || Adventurer::new(e.adventurer_id),
                |row| row.gold = Some(e.balance),
            )?,
            DecodedEvent::Discovery(e) => self.write(
                ctx,
                kind,
                || Discovery {
                    block_number: ctx.block_number,
                    event_index: ctx.event_index,
                    adventurer_id: e.adventurer_id,
                    discovery_type: e.discovery_type,
                    sub_discovery_type: e.sub_discovery_type,
                    entity_id: e.entity_id,
                    output_amount: e.output_amount,
                    discovery_time: ctx.block_timestamp,
                    tx_hash: ctx.tx_hash,
                },
                |_| {},
            )?,
            DecodedEvent::UpdateThiefState(e) => self.write(
                ctx,
                kind,
                || Heist {
                    thief_id: e.thief_id,
                    start_time: None,
                    gold: None,
                    last_updated: 0,
                },
                |row| {
                    row.start_time = e.start_time;
                    row.gold = Some(e.gold);
                },
            )?,
            DecodedEvent::CreateBeast(e) => self.write(
                ctx,
                kind,
                || Beast::new(e.beast_id),
                |row| {
                    merge_beast_state(row, &e.state);
                    row.created_at = Some(ctx.block_timestamp);
                },
            )?,
            DecodedEvent::UpdateBeastState(e) => self.write(
                ctx,
                kind,
                || Beast::new(e.beast_id),
                |row| merge_beast_state(row, &e.state),
            )?,
            DecodedEvent::BeastAttacked(e) | DecodedEvent::AdventurerAttacked(e) => self.write(
                ctx,
                kind,
                || Battle {
                    beast_id: e.beast_id,
                    adventurer_id: e.adventurer_id,
                    damage: None,
                    last_updated: 0,
                },
                |row| row.damage = Some(e.damage),
            )?,
            DecodedEvent::UpdateItemState(e) => self.write(
                ctx,
                kind,
                || Item::new(e.item_id),
                |row| {
                    row.market_item_id = e.market_item_id;
                    merge_item_state(&mut row.fields, &e.state);
                },
            )?,
            DecodedEvent::ClaimItem(e) => self.write(
                ctx,
                kind,
                || Listing::new(e.market_item_id),
                |row| {
                    row.item_id = e.item_id;
                    row.claimed_by = e.adventurer_id;
                    row.owner = e.owner;
                    row.claimed_time = Some(ctx.block_timestamp);
                },
            )?,
            DecodedEvent::ItemMerchantUpdate(e) => self.write(
                ctx,
                kind,
                || Listing::new(e.market_item_id),
                |row| {
                    merge_item_state(&mut row.item, &e.item);
                    merge_bid(&mut row.bid, &e.bid);
                },
            )?,
        };

        debug!(
            kind = %kind,
            block = ctx.block_number,
            index = ctx.event_index,
            ?outcome,
            "event applied"
        );

        Ok(outcome)
    }

    /// Merge an event into the current row, or into `init()` when there is none.
    ///
    /// Insert-only kinds refuse to touch an existing row.
    fn write<E: Entity>(
        &mut self,
        ctx: &EventContext,
        kind: EventKind,
        init: impl FnOnce() -> E,
        merge: impl FnOnce(&mut E),
    ) -> Result<ApplyOutcome> {
        let fresh = init();
        let key = fresh.key();
        let (mut row, outcome) = match self.store.get_current::<E>(&key)? {
            Some(_) if kind.is_insert_only() => {
                return Err(Error::DuplicateEntity {
                    collection: E::COLLECTION.name(),
                    key: hex::encode(&key),
                });
            }
            Some(existing) => (existing, ApplyOutcome::Updated),
            None => (fresh, ApplyOutcome::Inserted),
        };

        merge(&mut row);
        row.touch(ctx.block_timestamp);
        self.store.put(ctx.block_number, row)?;
        Ok(outcome)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD MERGES
// ═══════════════════════════════════════════════════════════════════════════════

fn merge_adventurer_state(row: &mut Adventurer, s: &rec::AdventurerState) {
    row.race = s.race;
    row.home_realm = s.home_realm;
    row.birthdate = s.birthdate;
    row.name = s.name.clone();
    row.order = s.order;
    row.image_hash_1 = s.image_hash_1.clone();
    row.image_hash_2 = s.image_hash_2.clone();
    row.health = Some(s.health);
    row.level = Some(s.level);
    row.strength = Some(s.strength);
    row.dexterity = Some(s.dexterity);
    row.vitality = Some(s.vitality);
    row.intelligence = Some(s.intelligence);
    row.wisdom = Some(s.wisdom);
    row.charisma = Some(s.charisma);
    row.luck = Some(s.luck);
    row.xp = Some(s.xp);
    row.weapon_id = s.weapon_id;
    row.chest_id = s.chest_id;
    row.head_id = s.head_id;
    row.waist_id = s.waist_id;
    row.feet_id = s.feet_id;
    row.hands_id = s.hands_id;
    row.neck_id = s.neck_id;
    row.ring_id = s.ring_id;
    row.status = s.status;
    row.beast = s.beast;
    row.upgrading = Some(s.upgrading);
}

fn merge_beast_state(row: &mut Beast, s: &rec::BeastState) {
    row.beast_type = s.beast_type;
    row.attack_type = Some(s.attack_type);
    row.armor_type = Some(s.armor_type);
    row.rank = s.rank;
    row.prefix_1 = s.prefix_1;
    row.prefix_2 = s.prefix_2;
    row.adventurer_id = s.adventurer_id;
    row.xp = Some(s.xp);
    row.level = Some(s.level);
    row.health = Some(s.health);
    row.slain_on = s.slain_on;
}

fn merge_item_state(fields: &mut ItemFields, s: &rec::ItemState) {
    fields.item_type = s.item_type;
    fields.slot = s.slot;
    fields.class_type = Some(s.class_type);
    fields.material = Some(s.material);
    fields.rank = s.rank;
    fields.prefix_1 = s.prefix_1;
    fields.prefix_2 = s.prefix_2;
    fields.suffix = s.suffix;
    fields.greatness = s.greatness;
    fields.created_block = s.created_block;
    fields.xp = Some(s.xp);
    fields.adventurer_id = s.adventurer_id;
    fields.bag_id = s.bag_id;
}

fn merge_bid(fields: &mut BidFields, b: &rec::Bid) {
    fields.price = b.price;
    fields.expiry = b.expiry;
    fields.bidder = b.bidder;
    fields.status = b.status;
}

/// Key of the battle row for a fight
pub fn battle_key(beast_id: &Felt, adventurer_id: &Felt) -> Vec<u8> {
    compound_key(&[beast_id, adventurer_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::records::{
        AdventurerState, Attack, BeastState, BeastUpdate, Bid, ClaimItem, ItemMerchantUpdate,
        ItemState, MintAdventurer, UpdateAdventurerState, UpdateGold, UpdateThiefState,
    };
    use crate::storage::backend::MemoryBackend;

    fn ctx(block: u64, timestamp: u64) -> EventContext {
        EventContext {
            block_number: block,
            block_timestamp: timestamp,
            tx_hash: Felt::from_u64(0xfeed),
            event_index: 0,
        }
    }

    fn projector() -> Projector<MemoryBackend> {
        Projector::new(ProjectionStore::new(MemoryBackend::new()))
    }

    fn f(v: u64) -> Felt {
        Felt::from_u64(v)
    }

    fn adventurer_update(id: u64, level: u64) -> DecodedEvent {
        DecodedEvent::UpdateAdventurerState(UpdateAdventurerState {
            adventurer_id: f(id),
            state: AdventurerState {
                race: Some(f(1)),
                name: Some("loaf".into()),
                health: f(100),
                level: f(level),
                xp: f(40),
                weapon_id: Some(f(12)),
                ..Default::default()
            },
        })
    }

    fn beast_state() -> BeastState {
        BeastState {
            beast_type: Some(f(16)),
            attack_type: f(103),
            armor_type: f(201),
            rank: Some(f(2)),
            adventurer_id: Some(f(7)),
            xp: f(3),
            level: f(4),
            health: f(20),
            ..Default::default()
        }
    }

    #[test]
    fn test_mint_then_duplicate() {
        let mut p = projector();
        let mint = DecodedEvent::MintAdventurer(MintAdventurer {
            adventurer_id: f(7),
            owner: f(0xabc),
        });

        assert_eq!(p.apply(&ctx(1, 100), &mint).unwrap(), ApplyOutcome::Inserted);

        let err = p.apply(&ctx(2, 200), &mint).unwrap_err();
        assert!(err.is_integrity_violation());

        let row = p.store().get_current::<Adventurer>(f(7).as_bytes()).unwrap().unwrap();
        assert_eq!(row.owner, Some(f(0xabc)));
        assert_eq!(row.last_updated, 100);
    }

    #[test]
    fn test_insert_only_kinds_never_overwrite() {
        let mut p = projector();
        let create = |health| {
            DecodedEvent::CreateBeast(BeastUpdate {
                beast_id: f(3),
                state: BeastState { health: f(health), ..beast_state() },
            })
        };
        let events = [
            DecodedEvent::MintAdventurer(MintAdventurer { adventurer_id: f(7), owner: f(0xabc) }),
            create(20),
            DecodedEvent::Discovery(rec::Discovery {
                adventurer_id: f(7),
                discovery_type: f(1),
                sub_discovery_type: f(2),
                entity_id: None,
                output_amount: f(0),
            }),
        ];

        for event in &events {
            assert!(event.kind().is_insert_only());
            p.apply(&ctx(1, 100), event).unwrap();
        }

        for event in &events {
            let err = p.apply(&ctx(1, 100), event).unwrap_err();
            assert!(err.is_integrity_violation(), "{} gave {:?}", event.kind(), err);
        }
        assert!(p.apply(&ctx(2, 200), &create(1)).unwrap_err().is_integrity_violation());

        let beast = p.store().get_current::<Beast>(f(3).as_bytes()).unwrap().unwrap();
        assert_eq!(beast.health, Some(f(20)));
        assert_eq!(beast.created_at, Some(100));
    }

    #[test]
    fn test_update_is_idempotent_apart_from_timestamp() {
        let mut once = projector();
        once.apply(&ctx(1, 100), &adventurer_update(7, 5)).unwrap();
        let a = once.store().get_current::<Adventurer>(f(7).as_bytes()).unwrap().unwrap();

        let mut twice = projector();
        twice.apply(&ctx(1, 100), &adventurer_update(7, 5)).unwrap();
        assert_eq!(
            twice.apply(&ctx(2, 200), &adventurer_update(7, 5)).unwrap(),
            ApplyOutcome::Updated
        );
        let b = twice.store().get_current::<Adventurer>(f(7).as_bytes()).unwrap().unwrap();

        assert_eq!(b.last_updated, 200);
        assert_eq!(Adventurer { last_updated: 0, ..a }, Adventurer { last_updated: 0, ..b });
    }

    #[test]
    fn test_update_keeps_unlisted_fields() {
        let mut p = projector();
        p.apply(
            &ctx(1, 100),
            &DecodedEvent::MintAdventurer(MintAdventurer { adventurer_id: f(7), owner: f(0xabc) }),
        )
        .unwrap();
        p.apply(&ctx(2, 110), &adventurer_update(7, 3)).unwrap();
        p.apply(
            &ctx(3, 120),
            &DecodedEvent::UpdateGold(UpdateGold { adventurer_id: f(7), balance: f(45) }),
        )
        .unwrap();

        let row = p.store().get_current::<Adventurer>(f(7).as_bytes()).unwrap().unwrap();
        assert_eq!(row.owner, Some(f(0xabc)));
        assert_eq!(row.level, Some(f(3)));
        assert_eq!(row.gold, Some(f(45)));
        assert_eq!(row.last_updated, 120);
    }

    #[test]
    fn test_late_beast_update_matches_create_then_update() {
        let update = DecodedEvent::UpdateBeastState(BeastUpdate {
            beast_id: f(3),
            state: beast_state(),
        });

        let mut late = projector();
        assert_eq!(late.apply(&ctx(5, 500), &update).unwrap(), ApplyOutcome::Inserted);
        let a = late.store().get_current::<Beast>(f(3).as_bytes()).unwrap().unwrap();

        let mut ordered = projector();
        ordered
            .apply(
                &ctx(4, 400),
                &DecodedEvent::CreateBeast(BeastUpdate { beast_id: f(3), state: beast_state() }),
            )
            .unwrap();
        ordered.apply(&ctx(5, 500), &update).unwrap();
        let b = ordered.store().get_current::<Beast>(f(3).as_bytes()).unwrap().unwrap();

        assert_eq!(a.created_at, None);
        assert_eq!(b.created_at, Some(400));
        assert_eq!(Beast { created_at: None, ..b }, a);
    }

    #[test]
    fn test_battles_upsert_per_pair() {
        let mut p = projector();
        let hit = |damage| Attack { beast_id: f(3), adventurer_id: f(7), damage: f(damage) };

        p.apply(&ctx(1, 100), &DecodedEvent::BeastAttacked(hit(10))).unwrap();
        p.apply(&ctx(2, 110), &DecodedEvent::AdventurerAttacked(hit(4))).unwrap();

        let battles = p.store().scan_current::<Battle>().unwrap();
        assert_eq!(battles.len(), 1);
        assert_eq!(battles[0].damage, Some(f(4)));

        let row = p
            .store()
            .get_current::<Battle>(&battle_key(&f(3), &f(7)))
            .unwrap()
            .unwrap();
        assert_eq!(row.last_updated, 110);
    }

    #[test]
    fn test_discoveries_are_write_once() {
        let mut p = projector();
        let found = DecodedEvent::Discovery(rec::Discovery {
            adventurer_id: f(7),
            discovery_type: f(3),
            sub_discovery_type: f(0),
            entity_id: None,
            output_amount: f(12),
        });

        p.apply(&ctx(9, 900), &found).unwrap();
        let mut next = ctx(9, 900);
        next.event_index = 1;
        p.apply(&next, &found).unwrap();
        assert!(p.apply(&ctx(9, 900), &found).unwrap_err().is_integrity_violation());

        let rows = p.store().scan_current::<Discovery>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tx_hash, f(0xfeed));
    }

    #[test]
    fn test_claim_and_merchant_update_share_listing() {
        let mut p = projector();
        let merchant = DecodedEvent::ItemMerchantUpdate(ItemMerchantUpdate {
            market_item_id: f(21),
            item: ItemState { item_type: Some(f(45)), greatness: Some(f(1)), ..Default::default() },
            bid: Bid { price: Some(f(30)), bidder: Some(f(7)), ..Default::default() },
        });
        let claim = DecodedEvent::ClaimItem(ClaimItem {
            market_item_id: f(21),
            item_id: Some(f(99)),
            adventurer_id: Some(f(7)),
            owner: Some(f(0xabc)),
        });

        assert_eq!(p.apply(&ctx(1, 100), &merchant).unwrap(), ApplyOutcome::Inserted);
        assert_eq!(p.apply(&ctx(2, 200), &claim).unwrap(), ApplyOutcome::Updated);

        let listing = p.store().get_current::<Listing>(f(21).as_bytes()).unwrap().unwrap();
        assert_eq!(listing.item.item_type, Some(f(45)));
        assert_eq!(listing.bid.price, Some(f(30)));
        assert_eq!(listing.item_id, Some(f(99)));
        assert_eq!(listing.claimed_time, Some(200));
    }

    #[test]
    fn test_thief_state_upserts_heist() {
        let mut p = projector();
        let heist = |gold| {
            DecodedEvent::UpdateThiefState(UpdateThiefState {
                thief_id: f(7),
                start_time: Some(f(1_690_000_000)),
                gold: f(gold),
            })
        };

        p.apply(&ctx(1, 100), &heist(5)).unwrap();
        p.apply(&ctx(2, 200), &heist(8)).unwrap();

        let rows = p.store().scan_current::<Heist>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gold, Some(f(8)));
    }
}

//! Positional payload decoding.
//!
//! Every event kind has a fixed layout. The payload length is checked against
//! [`EventKind::arity`] before any field is read, so a short or long payload
//! never produces a partial record.

use crate::core::felt::{decode_ascii, Felt};
use crate::error::{Error, Result};
use crate::events::kinds::EventKind;
use crate::events::records::*;

/// Sequential reader over a payload of known length
struct FeltReader<'a> {
    kind: EventKind,
    data: &'a [Felt],
    pos: usize,
}

impl<'a> FeltReader<'a> {
    fn new(kind: EventKind, data: &'a [Felt]) -> Result<Self> {
        let expected = kind.arity();
        if data.len() != expected {
            return Err(Error::PayloadArity {
                kind: kind.name(),
                expected,
                got: data.len(),
            });
        }
        Ok(Self { kind, data, pos: 0 })
    }

    fn felt(&mut self) -> Result<Felt> {
        let value = self.data.get(self.pos).copied().ok_or_else(|| {
            Error::Internal(format!("{} layout read past position {}", self.kind, self.pos))
        })?;
        self.pos += 1;
        Ok(value)
    }

    /// Zero decodes to `None`
    fn optional(&mut self) -> Result<Option<Felt>> {
        Ok(self.felt()?.non_zero())
    }

    /// Short string; zero decodes to `None`
    fn text(&mut self, field: &str) -> Result<Option<String>> {
        let felt = self.felt()?;
        if felt.is_zero() {
            return Ok(None);
        }
        decode_ascii(&felt).map(Some).map_err(|e| match e {
            Error::InvalidAscii { text, .. } => Error::InvalidAscii {
                field: format!("{}.{}", self.kind, field),
                text,
            },
            other => other,
        })
    }

    fn flag(&mut self) -> Result<bool> {
        Ok(!self.felt()?.is_zero())
    }

    fn adventurer_state(&mut self) -> Result<AdventurerState> {
        Ok(AdventurerState {
            race: self.optional()?,
            home_realm: self.optional()?,
            birthdate: self.optional()?,
            name: self.text("name")?,
            order: self.optional()?,
            image_hash_1: self.text("image_hash_1")?,
            image_hash_2: self.text("image_hash_2")?,
            health: self.felt()?,
            level: self.felt()?,
            strength: self.felt()?,
            dexterity: self.felt()?,
            vitality: self.felt()?,
            intelligence: self.felt()?,
            wisdom: self.felt()?,
            charisma: self.felt()?,
            luck: self.felt()?,
            xp: self.felt()?,
            weapon_id: self.optional()?,
            chest_id: self.optional()?,
            head_id: self.optional()?,
            waist_id: self.optional()?,
            feet_id: self.optional()?,
            hands_id: self.optional()?,
            neck_id: self.optional()?,
            ring_id: self.optional()?,
            status: self.optional()?,
            beast: self.optional()?,
            upgrading: self.flag()?,
        })
    }

    fn beast_state(&mut self) -> Result<BeastState> {
        Ok(BeastState {
            beast_type: self.optional()?,
            attack_type: self.felt()?,
            armor_type: self.felt()?,
            rank: self.optional()?,
            prefix_1: self.optional()?,
            prefix_2: self.optional()?,
            adventurer_id: self.optional()?,
            xp: self.felt()?,
            level: self.felt()?,
            health: self.felt()?,
            slain_on: self.optional()?,
        })
    }

    fn item_state(&mut self) -> Result<ItemState> {
        Ok(ItemState {
            item_type: self.optional()?,
            slot: self.optional()?,
            class_type: self.felt()?,
            material: self.felt()?,
            rank: self.optional()?,
            prefix_1: self.optional()?,
            prefix_2: self.optional()?,
            suffix: self.optional()?,
            greatness: self.optional()?,
            created_block: self.optional()?,
            xp: self.felt()?,
            adventurer_id: self.optional()?,
            bag_id: self.optional()?,
        })
    }

    fn bid(&mut self) -> Result<Bid> {
        Ok(Bid {
            price: self.optional()?,
            expiry: self.optional()?,
            bidder: self.optional()?,
            status: self.optional()?,
        })
    }

    fn attack(&mut self) -> Result<Attack> {
        Ok(Attack {
            beast_id: self.felt()?,
            adventurer_id: self.felt()?,
            damage: self.felt()?,
        })
    }
}

/// Decode a payload for a known event kind
pub fn decode(kind: EventKind, data: &[Felt]) -> Result<DecodedEvent> {
    let mut r = FeltReader::new(kind, data)?;

    let event = match kind {
        EventKind::MintAdventurer => DecodedEvent::MintAdventurer(MintAdventurer {
            adventurer_id: r.felt()?,
            owner: r.felt()?,
        }),
        EventKind::UpdateAdventurerState => {
            DecodedEvent::UpdateAdventurerState(UpdateAdventurerState {
                adventurer_id: r.felt()?,
                state: r.adventurer_state()?,
            })
        }
        EventKind::Discovery => DecodedEvent::Discovery(Discovery {
            adventurer_id: r.felt()?,
            discovery_type: r.felt()?,
            sub_discovery_type: r.felt()?,
            entity_id: r.optional()?,
            output_amount: r.felt()?,
        }),
        EventKind::UpdateThiefState => DecodedEvent::UpdateThiefState(UpdateThiefState {
            thief_id: r.felt()?,
            start_time: r.optional()?,
            gold: r.felt()?,
        }),
        EventKind::CreateBeast => DecodedEvent::CreateBeast(BeastUpdate {
            beast_id: r.felt()?,
            state: r.beast_state()?,
        }),
        EventKind::UpdateBeastState => DecodedEvent::UpdateBeastState(BeastUpdate {
            beast_id: r.felt()?,
            state: r.beast_state()?,
        }),
        EventKind::BeastAttacked => DecodedEvent::BeastAttacked(r.attack()?),
        EventKind::AdventurerAttacked => DecodedEvent::AdventurerAttacked(r.attack()?),
        EventKind::UpdateGold => DecodedEvent::UpdateGold(UpdateGold {
            adventurer_id: r.felt()?,
            balance: r.felt()?,
        }),
        EventKind::UpdateItemState => DecodedEvent::UpdateItemState(UpdateItemState {
            item_id: r.felt()?,
            market_item_id: r.optional()?,
            state: r.item_state()?,
        }),
        EventKind::ClaimItem => DecodedEvent::ClaimItem(ClaimItem {
            market_item_id: r.felt()?,
            item_id: r.optional()?,
            adventurer_id: r.optional()?,
            owner: r.optional()?,
        }),
        EventKind::ItemMerchantUpdate => DecodedEvent::ItemMerchantUpdate(ItemMerchantUpdate {
            market_item_id: r.felt()?,
            item: r.item_state()?,
            bid: r.bid()?,
        }),
    };

    Ok(event)
}

/// Resolve the selector, then decode
pub fn decode_by_selector(selector: &Felt, data: &[Felt]) -> Result<DecodedEvent> {
    let kind = EventKind::from_selector(selector)
        .ok_or_else(|| Error::UnknownSelector(selector.to_short_hex()))?;
    decode(kind, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::felt::encode_ascii;

    fn felts(values: &[u64]) -> Vec<Felt> {
        values.iter().map(|v| Felt::from_u64(*v)).collect()
    }

    fn adventurer_payload() -> Vec<Felt> {
        let mut data = felts(&[7, 1, 12, 1_690_000_000]);
        data.push(encode_ascii("loaf").unwrap());
        data.push(Felt::from_u64(3));
        data.push(encode_ascii("QmHash").unwrap());
        data.push(Felt::ZERO);
        // health, level, seven stats, xp
        data.extend(felts(&[100, 5, 1, 2, 3, 4, 5, 6, 7, 240]));
        // eight slots: weapon and ring equipped
        data.extend(felts(&[12, 0, 0, 0, 0, 0, 0, 44]));
        // status, beast, upgrading
        data.extend(felts(&[1, 9, 1]));
        data
    }

    #[test]
    fn test_decode_mint() {
        let event = decode(EventKind::MintAdventurer, &felts(&[7, 0xabc])).unwrap();
        assert_eq!(
            event,
            DecodedEvent::MintAdventurer(MintAdventurer {
                adventurer_id: Felt::from_u64(7),
                owner: Felt::from_u64(0xabc),
            })
        );
    }

    #[test]
    fn test_decode_adventurer_state() {
        let data = adventurer_payload();
        assert_eq!(data.len(), 29);

        let DecodedEvent::UpdateAdventurerState(update) =
            decode(EventKind::UpdateAdventurerState, &data).unwrap()
        else {
            panic!("wrong variant");
        };

        let state = update.state;
        assert_eq!(update.adventurer_id, Felt::from_u64(7));
        assert_eq!(state.race, Some(Felt::from_u64(1)));
        assert_eq!(state.name.as_deref(), Some("loaf"));
        assert_eq!(state.image_hash_1.as_deref(), Some("QmHash"));
        assert_eq!(state.image_hash_2, None);
        assert_eq!(state.level, Felt::from_u64(5));
        assert_eq!(state.luck, Felt::from_u64(7));
        assert_eq!(state.xp, Felt::from_u64(240));
        assert_eq!(state.weapon_id, Some(Felt::from_u64(12)));
        assert_eq!(state.chest_id, None);
        assert_eq!(state.ring_id, Some(Felt::from_u64(44)));
        assert_eq!(state.beast, Some(Felt::from_u64(9)));
        assert!(state.upgrading);
    }

    #[test]
    fn test_arity_mismatch() {
        let short = decode(EventKind::UpdateGold, &felts(&[7])).unwrap_err();
        assert_eq!(
            short,
            Error::PayloadArity { kind: "UpdateGold", expected: 2, got: 1 }
        );

        let long = decode(EventKind::Discovery, &felts(&[1, 2, 3, 4, 5, 6])).unwrap_err();
        assert!(matches!(long, Error::PayloadArity { expected: 5, got: 6, .. }));
    }

    #[test]
    fn test_non_ascii_name_rejected() {
        let mut data = adventurer_payload();
        let mut bytes = [0u8; 32];
        bytes[31] = 0xff;
        data[4] = Felt::from_bytes_be(bytes);

        let err = decode(EventKind::UpdateAdventurerState, &data).unwrap_err();
        match err {
            Error::InvalidAscii { field, .. } => assert_eq!(field, "UpdateAdventurerState.name"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_decode_beast_state_alive() {
        let data = felts(&[3, 16, 102, 203, 2, 5, 0, 7, 10, 4, 35, 0]);
        let DecodedEvent::CreateBeast(create) = decode(EventKind::CreateBeast, &data).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(create.beast_id, Felt::from_u64(3));
        assert_eq!(create.state.beast_type, Some(Felt::from_u64(16)));
        assert_eq!(create.state.prefix_2, None);
        assert_eq!(create.state.adventurer_id, Some(Felt::from_u64(7)));
        assert_eq!(create.state.health, Felt::from_u64(35));
        assert_eq!(create.state.slain_on, None);
    }

    #[test]
    fn test_decode_merchant_update() {
        let mut data = felts(&[21]);
        data.extend(felts(&[45, 1, 102, 1002, 1, 0, 0, 0, 0, 700_000, 0, 0, 0]));
        data.extend(felts(&[30, 1_690_000_600, 7, 1]));

        let DecodedEvent::ItemMerchantUpdate(update) =
            decode(EventKind::ItemMerchantUpdate, &data).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(update.market_item_id, Felt::from_u64(21));
        assert_eq!(update.item.item_type, Some(Felt::from_u64(45)));
        assert_eq!(update.item.material, Felt::from_u64(1002));
        assert_eq!(update.item.created_block, Some(Felt::from_u64(700_000)));
        assert_eq!(update.item.adventurer_id, None);
        assert_eq!(update.bid.price, Some(Felt::from_u64(30)));
        assert_eq!(update.bid.bidder, Some(Felt::from_u64(7)));
    }

    #[test]
    fn test_decode_by_selector() {
        let event =
            decode_by_selector(&EventKind::UpdateGold.selector(), &felts(&[7, 45])).unwrap();
        assert_eq!(event.kind(), EventKind::UpdateGold);

        let err = decode_by_selector(&Felt::from_u64(1), &felts(&[7, 45])).unwrap_err();
        assert!(matches!(err, Error::UnknownSelector(_)));
    }

    #[test]
    fn test_every_kind_decodes_zero_payload() {
        for kind in EventKind::ALL {
            let data = vec![Felt::ZERO; kind.arity()];
            assert_eq!(decode(kind, &data).unwrap().kind(), kind);
        }
    }
}

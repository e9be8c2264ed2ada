//! Static enumeration tables.
//!
//! Integer codes emitted by the game contracts map to a fixed, published set
//! of display labels. Lookups in both directions return `Option`; callers
//! decide whether a miss is fatal.

use serde::{Deserialize, Serialize};

use crate::core::felt::Felt;

/// Label rendered for codes that are not part of a table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A code → label table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumTable {
    /// Table name, used in error messages
    pub name: &'static str,
    entries: &'static [(u64, &'static str)],
}

impl EnumTable {
    /// Create a table over static entries
    pub const fn new(name: &'static str, entries: &'static [(u64, &'static str)]) -> Self {
        Self { name, entries }
    }

    /// Label for a code
    pub fn label(&self, code: u64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    /// Label for a felt code, `"Unknown"` when unmapped or too wide
    pub fn display(&self, code: &Felt) -> &'static str {
        code.to_u64()
            .ok()
            .and_then(|c| self.label(c))
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Codes whose label satisfies a predicate, in table order
    pub fn codes_where(&self, mut predicate: impl FnMut(&str) -> bool) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, label)| predicate(label))
            .map(|(code, _)| *code)
            .collect()
    }

    /// All entries
    pub fn entries(&self) -> &'static [(u64, &'static str)] {
        self.entries
    }
}

/// Reverse lookup: display label → code. Exact, case-sensitive match.
pub fn lookup_by_value(label: &str, table: &EnumTable) -> Option<u64> {
    table
        .entries
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(code, _)| *code)
}

/// Forward lookup with the `"Unknown"` fallback
pub fn label_for(code: u64, table: &EnumTable) -> &'static str {
    table.label(code).unwrap_or(UNKNOWN_LABEL)
}

/// Identifies one of the tables held by [`EnumTables`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    /// Adventurer races
    Race,
    /// In-game factions
    Order,
    /// Beast kinds
    Beast,
    /// Item kinds
    Item,
    /// Item materials
    Material,
    /// Obstacle kinds
    Obstacle,
    /// Adventurer stats
    Stat,
    /// Attack and armor types
    AttackType,
    /// Discovery categories
    DiscoveryType,
    /// Item discovery outcomes
    ItemDiscoveryType,
}

/// The complete set of enumeration tables.
///
/// Built once with the published defaults and passed by reference to the
/// components that resolve labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTables {
    /// Races
    pub races: EnumTable,
    /// Orders
    pub orders: EnumTable,
    /// Beasts
    pub beasts: EnumTable,
    /// Items
    pub items: EnumTable,
    /// Materials
    pub materials: EnumTable,
    /// Obstacles
    pub obstacles: EnumTable,
    /// Stats
    pub stats: EnumTable,
    /// Attack and armor types
    pub attack_types: EnumTable,
    /// Discovery types
    pub discovery_types: EnumTable,
    /// Item discovery types
    pub item_discovery_types: EnumTable,
}

impl Default for EnumTables {
    fn default() -> Self {
        Self {
            races: EnumTable::new("race", RACES),
            orders: EnumTable::new("order", ORDERS),
            beasts: EnumTable::new("beast", BEASTS),
            items: EnumTable::new("item", ITEMS),
            materials: EnumTable::new("material", MATERIALS),
            obstacles: EnumTable::new("obstacle", OBSTACLES),
            stats: EnumTable::new("stat", STATS),
            attack_types: EnumTable::new("attack type", ATTACK_TYPES),
            discovery_types: EnumTable::new("discovery type", DISCOVERY_TYPES),
            item_discovery_types: EnumTable::new("item discovery type", ITEM_DISCOVERY_TYPES),
        }
    }
}

impl EnumTables {
    /// Resolve a table by id
    pub fn get(&self, id: TableId) -> &EnumTable {
        match id {
            TableId::Race => &self.races,
            TableId::Order => &self.orders,
            TableId::Beast => &self.beasts,
            TableId::Item => &self.items,
            TableId::Material => &self.materials,
            TableId::Obstacle => &self.obstacles,
            TableId::Stat => &self.stats,
            TableId::AttackType => &self.attack_types,
            TableId::DiscoveryType => &self.discovery_types,
            TableId::ItemDiscoveryType => &self.item_discovery_types,
        }
    }

    /// Label for the sub-type of a discovery, which depends on its category
    pub fn discovery_subtype(&self, discovery_type: &Felt, sub_type: &Felt) -> &'static str {
        match discovery_type.to_u64().ok() {
            Some(DISCOVERY_BEAST) => self.beasts.display(sub_type),
            Some(DISCOVERY_OBSTACLE) => self.obstacles.display(sub_type),
            Some(DISCOVERY_ITEM) => self.item_discovery_types.display(sub_type),
            _ => UNKNOWN_LABEL,
        }
    }
}

/// Discovery category code for beasts
pub const DISCOVERY_BEAST: u64 = 1;
/// Discovery category code for obstacles
pub const DISCOVERY_OBSTACLE: u64 = 2;
/// Discovery category code for items
pub const DISCOVERY_ITEM: u64 = 3;

// ═══════════════════════════════════════════════════════════════════════════════
// TABLE DATA
// ═══════════════════════════════════════════════════════════════════════════════

static RACES: &[(u64, &str)] = &[
    (1, "Elf"),
    (2, "Fox"),
    (3, "Giant"),
    (4, "Human"),
    (5, "Orc"),
    (6, "Demon"),
    (7, "Goblin"),
    (8, "Fish"),
    (9, "Cat"),
    (10, "Frog"),
];

static ORDERS: &[(u64, &str)] = &[
    (1, "Power"),
    (2, "Giants"),
    (3, "Titans"),
    (4, "Skill"),
    (5, "Perfection"),
    (6, "Brilliance"),
    (7, "Enlightenment"),
    (8, "Protection"),
    (9, "Twins"),
    (10, "Reflection"),
    (11, "Detection"),
    (12, "Fox"),
    (13, "Vitriol"),
    (14, "Fury"),
    (15, "Rage"),
    (16, "Anger"),
];

static BEASTS: &[(u64, &str)] = &[
    (1, "Pheonix"),
    (2, "Griffin"),
    (3, "Minotaur"),
    (4, "Basilisk"),
    (5, "Gnome"),
    (6, "Wraith"),
    (7, "Ghoul"),
    (8, "Goblin"),
    (9, "Skeleton"),
    (10, "Golem"),
    (11, "Giant"),
    (12, "Yeti"),
    (13, "Orc"),
    (14, "Beserker"),
    (15, "Ogre"),
    (16, "Dragon"),
    (17, "Vampire"),
    (18, "Werewolf"),
    (19, "Spider"),
    (20, "Rat"),
];

static ITEMS: &[(u64, &str)] = &[
    (1, "Pendant"),
    (2, "Necklace"),
    (3, "Amulet"),
    (4, "SilverRing"),
    (5, "BronzeRing"),
    (6, "PlatinumRing"),
    (7, "TitaniumRing"),
    (8, "GoldRing"),
    (9, "GhostWand"),
    (10, "GraveWand"),
    (11, "BoneWand"),
    (12, "Wand"),
    (13, "Grimoire"),
    (14, "Chronicle"),
    (15, "Tome"),
    (16, "Book"),
    (17, "DivineRobe"),
    (18, "SilkRobe"),
    (19, "LinenRobe"),
    (20, "Robe"),
    (21, "Shirt"),
    (22, "Crown"),
    (23, "DivineHood"),
    (24, "SilkHood"),
    (25, "LinenHood"),
    (26, "Hood"),
    (27, "BrightsilkSash"),
    (28, "SilkSash"),
    (29, "WoolSash"),
    (30, "LinenSash"),
    (31, "Sash"),
    (32, "DivineSlippers"),
    (33, "SilkSlippers"),
    (34, "WoolShoes"),
    (35, "LinenShoes"),
    (36, "Shoes"),
    (37, "DivineGloves"),
    (38, "SilkGloves"),
    (39, "WoolGloves"),
    (40, "LinenGloves"),
    (41, "Gloves"),
    (42, "Katana"),
    (43, "Falchion"),
    (44, "Scimitar"),
    (45, "LongSword"),
    (46, "ShortSword"),
    (47, "DemonHusk"),
    (48, "DragonskinArmor"),
    (49, "StuddedLeatherArmor"),
    (50, "HardLeatherArmor"),
    (51, "LeatherArmor"),
    (52, "DemonCrown"),
    (53, "DragonsCrown"),
    (54, "WarCap"),
    (55, "LeatherCap"),
    (56, "Cap"),
    (57, "DemonhideBelt"),
    (58, "DragonskinBelt"),
    (59, "StuddedLeatherBelt"),
    (60, "HardLeatherBelt"),
    (61, "LeatherBelt"),
    (62, "DemonhideBoots"),
    (63, "DragonskinBoots"),
    (64, "StuddedLeatherBoots"),
    (65, "HardLeatherBoots"),
    (66, "LeatherBoots"),
    (67, "DemonsHands"),
    (68, "DragonskinGloves"),
    (69, "StuddedLeatherGloves"),
    (70, "HardLeatherGloves"),
    (71, "LeatherGloves"),
    (72, "Warhammer"),
    (73, "Quarterstaff"),
    (74, "Maul"),
    (75, "Mace"),
    (76, "Club"),
    (77, "HolyChestplate"),
    (78, "OrnateChestplate"),
    (79, "PlateMail"),
    (80, "ChainMail"),
    (81, "RingMail"),
    (82, "AncientHelm"),
    (83, "OrnateHelm"),
    (84, "GreatHelm"),
    (85, "FullHelm"),
    (86, "Helm"),
    (87, "OrnateBelt"),
    (88, "WarBelt"),
    (89, "PlatedBelt"),
    (90, "MeshBelt"),
    (91, "HeavyBelt"),
    (92, "HolyGreaves"),
    (93, "OrnateGreaves"),
    (94, "Greaves"),
    (95, "ChainBoots"),
    (96, "HeavyBoots"),
    (97, "HolyGauntlets"),
    (98, "OrnateGauntlets"),
    (99, "Gauntlets"),
    (100, "ChainGloves"),
    (101, "HeavyGloves"),
];

static STATS: &[(u64, &str)] = &[
    (2, "Strength"),
    (3, "Dexterity"),
    (4, "Vitality"),
    (5, "Intelligence"),
    (6, "Wisdom"),
    (7, "Charisma"),
    (8, "Luck"),
];

static OBSTACLES: &[(u64, &str)] = &[
    (1, "Demonic Alter"),
    (2, "Curse"),
    (3, "Hex"),
    (4, "Magic Lock"),
    (5, "Dark Mist"),
    (6, "Collapsing Ceiling"),
    (7, "Crushing Walls"),
    (8, "Rockslide"),
    (9, "Tumbling Boulders"),
    (10, "Swinging Logs"),
    (11, "Pendulum Blades"),
    (12, "Flame Jet"),
    (13, "Poision Dart"),
    (14, "Spiked Pit"),
    (15, "Hidden Arrow"),
];

static DISCOVERY_TYPES: &[(u64, &str)] = &[
    (0, "Nothing"),
    (1, "Beast"),
    (2, "Obstacle"),
    (3, "Item"),
    (4, "Adventurer"),
];

static ITEM_DISCOVERY_TYPES: &[(u64, &str)] = &[(0, "Gold"), (1, "Loot"), (2, "Health")];

static ATTACK_TYPES: &[(u64, &str)] = &[
    (0, "Generic"),
    (100, "Generic Weapon"),
    (101, "Bludgeon Weapon"),
    (102, "Blade Weapon"),
    (103, "Magic Weapon"),
    (200, "Generic Armor"),
    (201, "Metal Armor"),
    (202, "Hide Armor"),
    (203, "Cloth Armor"),
    (300, "Ring"),
    (400, "Necklace"),
];

static MATERIALS: &[(u64, &str)] = &[
    (0, "Generic"),
    (1000, "Generic Metal"),
    (1001, "Ancient Metal"),
    (1002, "Holy Metal"),
    (1003, "Ornate Metal"),
    (1004, "Gold Metal"),
    (1005, "Silver Metal"),
    (1006, "Bronze Metal"),
    (1007, "Platinum Metal"),
    (1008, "Titanium Metal"),
    (1009, "Steel Metal"),
    (2000, "Generic Cloth"),
    (2001, "Royal Cloth"),
    (2002, "Divine Cloth"),
    (2003, "Brightsilk Cloth"),
    (2004, "Silk Cloth"),
    (2005, "Wool Cloth"),
    (2006, "Linen Cloth"),
    (3000, "Generic Biotic"),
    (3100, "Demon Generic Biotic"),
    (3101, "Demon Blood Biotic"),
    (3102, "Demon Bones Biotic"),
    (3103, "Demon Brain Biotic"),
    (3104, "Demon Eyes Biotic"),
    (3105, "Demon Hide Biotic"),
    (3106, "Demon Flesh Biotic"),
    (3107, "Demon Hair Biotic"),
    (3108, "Demon Heart Biotic"),
    (3109, "Demon Entrails Biotic"),
    (3110, "Demon Hands Biotic"),
    (3111, "Demon Feet Biotic"),
    (3200, "Dragon Generic Biotic"),
    (3201, "Dragon Blood Biotic"),
    (3202, "Dragon Bones Biotic"),
    (3203, "Dragon Brain Biotic"),
    (3204, "Dragon Eyes Biotic"),
    (3205, "Dragon Skin Biotic"),
    (3206, "Dragon Flesh Biotic"),
    (3207, "Dragon Hair Biotic"),
    (3208, "Dragon Heart Biotic"),
    (3209, "Dragon Entrails Biotic"),
    (3210, "Dragon Hands Biotic"),
    (3211, "Dragon Feet Biotic"),
    (3300, "Animal Generic Biotic"),
    (3301, "Animal Blood Biotic"),
    (3302, "Animal Bones Biotic"),
    (3303, "Animal Brain Biotic"),
    (3304, "Animal Eyes Biotic"),
    (3305, "Animal Hide Biotic"),
    (3306, "Animal Flesh Biotic"),
    (3307, "Animal Hair Biotic"),
    (3308, "Animal Heart Biotic"),
    (3309, "Animal Entrails Biotic"),
    (3310, "Animal Hands Biotic"),
    (3311, "Animal Feet Biotic"),
    (3400, "Human Generic Biotic"),
    (3401, "Human Blood Biotic"),
    (3402, "Human Bones Biotic"),
    (3403, "Human Brain Biotic"),
    (3404, "Human Eyes Biotic"),
    (3405, "Human Hide Biotic"),
    (3406, "Human Flesh Biotic"),
    (3407, "Human Hair Biotic"),
    (3408, "Human Heart Biotic"),
    (3409, "Human Entrails Biotic"),
    (3410, "Human Hands Biotic"),
    (3411, "Human Feet Biotic"),
    (4000, "Generic Paper"),
    (4001, "Magical Paper"),
    (5000, "Generic Wood"),
    (5100, "Generic Hardwood"),
    (5101, "Walnut Hardwood"),
    (5102, "Mahogany Hardwood"),
    (5103, "Maple Hardwood"),
    (5104, "Oak Hardwood"),
    (5105, "Rosewood Hardwood"),
    (5106, "Cherry Hardwood"),
    (5107, "Balsa Hardwood"),
    (5108, "Birch Hardwood"),
    (5109, "Holly Hardwood"),
    (5200, "Generic Softwood"),
    (5201, "Cedar Softwood"),
    (5202, "Pine Softwood"),
    (5203, "Fir Softwood"),
    (5204, "Hemlock Softwood"),
    (5205, "Spruce Softwood"),
    (5206, "Elder Softwood"),
    (5207, "Yew Softwood"),
];

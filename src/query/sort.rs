//! Sort specifications.
//!
//! A sort specification is a map from field path to `{asc, desc}` flags.
//! Only one key is ever used: the first entry, in declaration order, with a
//! flag set. Map order is therefore significant, and deserialization keeps
//! entries in the order they were written.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::projection::entities::Entity;
use crate::query::QueryError;

/// Field used when no entry is flagged
pub const DEFAULT_SORT_FIELD: &str = "lastUpdated";

/// Flags of one sort entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderByInput {
    /// Ascending
    #[serde(default)]
    pub asc: bool,
    /// Descending
    #[serde(default)]
    pub desc: bool,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// The single key a query sorts by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field path
    pub field: String,
    /// Direction
    pub direction: Direction,
}

impl SortKey {
    /// Compare two rows; nulls sort lowest
    pub fn compare<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        let ord = a.field(&self.field).cmp(&b.field(&self.field));
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: DEFAULT_SORT_FIELD.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Ordered sort entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    entries: Vec<(String, OrderByInput)>,
}

impl SortSpec {
    /// Empty specification, sorting by the default key
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn with(mut self, field: impl Into<String>, flags: OrderByInput) -> Self {
        self.entries.push((field.into(), flags));
        self
    }

    /// Append an ascending entry
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.with(field, OrderByInput { asc: true, desc: false })
    }

    /// Append a descending entry
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.with(field, OrderByInput { asc: false, desc: true })
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[(String, OrderByInput)] {
        &self.entries
    }

    /// Pick the sort key for an entity.
    ///
    /// Every entry must name a field of the entity, flagged or not.
    pub fn select<E: Entity>(&self) -> Result<SortKey, QueryError> {
        if let Some((field, _)) = self.entries.iter().find(|(f, _)| !E::has_field(f)) {
            return Err(QueryError::BadInput(format!(
                "cannot sort {} by unknown field {:?}",
                E::COLLECTION,
                field
            )));
        }

        let chosen = self.entries.iter().find_map(|(field, flags)| {
            let direction = if flags.asc {
                Direction::Asc
            } else if flags.desc {
                Direction::Desc
            } else {
                return None;
            };
            Some(SortKey {
                field: field.clone(),
                direction,
            })
        });

        Ok(chosen.unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for SortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = SortSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to {asc, desc} flags")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SortSpec, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((field, flags)) = map.next_entry::<String, OrderByInput>()? {
                    entries.push((field, flags));
                }
                Ok(SortSpec { entries })
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::felt::Felt;
    use crate::projection::entities::Adventurer;

    #[test]
    fn test_first_flagged_entry_wins() {
        let spec: SortSpec =
            serde_json::from_str(r#"{"xp": {"asc": true}, "level": {"desc": true}}"#).unwrap();
        let key = spec.select::<Adventurer>().unwrap();
        assert_eq!(key.field, "xp");
        assert_eq!(key.direction, Direction::Asc);

        let spec: SortSpec =
            serde_json::from_str(r#"{"level": {"desc": true}, "xp": {"asc": true}}"#).unwrap();
        assert_eq!(spec.select::<Adventurer>().unwrap().field, "level");
    }

    #[test]
    fn test_unflagged_defaults_to_last_updated() {
        let spec: SortSpec = serde_json::from_str(r#"{"xp": {}, "level": {"asc": false}}"#).unwrap();
        assert_eq!(spec.select::<Adventurer>().unwrap(), SortKey::default());
        assert_eq!(SortSpec::new().select::<Adventurer>().unwrap().direction, Direction::Desc);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let spec = SortSpec::new().asc("mana");
        assert!(spec.select::<Adventurer>().unwrap_err().is_bad_input());

        let spec = SortSpec::new().asc("xp").with("mana", OrderByInput::default());
        assert!(spec.select::<Adventurer>().is_err());
    }

    #[test]
    fn test_compare_puts_nulls_lowest() {
        let mut a = Adventurer::new(Felt::from_u64(1));
        let b = Adventurer::new(Felt::from_u64(2));
        a.xp = Some(Felt::from_u64(3));

        let asc = SortSpec::new().asc("xp").select::<Adventurer>().unwrap();
        assert_eq!(asc.compare(&a, &b), Ordering::Greater);

        let desc = SortSpec::new().desc("xp").select::<Adventurer>().unwrap();
        assert_eq!(desc.compare(&a, &b), Ordering::Less);
    }
}

//! Filter compilation.
//!
//! Flattens a filter tree into a map from dotted field path to predicate.
//! The map is AND-ed: a row matches when every predicate holds for the value
//! at its path. Compilation never touches the store, so every input error is
//! reported before any read.
//!
//! Leaf rules:
//! - `eq` wins outright; the other operators of that leaf are dropped
//! - `in`, `notIn` and the range operators combine
//! - of `contains`, `startsWith` and `endsWith` only the last present one
//!   (in that order) is kept
//! - label leaves translate labels to codes; label patterns become the set
//!   of codes whose label matches

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::felt::Felt;
use crate::core::tables::{lookup_by_value, EnumTable, EnumTables, TableId};
use crate::projection::entities::{Entity, Value};
use crate::projection::store::Validity;
use crate::query::filter::{
    BooleanFilter, DateTimeFilter, FeltFilter, FilterNode, FilterVisitor, HexFilter, LabelFilter,
    StringFilter,
};
use crate::query::QueryError;

// ═══════════════════════════════════════════════════════════════════════════════
// PREDICATES
// ═══════════════════════════════════════════════════════════════════════════════

/// Text or code-set pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Substring
    Contains(String),
    /// Prefix
    StartsWith(String),
    /// Suffix
    EndsWith(String),
    /// Any of a set of codes, produced by label patterns
    OneOf(Vec<Value>),
}

impl Pattern {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Pattern::Contains(p), Value::Text(s)) => s.contains(p.as_str()),
            (Pattern::StartsWith(p), Value::Text(s)) => s.starts_with(p.as_str()),
            (Pattern::EndsWith(p), Value::Text(s)) => s.ends_with(p.as_str()),
            (Pattern::OneOf(codes), v) => codes.contains(v),
            _ => false,
        }
    }
}

/// Operators of a leaf without `eq`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Member of
    pub in_set: Option<Vec<Value>>,
    /// Not a member of
    pub not_in: Option<Vec<Value>>,
    /// Strictly less than
    pub lt: Option<Value>,
    /// Less than or equal
    pub lte: Option<Value>,
    /// Strictly greater than
    pub gt: Option<Value>,
    /// Greater than or equal
    pub gte: Option<Value>,
    /// Text pattern
    pub pattern: Option<Pattern>,
}

impl Constraints {
    fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            // A null only satisfies exclusions.
            return self.in_set.is_none()
                && self.lt.is_none()
                && self.lte.is_none()
                && self.gt.is_none()
                && self.gte.is_none()
                && self.pattern.is_none();
        };

        let bound = |b: &Option<Value>, ok: fn(std::cmp::Ordering) -> bool| {
            b.as_ref()
                .map_or(true, |b| value.same_kind(b) && ok(value.cmp(b)))
        };

        self.in_set.as_ref().map_or(true, |set| set.contains(value))
            && self.not_in.as_ref().map_or(true, |set| !set.contains(value))
            && bound(&self.lt, |o| o.is_lt())
            && bound(&self.lte, |o| o.is_le())
            && bound(&self.gt, |o| o.is_gt())
            && bound(&self.gte, |o| o.is_ge())
            && self.pattern.as_ref().map_or(true, |p| p.matches(value))
    }
}

/// Compiled predicate of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact match
    Equals(Value),
    /// Combined operators
    Compound(Constraints),
}

impl Predicate {
    /// Whether a field value satisfies the predicate; `None` is null
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Equals(expected) => value == Some(expected),
            Predicate::Compound(constraints) => constraints.matches(value),
        }
    }
}

/// A flattened filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Predicates by dotted field path
    pub predicates: BTreeMap<String, Predicate>,
    /// Version visibility, always applied
    pub validity: Validity,
}

impl CompiledFilter {
    /// Read a past state instead of the current one
    pub fn as_of(mut self, block: u64) -> Self {
        self.validity = Validity::AsOf(block);
        self
    }

    /// Whether a row satisfies every predicate
    pub fn matches<E: Entity>(&self, row: &E) -> bool {
        self.predicates
            .iter()
            .all(|(path, predicate)| predicate.matches(row.field(path).as_ref()))
    }

    /// Predicate at a path
    pub fn get(&self, path: &str) -> Option<&Predicate> {
        self.predicates.get(path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles filter trees against a set of enumeration tables
pub struct FilterCompiler<'a> {
    tables: &'a EnumTables,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler
    pub fn new(tables: &'a EnumTables) -> Self {
        Self { tables }
    }

    /// Compile a filter tree
    pub fn compile(&self, root: &dyn FilterNode) -> Result<CompiledFilter, QueryError> {
        let mut walk = Walk {
            tables: self.tables,
            path: Vec::new(),
            predicates: BTreeMap::new(),
        };
        root.accept(&mut walk)?;

        Ok(CompiledFilter {
            predicates: walk.predicates,
            validity: Validity::Current,
        })
    }
}

struct Walk<'a> {
    tables: &'a EnumTables,
    path: Vec<String>,
    predicates: BTreeMap<String, Predicate>,
}

impl Walk<'_> {
    fn emit(&mut self, name: &str, predicate: Predicate) {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        };
        self.predicates.insert(path, predicate);
    }
}

/// Ranged leaf operators, already converted to values
struct Ops {
    eq: Option<Value>,
    in_set: Option<Vec<Value>>,
    not_in: Option<Vec<Value>>,
    lt: Option<Value>,
    lte: Option<Value>,
    gt: Option<Value>,
    gte: Option<Value>,
}

impl Ops {
    fn convert<T>(
        eq: &Option<T>,
        in_set: &Option<Vec<T>>,
        not_in: &Option<Vec<T>>,
        range: [&Option<T>; 4],
        mut to_value: impl FnMut(&T) -> Result<Value, QueryError>,
    ) -> Result<Self, QueryError> {
        let mut one = |v: &Option<T>| v.as_ref().map(&mut to_value).transpose();
        let eq = one(eq)?;
        let [lt, lte, gt, gte] = range;
        let (lt, lte, gt, gte) = (one(lt)?, one(lte)?, one(gt)?, one(gte)?);
        let mut many = |v: &Option<Vec<T>>| {
            v.as_ref()
                .map(|items| items.iter().map(&mut to_value).collect::<Result<Vec<_>, _>>())
                .transpose()
        };
        Ok(Self {
            eq,
            in_set: many(in_set)?,
            not_in: many(not_in)?,
            lt,
            lte,
            gt,
            gte,
        })
    }

    fn into_predicate(self, pattern: Option<Pattern>) -> Predicate {
        match self.eq {
            Some(value) => Predicate::Equals(value),
            None => Predicate::Compound(Constraints {
                in_set: self.in_set,
                not_in: self.not_in,
                lt: self.lt,
                lte: self.lte,
                gt: self.gt,
                gte: self.gte,
                pattern,
            }),
        }
    }
}

fn datetime_value(dt: &DateTime<Utc>) -> Result<Value, QueryError> {
    Ok(Value::Time(dt.timestamp()))
}

fn label_value(table: &EnumTable, label: &str) -> Result<Value, QueryError> {
    lookup_by_value(label, table)
        .map(|code| Value::Felt(Felt::from_u64(code)))
        .ok_or_else(|| QueryError::BadInput(format!("unknown {} label: {:?}", table.name, label)))
}

/// Last present pattern of a string leaf
fn text_pattern(leaf: &StringFilter) -> Option<Pattern> {
    let mut pattern = None;
    if let Some(p) = &leaf.contains {
        pattern = Some(Pattern::Contains(p.clone()));
    }
    if let Some(p) = &leaf.starts_with {
        pattern = Some(Pattern::StartsWith(p.clone()));
    }
    if let Some(p) = &leaf.ends_with {
        pattern = Some(Pattern::EndsWith(p.clone()));
    }
    pattern
}

impl FilterVisitor for Walk<'_> {
    fn felt(&mut self, name: &str, leaf: Option<&FeltFilter>) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let ops = Ops::convert(
            &leaf.eq,
            &leaf.in_set,
            &leaf.not_in,
            [&leaf.lt, &leaf.lte, &leaf.gt, &leaf.gte],
            |f| Ok(Value::Felt(*f)),
        )?;
        self.emit(name, ops.into_predicate(None));
        Ok(())
    }

    fn hex(&mut self, name: &str, leaf: Option<&HexFilter>) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let ops = Ops::convert(
            &leaf.eq,
            &leaf.in_set,
            &leaf.not_in,
            [&leaf.lt, &leaf.lte, &leaf.gt, &leaf.gte],
            |h| Ok(Value::Felt(h.0)),
        )?;
        self.emit(name, ops.into_predicate(None));
        Ok(())
    }

    fn string(&mut self, name: &str, leaf: Option<&StringFilter>) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let ops = Ops::convert(
            &leaf.eq,
            &leaf.in_set,
            &leaf.not_in,
            [&leaf.lt, &leaf.lte, &leaf.gt, &leaf.gte],
            |s| Ok(Value::Text(s.clone())),
        )?;

        self.emit(name, ops.into_predicate(text_pattern(leaf)));
        Ok(())
    }

    fn label(
        &mut self,
        name: &str,
        table: TableId,
        leaf: Option<&LabelFilter>,
    ) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let table = self.tables.get(table);
        let ops = Ops::convert(
            &leaf.eq,
            &leaf.in_set,
            &leaf.not_in,
            [&leaf.lt, &leaf.lte, &leaf.gt, &leaf.gte],
            |label| label_value(table, label),
        )?;

        let pattern = text_pattern(leaf).map(|text| {
            Pattern::OneOf(
                table
                    .codes_where(|label| text.matches(&Value::Text(label.to_string())))
                    .into_iter()
                    .map(|code| Value::Felt(Felt::from_u64(code)))
                    .collect(),
            )
        });

        self.emit(name, ops.into_predicate(pattern));
        Ok(())
    }

    fn datetime(&mut self, name: &str, leaf: Option<&DateTimeFilter>) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let ops = Ops::convert(
            &leaf.eq,
            &leaf.in_set,
            &leaf.not_in,
            [&leaf.lt, &leaf.lte, &leaf.gt, &leaf.gte],
            datetime_value,
        )?;
        self.emit(name, ops.into_predicate(None));
        Ok(())
    }

    fn boolean(&mut self, name: &str, leaf: Option<&BooleanFilter>) -> Result<(), QueryError> {
        let Some(leaf) = leaf else { return Ok(()) };
        let predicate = match leaf.eq {
            Some(flag) => Predicate::Equals(Value::Bool(flag)),
            None => Predicate::Compound(Constraints::default()),
        };
        self.emit(name, predicate);
        Ok(())
    }

    fn nested(&mut self, name: &str, node: Option<&dyn FilterNode>) -> Result<(), QueryError> {
        let Some(node) = node else { return Ok(()) };
        self.path.push(name.to_string());
        let result = node.accept(self);
        self.path.pop();
        result
    }
}

//! Read side: filters, sorting and typed query results.
//!
//! A query is a per-entity filter tree, an ordered sort specification and
//! paging. The [`FilterCompiler`] flattens the tree into a map of dotted
//! paths to predicates, and the [`QueryExecutor`] evaluates that map against
//! the projection store.
//!
//! ```rust,ignore
//! let executor = QueryExecutor::new(projector.store(), &config.tables);
//! let rows = executor.run_json(Collection::Adventurers, r#"{"where": {"level": {"gte": 5}}}"#)?;
//! ```

pub mod compiler;
pub mod executor;
pub mod filter;
pub mod outputs;
pub mod sort;

pub use compiler::{CompiledFilter, Constraints, FilterCompiler, Pattern, Predicate};
pub use executor::{QueryExecutor, QueryInput, Queryable};
pub use filter::{
    AdventurersFilter, BattlesFilter, BeastsFilter, BidFilter, BooleanFilter, DateTimeFilter,
    DiscoveriesFilter, FeltFilter, FilterNode, FilterVisitor, HeistsFilter, HexFilter,
    ItemAttributesFilter, ItemsFilter, LabelFilter, ListingsFilter, StringFilter,
};
pub use outputs::{
    AdventurerOutput, BattleOutput, BeastOutput, BidOutput, DiscoveryOutput, HeistOutput,
    ItemAttributesOutput, ItemOutput, ListingOutput,
};
pub use sort::{Direction, OrderByInput, SortKey, SortSpec};

use thiserror::Error;

use crate::error::Error;

/// Query failure as seen by a client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query itself is malformed; nothing was read
    #[error("Bad input: {0}")]
    BadInput(String),

    /// The projection could not be read
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl QueryError {
    /// Returns true if the caller should fix the query rather than retry
    pub fn is_bad_input(&self) -> bool {
        matches!(self, QueryError::BadInput(_))
    }
}

impl From<Error> for QueryError {
    fn from(err: Error) -> Self {
        if err.is_decode_error() || matches!(err, Error::InvalidLiteral { .. }) {
            QueryError::BadInput(err.to_string())
        } else {
            QueryError::StorageUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::BadInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let bad: QueryError = Error::UnknownLabel {
            table: "race",
            label: "Orc".into(),
        }
        .into();
        assert!(bad.is_bad_input());

        let down: QueryError = Error::Storage("disk gone".into()).into();
        assert_eq!(down, QueryError::StorageUnavailable("Storage error: disk gone".into()));
    }
}

//! Query execution against the projection store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::DEFAULT_QUERY_LIMIT;
use crate::core::tables::EnumTables;
use crate::projection::entities::{
    Adventurer, Battle, Beast, Collection, Discovery, Entity, Heist, Item, Listing,
};
use crate::projection::store::ProjectionStore;
use crate::query::compiler::{CompiledFilter, FilterCompiler};
use crate::query::filter::FilterNode;
use crate::query::sort::SortSpec;
use crate::query::QueryError;
use crate::storage::backend::StorageBackend;

/// An entity that can be queried
pub trait Queryable: Entity {
    /// Filter tree over the entity
    type Filter: FilterNode + DeserializeOwned + Default;
    /// Result record
    type Output: Serialize;

    /// Materialise the result record of a row
    fn to_output(&self, tables: &EnumTables) -> Self::Output;
}

/// A complete query, as read from JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[serde(bound(deserialize = "F: DeserializeOwned + Default"))]
pub struct QueryInput<F> {
    /// Filter tree
    #[serde(rename = "where", default)]
    pub filter: F,
    /// Sort specification
    #[serde(default)]
    pub order_by: SortSpec,
    /// Rows to skip
    pub skip: Option<usize>,
    /// Maximum rows to return
    pub limit: Option<usize>,
    /// Read the state as of a past block
    pub as_of: Option<u64>,
}

impl<F: Default> Default for QueryInput<F> {
    fn default() -> Self {
        Self {
            filter: F::default(),
            order_by: SortSpec::default(),
            skip: None,
            limit: None,
            as_of: None,
        }
    }
}

/// Read-only query engine over a projection store
pub struct QueryExecutor<'a, B: StorageBackend> {
    store: &'a ProjectionStore<B>,
    tables: &'a EnumTables,
    default_limit: usize,
}

impl<'a, B: StorageBackend> QueryExecutor<'a, B> {
    /// Create an executor
    pub fn new(store: &'a ProjectionStore<B>, tables: &'a EnumTables) -> Self {
        Self {
            store,
            tables,
            default_limit: DEFAULT_QUERY_LIMIT,
        }
    }

    /// Override the limit used when a query sets none
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Compile a filter tree with this executor's tables
    pub fn compile(&self, filter: &dyn FilterNode) -> Result<CompiledFilter, QueryError> {
        FilterCompiler::new(self.tables).compile(filter)
    }

    /// Run a compiled filter.
    ///
    /// Matching rows are sorted by a single key, then `skip` rows are dropped
    /// and at most `limit` are returned.
    pub fn execute<E: Queryable>(
        &self,
        filter: &CompiledFilter,
        order_by: &SortSpec,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<E::Output>, QueryError> {
        let key = order_by.select::<E>()?;
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(self.default_limit);

        let mut rows: Vec<E> = self
            .store
            .scan::<E>(filter.validity)
            .map_err(|e| QueryError::StorageUnavailable(e.to_string()))?
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();

        rows.sort_by(|a, b| key.compare(a, b));

        debug!(
            collection = %E::COLLECTION,
            matched = rows.len(),
            sort = %key.field,
            skip,
            limit,
            "query executed"
        );

        Ok(rows
            .iter()
            .skip(skip)
            .take(limit)
            .map(|row| row.to_output(self.tables))
            .collect())
    }

    /// Compile and run a typed query
    pub fn query<E: Queryable>(
        &self,
        input: &QueryInput<E::Filter>,
    ) -> Result<Vec<E::Output>, QueryError> {
        let mut compiled = self.compile(&input.filter)?;
        if let Some(block) = input.as_of {
            compiled = compiled.as_of(block);
        }
        self.execute::<E>(&compiled, &input.order_by, input.skip, input.limit)
    }

    /// Run a query given as JSON and return JSON records
    pub fn run_json(
        &self,
        collection: Collection,
        input: &str,
    ) -> Result<Vec<serde_json::Value>, QueryError> {
        match collection {
            Collection::Adventurers => self.run_typed::<Adventurer>(input),
            Collection::Beasts => self.run_typed::<Beast>(input),
            Collection::Items => self.run_typed::<Item>(input),
            Collection::Tokens => self.run_typed::<Listing>(input),
            Collection::Discoveries => self.run_typed::<Discovery>(input),
            Collection::Battles => self.run_typed::<Battle>(input),
            Collection::Heists => self.run_typed::<Heist>(input),
        }
    }

    fn run_typed<E: Queryable>(&self, input: &str) -> Result<Vec<serde_json::Value>, QueryError> {
        let input: QueryInput<E::Filter> = if input.trim().is_empty() {
            QueryInput::default()
        } else {
            serde_json::from_str(input)?
        };

        self.query::<E>(&input)?
            .iter()
            .map(|record| {
                serde_json::to_value(record).map_err(|e| QueryError::StorageUnavailable(e.to_string()))
            })
            .collect()
    }
}

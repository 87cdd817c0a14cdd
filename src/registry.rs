// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Query registry
//!
//! Keeps one [`AttributeQuery`] per (object, attribute) pair, so dimensions
//! reading different fields of the same structured attribute share one
//! remote sample per cycle.

use std::collections::HashMap;

use log::debug;

use crate::chart::DimensionSlot;
use crate::connection::MBeanServer;
use crate::error::{BridgeError, QueryError};
use crate::expression::AttributeExpression;
use crate::object_name::ObjectName;
use crate::query::AttributeQuery;

/// Result of resolving an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Index of the query in the registry
    pub index: usize,
    /// Whether the query was created (and probed) by this resolution
    pub created: bool,
}

/// Deduplicated queries of one collector, in registration order
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: Vec<AttributeQuery>,
    index: HashMap<(ObjectName, String), usize>,
}

impl QueryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the query reading the expression's attribute
    ///
    /// Only the first resolution of a pair probes the server.
    pub fn resolve(
        &mut self,
        server: &mut dyn MBeanServer,
        object: &ObjectName,
        expression: &AttributeExpression,
    ) -> Result<Resolution, QueryError> {
        let key = (object.clone(), expression.attribute().to_string());
        if let Some(&index) = self.index.get(&key) {
            return Ok(Resolution {
                index,
                created: false,
            });
        }

        let query = AttributeQuery::probe(server, object, expression)?;
        debug!(
            "Created {} query for '{}' of {}",
            query.variant().as_str(),
            query.attribute(),
            object
        );

        let index = self.queries.len();
        self.queries.push(query);
        self.index.insert(key, index);
        Ok(Resolution {
            index,
            created: true,
        })
    }

    /// Resolve the expression and attach a dimension to its query
    ///
    /// A query created for this dimension is discarded again when the
    /// attachment fails, so no query without dimensions is left behind.
    pub fn attach(
        &mut self,
        server: &mut dyn MBeanServer,
        object: &ObjectName,
        expression: &AttributeExpression,
        slot: DimensionSlot,
    ) -> Result<usize, BridgeError> {
        let resolution = self.resolve(server, object, expression)?;

        let attached = match self.queries.get_mut(resolution.index) {
            Some(query) => query.add_dimension(slot, expression, server),
            None => Ok(()),
        };

        if let Err(e) = attached {
            if resolution.created {
                self.discard_last();
            }
            return Err(e);
        }

        Ok(resolution.index)
    }

    fn discard_last(&mut self) {
        if let Some(query) = self.queries.pop() {
            self.index
                .remove(&(query.object().clone(), query.attribute().to_string()));
        }
    }

    /// Query by index
    pub fn get(&self, index: usize) -> Option<&AttributeQuery> {
        self.queries.get(index)
    }

    /// Query reading `attribute` of `object`
    pub fn find(&self, object: &ObjectName, attribute: &str) -> Option<&AttributeQuery> {
        self.index
            .get(&(object.clone(), attribute.to_string()))
            .and_then(|&index| self.queries.get(index))
    }

    /// Queries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeQuery> {
        self.queries.iter()
    }

    /// Mutable queries in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AttributeQuery> {
        self.queries.iter_mut()
    }

    /// Enable every query
    pub fn enable_all(&mut self) {
        for query in &mut self.queries {
            query.set_enabled(true);
        }
    }

    /// Number of enabled queries
    pub fn enabled_count(&self) -> usize {
        self.queries.iter().filter(|q| q.is_enabled()).count()
    }

    /// Number of queries
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the registry holds no query
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

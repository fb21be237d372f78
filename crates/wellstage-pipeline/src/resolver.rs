//! Dependency order resolver
//!
//! Computes the load order from the catalog's reference graph instead of
//! trusting a hand-maintained list. Every reference edge A -> B means B must
//! be loaded before A; the resolver builds the directed graph and returns a
//! topological order, failing loudly on cycles, self-references, and edges
//! that point at undeclared tables.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use wellstage_common::{Result, StageError};

use crate::catalog::Catalog;

/// Linear processing order over the catalog's tables
///
/// For every reference edge A -> B the returned order places B strictly
/// before A. Deterministic for a given catalog declaration.
pub fn ordered_tables(catalog: &Catalog) -> Result<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for table in catalog.tables() {
        let idx = graph.add_node(table.name.clone());
        nodes.insert(table.name.as_str(), idx);
    }

    for table in catalog.tables() {
        let from = nodes[table.name.as_str()];
        for reference in &table.references {
            if reference.table == table.name {
                return Err(StageError::SelfReference(table.name.clone()));
            }
            let to = *nodes.get(reference.table.as_str()).ok_or_else(|| {
                StageError::UnknownReference {
                    table: table.name.clone(),
                    referenced: reference.table.clone(),
                }
            })?;
            // edge: referenced table -> referencing table
            graph.add_edge(to, from, ());
        }
    }

    let sorted = toposort(&graph, None)
        .map_err(|cycle| StageError::CyclicDependency(graph[cycle.node_id()].clone()))?;

    Ok(sorted.into_iter().map(|idx| graph[idx].clone()).collect())
}

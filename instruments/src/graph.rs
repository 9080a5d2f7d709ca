//! Correlation graph
//!
//! Complete directed graph over the catalog stored as an arena of adjacency
//! lists indexed by [`InstrumentId`]. The edge `i -> j` carries instrument
//! `j`'s market correlation, so the graph is not symmetric.

use crate::catalog::Catalog;
use crate::error::{Result, StoreError};
use crate::instrument::InstrumentId;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Directed, weighted edge to another instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub target: InstrumentId,
    pub weight: f64,
}

/// One item of a correlation query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation<'a> {
    pub name: &'a str,
    pub weight: f64,
}

impl Correlation<'_> {
    /// Weight expressed in percent
    pub fn percent(&self) -> f64 {
        self.weight * 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationGraph {
    adjacency: Vec<Vec<Edge>>,
}

impl CorrelationGraph {
    /// Link every instrument to every other one.
    ///
    /// Each adjacency list runs from the highest id down, skipping the
    /// source itself.
    pub fn build(catalog: &Catalog) -> Self {
        let n = catalog.len();
        let weights: Vec<f64> = catalog.iter().map(|inv| inv.market_correlation).collect();

        let adjacency = (0..n)
            .map(|src| {
                (0..n)
                    .rev()
                    .filter(|&dst| dst != src)
                    .map(|dst| Edge {
                        target: InstrumentId(dst),
                        weight: weights[dst],
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self { adjacency }
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Total number of directed edges, N x (N - 1) for a complete graph
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn neighbors(&self, id: InstrumentId) -> Result<&[Edge]> {
        self.adjacency
            .get(id.index())
            .map(Vec::as_slice)
            .ok_or(StoreError::InvalidIndex {
                index: id.index(),
                len: self.adjacency.len(),
            })
    }

    /// Weight of `src -> dst`; `None` for self-loops or unknown ids
    pub fn weight(&self, src: InstrumentId, dst: InstrumentId) -> Option<f64> {
        self.adjacency
            .get(src.index())?
            .iter()
            .find(|edge| edge.target == dst)
            .map(|edge| edge.weight)
    }

    /// Lazily walk the adjacency list of the instrument called `name`.
    ///
    /// Yields N - 1 items, never the instrument itself.
    pub fn correlates_with<'a>(
        &'a self,
        catalog: &'a Catalog,
        name: &str,
    ) -> Result<impl Iterator<Item = Correlation<'a>> + 'a> {
        let id = catalog.find_by_name(name)?.id;
        let edges = self.neighbors(id)?;
        Ok(edges.iter().filter_map(move |edge| {
            catalog.get(edge.target).ok().map(|inv| Correlation {
                name: inv.name.as_str(),
                weight: edge.weight,
            })
        }))
    }

    /// Dense N x N view with a zero diagonal; entry (i, j) is the weight of
    /// `i -> j`
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let n = self.adjacency.len();
        let mut matrix = DMatrix::zeros(n, n);
        for (src, edges) in self.adjacency.iter().enumerate() {
            for edge in edges {
                matrix[(src, edge.target.index())] = edge.weight;
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::instrument::InstrumentRecord;
    use proptest::prelude::*;

    fn catalog(lines: &[&str]) -> Catalog {
        let records: Vec<_> = lines
            .iter()
            .map(|line| InstrumentRecord::from_delimited(line, ','))
            .collect();
        Catalog::load(&records, &CatalogConfig::default()).unwrap()
    }

    fn scenario() -> Catalog {
        catalog(&[
            "A,Bond,100,Low,5,0.1",
            "B,Stock,200,High,12,0.4",
            "C,Stock,150,High,9,0.3",
        ])
    }

    #[test]
    fn test_complete_graph() {
        let catalog = scenario();
        let graph = CorrelationGraph::build(&catalog);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 6);
        for inv in catalog.iter() {
            let edges = graph.neighbors(inv.id).unwrap();
            assert_eq!(edges.len(), 2);
            assert!(edges.iter().all(|e| e.target != inv.id));
        }
    }

    #[test]
    fn test_correlates_with_reverse_id_order() {
        let catalog = scenario();
        let graph = CorrelationGraph::build(&catalog);
        let pairs: Vec<(&str, f64)> = graph
            .correlates_with(&catalog, "A")
            .unwrap()
            .map(|c| (c.name, c.weight))
            .collect();
        assert_eq!(pairs, vec![("C", 0.3), ("B", 0.4)]);
    }

    #[test]
    fn test_correlates_with_unknown_name() {
        let catalog = scenario();
        let graph = CorrelationGraph::build(&catalog);
        assert!(matches!(
            graph.correlates_with(&catalog, "Z"),
            Err(StoreError::NotFound(name)) if name == "Z"
        ));
    }

    #[test]
    fn test_edges_are_asymmetric() {
        let catalog = scenario();
        let graph = CorrelationGraph::build(&catalog);
        let (a, b) = (InstrumentId(0), InstrumentId(1));
        assert_eq!(graph.weight(a, b), Some(0.4));
        assert_eq!(graph.weight(b, a), Some(0.1));
        assert_eq!(graph.weight(a, a), None);
        assert_eq!(graph.weight(a, InstrumentId(9)), None);
        assert!(graph.neighbors(InstrumentId(3)).is_err());
    }

    #[test]
    fn test_matrix_view() {
        let catalog = scenario();
        let matrix = CorrelationGraph::build(&catalog).to_matrix();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix[(0, 0)], 0.0);
        assert_eq!(matrix[(0, 2)], 0.3);
        assert_eq!(matrix[(2, 0)], 0.1);
    }

    #[test]
    fn test_percent() {
        let c = Correlation { name: "A", weight: 0.25 };
        assert_eq!(c.percent(), 25.0);
    }

    #[test]
    fn test_single_and_empty_catalog() {
        let graph = CorrelationGraph::build(&Catalog::default());
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);

        let single = catalog(&["A,Bond,100,Low,5,0.1"]);
        let graph = CorrelationGraph::build(&single);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.correlates_with(&single, "A").unwrap().count(), 0);
    }

    proptest! {
        #[test]
        fn prop_graph_is_complete(n in 1usize..40) {
            let lines: Vec<String> = (0..n)
                .map(|i| format!("I{},Stock,{},Medium,5,0.{}", i, i + 1, i % 10))
                .collect();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let catalog = catalog(&refs);
            let graph = CorrelationGraph::build(&catalog);

            prop_assert_eq!(graph.edge_count(), n * (n - 1));
            for inv in catalog.iter() {
                prop_assert_eq!(graph.correlates_with(&catalog, &inv.name).unwrap().count(), n - 1);
            }
        }
    }
}

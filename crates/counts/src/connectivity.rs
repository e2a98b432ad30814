//! Strongly connected components of the positive-entry graph.

use ndarray::ArrayView2;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::matrix::CountMatrix;

/// Partition of states into strongly connected components.
///
/// Components are sorted by size descending, then by the total count inside
/// the component descending, then by smallest member. Members within a
/// component are ascending. Every state belongs to
/// exactly one component, so `component_of` is a total index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedSets {
    sets: Vec<Vec<usize>>,
    component_of: Vec<usize>,
}

impl ConnectedSets {
    /// Computes the components of the graph with an edge `i -> j` wherever
    /// `matrix[[i, j]] > 0`.
    pub fn from_pattern(matrix: ArrayView2<'_, f64>) -> Self {
        let n = matrix.nrows();
        let mut graph = DiGraph::<(), ()>::with_capacity(n, 0);
        let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();
        for ((i, j), &v) in matrix.indexed_iter() {
            if i != j && v > 0.0 {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }

        let mut weighted: Vec<(Vec<usize>, f64)> = tarjan_scc(&graph)
            .into_iter()
            .map(|scc| {
                let mut members: Vec<usize> = scc.into_iter().map(|ix| ix.index()).collect();
                members.sort_unstable();
                let internal: f64 = members
                    .iter()
                    .flat_map(|&i| members.iter().map(move |&j| (i, j)))
                    .map(|(i, j)| matrix[[i, j]])
                    .sum();
                (members, internal)
            })
            .collect();
        weighted.sort_by(|(a, wa), (b, wb)| {
            b.len()
                .cmp(&a.len())
                .then_with(|| wb.total_cmp(wa))
                .then_with(|| a[0].cmp(&b[0]))
        });
        let sets: Vec<Vec<usize>> = weighted.into_iter().map(|(members, _)| members).collect();

        let mut component_of = vec![0; n];
        for (c, set) in sets.iter().enumerate() {
            for &s in set {
                component_of[s] = c;
            }
        }
        Self { sets, component_of }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if there are no states at all.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns true if all states form a single component.
    pub fn is_connected(&self) -> bool {
        self.sets.len() == 1
    }

    /// The largest component.
    ///
    /// # Panics
    ///
    /// Panics if there are no states; [`CountMatrix`] never has zero states.
    pub fn largest(&self) -> &[usize] {
        &self.sets[0]
    }

    /// The component at rank `index` (0 = largest).
    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.sets.get(index).map(Vec::as_slice)
    }

    /// Rank of the component holding `state`.
    pub fn component_of(&self, state: usize) -> usize {
        self.component_of[state]
    }

    /// Iterates over components, largest first.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.sets.iter().map(Vec::as_slice)
    }

    /// Size of every component, largest first.
    pub fn sizes(&self) -> Vec<usize> {
        self.sets.iter().map(Vec::len).collect()
    }
}

/// Strongly connected components of a count matrix, largest first.
pub fn connected_sets(counts: &CountMatrix) -> ConnectedSets {
    ConnectedSets::from_pattern(counts.as_array())
}

/// Largest strongly connected component of a count matrix.
pub fn largest_connected_set(counts: &CountMatrix) -> Vec<usize> {
    connected_sets(counts).largest().to_vec()
}

/// Returns true if every state can reach every other through positive counts.
pub fn is_connected(counts: &CountMatrix) -> bool {
    connected_sets(counts).is_connected()
}

//! Conversion graph and shortest-cost pathfinding.
//!
//! The graph is small (tens of nodes in practice) so a plain adjacency
//! list plus a linear best-cost table is the right data structure — no
//! need for anything fancier than a BFS with cost memoization. Pick the
//! simplest structure that's provably correct at this scale.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ids::TypeId;

/// A single conversion edge: `from -> to` at an integer `cost` (default 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: TypeId,
    pub to: TypeId,
    pub cost: u32,
}

pub trait ConversionRegistry {
    /// All conversion edges out of `from`.
    fn edges_from(&self, from: TypeId) -> &[Conversion];

    /// Finds the minimum-cost path from `from` to `to`.
    ///
    /// - `from == to` returns an empty path.
    /// - BFS frontier is FIFO; a neighbour is expanded iff unvisited or a
    ///   strictly cheaper cost is found.
    /// - `max_depth`, if given, prunes by path *length* (number of edges),
    ///   not by cost.
    /// - Ties are broken by whichever path was found first (i.e. the
    ///   shorter one, since BFS explores in non-decreasing depth order).
    fn find_best_path(&self, from: TypeId, to: TypeId, max_depth: Option<usize>) -> Option<Vec<Conversion>> {
        if from == to {
            return Some(Vec::new());
        }

        // best_cost[type] = cheapest cost found so far to reach `type`.
        let mut best_cost: std::collections::HashMap<TypeId, u32> = std::collections::HashMap::new();
        let mut best_path: std::collections::HashMap<TypeId, Vec<Conversion>> = std::collections::HashMap::new();
        best_cost.insert(from, 0);
        best_path.insert(from, Vec::new());

        let mut queue: VecDeque<(TypeId, Vec<Conversion>, u32)> = VecDeque::new();
        queue.push_back((from, Vec::new(), 0));

        let mut answer: Option<(u32, Vec<Conversion>)> = None;

        while let Some((node, path_so_far, cost_so_far)) = queue.pop_front() {
            if let Some(max_depth) = max_depth {
                if path_so_far.len() >= max_depth {
                    continue;
                }
            }

            for edge in self.edges_from(node) {
                let new_cost = cost_so_far + edge.cost;
                let is_improvement = match best_cost.get(&edge.to) {
                    None => true,
                    Some(&existing) => new_cost < existing,
                };
                if !is_improvement {
                    continue;
                }
                let mut new_path = path_so_far.clone();
                new_path.push(*edge);

                best_cost.insert(edge.to, new_cost);
                best_path.insert(edge.to, new_path.clone());

                if edge.to == to {
                    let better = match &answer {
                        None => true,
                        Some((best, _)) => new_cost < *best,
                    };
                    if better {
                        answer = Some((new_cost, new_path.clone()));
                    }
                }

                queue.push_back((edge.to, new_path, new_cost));
            }
        }

        answer.map(|(_, path)| path)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConversionRegistry {
    edges: std::collections::HashMap<TypeId, Vec<Conversion>>,
}

impl InMemoryConversionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, from: TypeId, to: TypeId, cost: u32) {
        self.edges.entry(from).or_default().push(Conversion { from, to, cost });
    }
}

impl ConversionRegistry for InMemoryConversionRegistry {
    fn edges_from(&self, from: TypeId) -> &[Conversion] {
        self.edges.get(&from).map_or(&[], |v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u32) -> TypeId {
        TypeId(n)
    }

    #[test]
    fn same_type_is_empty_path() {
        let reg = InMemoryConversionRegistry::new();
        assert_eq!(reg.find_best_path(t(1), t(1), None), Some(Vec::new()));
    }

    #[test]
    fn unreachable_is_none() {
        let reg = InMemoryConversionRegistry::new();
        assert_eq!(reg.find_best_path(t(1), t(2), None), None);
    }

    #[test]
    fn picks_minimum_cost_path_over_shorter_expensive_one() {
        let mut reg = InMemoryConversionRegistry::new();
        // direct edge 1->3 costs 10; 1->2->3 costs 1+1=2.
        reg.register(t(1), t(3), 10);
        reg.register(t(1), t(2), 1);
        reg.register(t(2), t(3), 1);
        let path = reg.find_best_path(t(1), t(3), None).expect("path exists");
        let total: u32 = path.iter().map(|c| c.cost).sum();
        assert_eq!(total, 2);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn max_depth_prunes_by_length_not_cost() {
        let mut reg = InMemoryConversionRegistry::new();
        reg.register(t(1), t(2), 1);
        reg.register(t(2), t(3), 1);
        assert!(reg.find_best_path(t(1), t(3), Some(2)).is_some());
        assert!(reg.find_best_path(t(1), t(3), Some(1)).is_none());
    }
}

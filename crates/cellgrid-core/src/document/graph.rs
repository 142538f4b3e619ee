//! Reverse dependency graph: source cell -> cells whose formulas read it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use cellgrid_engine::engine::CellPos;

use super::cell::Grid;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependencyGraph {
    listeners: HashMap<CellPos, HashSet<CellPos>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the `depends_on` lists stored in the grid.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut graph = Self::new();
        for entry in grid.iter() {
            for source in &entry.value().depends_on {
                graph.add_dependency(*source, *entry.key());
            }
        }
        graph
    }

    /// Record that `listener` reads `source`.
    pub fn add_dependency(&mut self, source: CellPos, listener: CellPos) {
        self.listeners.entry(source).or_default().insert(listener);
    }

    pub fn remove_dependency(&mut self, source: CellPos, listener: CellPos) {
        if let Some(set) = self.listeners.get_mut(&source) {
            set.remove(&listener);
            if set.is_empty() {
                self.listeners.remove(&source);
            }
        }
    }

    /// Drop every edge `listener` had onto `sources`.
    pub fn remove_listener(&mut self, listener: CellPos, sources: &[CellPos]) {
        for source in sources {
            self.remove_dependency(*source, listener);
        }
    }

    /// Direct listeners of `source`.
    pub fn dependents_of(&self, source: &CellPos) -> impl Iterator<Item = &CellPos> + '_ {
        self.listeners.get(source).into_iter().flatten()
    }

    pub fn has_dependents(&self, source: &CellPos) -> bool {
        self.listeners.contains_key(source)
    }

    /// Every cell transitively reading `origin`. `origin` itself is included
    /// only when it lies on a cycle.
    pub fn reachable_from(&self, origin: CellPos) -> BTreeSet<CellPos> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<CellPos> = self.dependents_of(&origin).copied().collect();
        while let Some(pos) = stack.pop() {
            if seen.insert(pos) {
                stack.extend(self.dependents_of(&pos).copied());
            }
        }
        seen
    }

    /// Order `scope` so every cell comes after the cells it reads.
    ///
    /// Only edges inside `scope` count. Returns the ordered cells and the
    /// leftovers that could not be ordered (cycle members and anything fed
    /// by a cycle).
    pub fn topological_order(&self, scope: &BTreeSet<CellPos>) -> (Vec<CellPos>, Vec<CellPos>) {
        let mut in_degree: BTreeMap<CellPos, usize> = scope.iter().map(|p| (*p, 0)).collect();
        for source in scope {
            for listener in self.dependents_of(source) {
                if let Some(d) = in_degree.get_mut(listener) {
                    *d += 1;
                }
            }
        }

        let mut ready: VecDeque<CellPos> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(p, _)| *p)
            .collect();
        let mut order = Vec::with_capacity(scope.len());

        while let Some(pos) = ready.pop_front() {
            order.push(pos);
            let mut next: Vec<CellPos> = self
                .dependents_of(&pos)
                .filter(|l| scope.contains(*l))
                .copied()
                .collect();
            next.sort();
            for listener in next {
                if let Some(d) = in_degree.get_mut(&listener) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(listener);
                    }
                }
            }
        }

        let ordered: HashSet<CellPos> = order.iter().copied().collect();
        let stuck = scope
            .iter()
            .filter(|p| !ordered.contains(*p))
            .copied()
            .collect();
        (order, stuck)
    }

    /// Number of (source, listener) edges.
    pub fn edge_count(&self) -> usize {
        self.listeners.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: usize, col: usize) -> CellPos {
        CellPos::new(row, col)
    }

    #[test]
    fn test_add_and_remove_edges() {
        let mut g = DependencyGraph::new();
        g.add_dependency(p(0, 0), p(0, 1));
        g.add_dependency(p(0, 0), p(0, 1));
        assert_eq!(g.edge_count(), 1);
        g.remove_listener(p(0, 1), &[p(0, 0)]);
        assert!(g.is_empty());
    }

    #[test]
    fn test_reachable_from_follows_chain() {
        let mut g = DependencyGraph::new();
        g.add_dependency(p(0, 0), p(1, 0));
        g.add_dependency(p(1, 0), p(2, 0));
        let reach = g.reachable_from(p(0, 0));
        assert_eq!(reach.into_iter().collect::<Vec<_>>(), vec![p(1, 0), p(2, 0)]);
    }

    #[test]
    fn test_diamond_orders_sink_last() {
        // A1 -> B1, A1 -> C1, B1 -> D1, C1 -> D1
        let mut g = DependencyGraph::new();
        g.add_dependency(p(0, 0), p(0, 1));
        g.add_dependency(p(0, 0), p(0, 2));
        g.add_dependency(p(0, 1), p(0, 3));
        g.add_dependency(p(0, 2), p(0, 3));
        let scope = g.reachable_from(p(0, 0));
        let (order, stuck) = g.topological_order(&scope);
        assert!(stuck.is_empty());
        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&p(0, 3)));
    }

    #[test]
    fn test_cycle_members_are_left_over() {
        let mut g = DependencyGraph::new();
        g.add_dependency(p(0, 0), p(0, 1));
        g.add_dependency(p(0, 1), p(0, 0));
        g.add_dependency(p(0, 1), p(5, 5));
        let mut scope = g.reachable_from(p(0, 0));
        scope.insert(p(0, 0));
        let (order, stuck) = g.topological_order(&scope);
        assert!(order.is_empty());
        assert_eq!(stuck, vec![p(0, 0), p(0, 1), p(5, 5)]);
    }
}

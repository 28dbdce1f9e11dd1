// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::{earth_distance, AStarError, Edge, Graph, PointId};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: PointId,
    cost: f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score).is_eq()
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

fn reconstruct_path(came_from: &HashMap<PointId, PointId>, mut last: PointId) -> Vec<PointId> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    path
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the shortest route between two nodes in the provided graph.
///
/// The great-circle distance to the end node is used as the heuristic. As edge costs
/// are great-circle distances themselves, the heuristic never overestimates,
/// and the first time the end node is taken from the queue its path is optimal.
/// If multiple paths share the optimal cost, which one is returned is unspecified.
///
/// Returns [AStarError::UnknownNode] if either node doesn't exist in the graph,
/// and [AStarError::NoPathFound] if there is no route between the two nodes.
///
/// `step_limit` limits how many nodes may be expanded during the search
/// before returning [AStarError::StepLimitExceeded]. Concluding that no route exists requires
/// expanding all nodes accessible from the start, which is usually very time-consuming
/// on large datasets. The recommended value is [DEFAULT_STEP_LIMIT](crate::DEFAULT_STEP_LIMIT).
pub fn find_route(
    g: &Graph,
    from_id: PointId,
    to_id: PointId,
    step_limit: usize,
) -> Result<Vec<PointId>, AStarError> {
    let to = g.coordinate(to_id).ok_or(AStarError::UnknownNode(to_id))?;
    let from = g
        .coordinate(from_id)
        .ok_or(AStarError::UnknownNode(from_id))?;

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<PointId, PointId> = HashMap::default();
    let mut known_costs: HashMap<PointId, f64> = HashMap::default();
    let mut expanded: HashSet<PointId> = HashSet::default();
    let mut steps: usize = 0;

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
        score: earth_distance(from, to),
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to_id {
            log::trace!("route {from_id} -> {to_id} found after {steps} steps");
            return Ok(reconstruct_path(&came_from, to_id));
        }

        // Contrary to the wikipedia definition, we might keep multiple items in the queue
        // for the same node. Only the first (cheapest) one is expanded.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY)
            || !expanded.insert(item.at)
        {
            continue;
        }

        steps += 1;
        if steps > step_limit {
            return Err(AStarError::StepLimitExceeded);
        }

        for &Edge {
            to: neighbor_id,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            // Graph invariants ensure the neighbor exists
            let Some(neighbor) = g.coordinate(neighbor_id) else {
                continue;
            };

            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost
                >= known_costs
                    .get(&neighbor_id)
                    .cloned()
                    .unwrap_or(f64::INFINITY)
            {
                continue;
            }

            // Push the new item into the queue
            came_from.insert(neighbor_id, item.at);
            known_costs.insert(neighbor_id, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor_id,
                cost: neighbor_cost,
                score: neighbor_cost + earth_distance(neighbor, to),
            });
        }
    }

    log::trace!("no route {from_id} -> {to_id} after {steps} steps");
    Err(AStarError::NoPathFound)
}

/// Computes the total cost of a path, using the cheapest edge between every
/// pair of consecutive nodes. Returns `None` if any two consecutive nodes
/// are not connected. Paths with less than two nodes cost nothing.
pub fn route_cost(g: &Graph, path: &[PointId]) -> Option<f64> {
    path.windows(2).try_fold(0.0, |total, pair| {
        let cost = g.get_edge(pair[0], pair[1]);
        if cost.is_finite() {
            Some(total + cost)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, DEFAULT_STEP_LIMIT};

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    const A: PointId = PointId(1);
    const B: PointId = PointId(2);
    const C: PointId = PointId(3);
    const D: PointId = PointId(4);

    fn line_graph() -> Graph {
        // A(0,0) - B(0,1) - C(0,2)    D(5,5)
        let mut g = Graph::default();
        g.set_node(Point::new(A, 0.0, 0.0));
        g.set_node(Point::new(B, 0.0, 1.0));
        g.set_node(Point::new(C, 0.0, 2.0));
        g.set_node(Point::new(D, 5.0, 5.0));
        g.connect(A, B).unwrap();
        g.connect(B, C).unwrap();
        g
    }

    fn dist(g: &Graph, a: PointId, b: PointId) -> f64 {
        earth_distance(g.coordinate(a).unwrap(), g.coordinate(b).unwrap())
    }

    #[test]
    fn line() {
        let g = line_graph();
        let route = find_route(&g, A, C, DEFAULT_STEP_LIMIT).unwrap();
        assert_eq!(route, vec![A, B, C]);
        assert_almost_eq!(
            route_cost(&g, &route).unwrap(),
            dist(&g, A, B) + dist(&g, B, C)
        );
    }

    #[test]
    fn line_reversed() {
        let g = line_graph();
        assert_eq!(find_route(&g, C, A, DEFAULT_STEP_LIMIT).unwrap(), vec![C, B, A]);
    }

    #[test]
    fn isolated_node() {
        let g = line_graph();
        assert_eq!(
            find_route(&g, A, D, DEFAULT_STEP_LIMIT),
            Err(AStarError::NoPathFound)
        );
        assert_eq!(
            find_route(&g, D, A, DEFAULT_STEP_LIMIT),
            Err(AStarError::NoPathFound)
        );
    }

    #[test]
    fn same_start_and_end() {
        let g = line_graph();
        assert_eq!(find_route(&g, D, D, DEFAULT_STEP_LIMIT).unwrap(), vec![D]);
        assert_eq!(route_cost(&g, &[D]), Some(0.0));
    }

    #[test]
    fn unknown_nodes() {
        let g = line_graph();
        assert_eq!(
            find_route(&g, PointId(42), A, DEFAULT_STEP_LIMIT),
            Err(AStarError::UnknownNode(PointId(42)))
        );
        assert_eq!(
            find_route(&g, A, PointId(43), DEFAULT_STEP_LIMIT),
            Err(AStarError::UnknownNode(PointId(43)))
        );
    }

    #[test]
    fn step_limit() {
        let g = line_graph();
        assert_eq!(find_route(&g, A, C, 1), Err(AStarError::StepLimitExceeded));
        assert_eq!(find_route(&g, A, C, 2).unwrap(), vec![A, B, C]);
    }

    #[test]
    fn prefers_cheaper_detour() {
        //     E
        //    / \
        //   A   C
        //    \ /
        //     F (far off the line)
        let mut g = Graph::default();
        let e = PointId(5);
        let f = PointId(6);
        g.set_node(Point::new(A, 0.0, 0.0));
        g.set_node(Point::new(C, 0.0, 2.0));
        g.set_node(Point::new(e, 0.1, 1.0));
        g.set_node(Point::new(f, -3.0, 1.0));
        g.connect(A, e).unwrap();
        g.connect(e, C).unwrap();
        g.connect(A, f).unwrap();
        g.connect(f, C).unwrap();

        assert_eq!(find_route(&g, A, C, DEFAULT_STEP_LIMIT).unwrap(), vec![A, e, C]);
    }

    #[test]
    fn duplicate_edges() {
        let mut g = line_graph();
        g.connect(A, B).unwrap();
        g.connect(B, A).unwrap();
        let route = find_route(&g, A, C, DEFAULT_STEP_LIMIT).unwrap();
        assert_eq!(route, vec![A, B, C]);
    }

    #[test]
    fn route_cost_disconnected() {
        let g = line_graph();
        assert_eq!(route_cost(&g, &[A, C]), None);
        assert_eq!(route_cost(&g, &[]), Some(0.0));
    }

    /// Tiny deterministic linear congruential generator for building test graphs.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }

        fn unit(&mut self) -> f64 {
            self.next() as f64 / (1u64 << 31) as f64
        }
    }

    fn random_graph(rng: &mut Lcg, nodes: i64, edges: usize) -> Graph {
        let mut g = Graph::default();
        for id in 1..=nodes {
            g.set_node(Point::new(
                PointId(id),
                27.6 + rng.unit() * 0.05,
                85.3 + rng.unit() * 0.05,
            ));
        }
        for _ in 0..edges {
            let a = PointId(1 + rng.below(nodes as u64) as i64);
            let b = PointId(1 + rng.below(nodes as u64) as i64);
            if a != b {
                g.connect(a, b).unwrap();
            }
        }
        g
    }

    /// Finds the cheapest simple path by trying all of them.
    fn brute_force(g: &Graph, from: PointId, to: PointId) -> Option<f64> {
        fn visit(
            g: &Graph,
            at: PointId,
            to: PointId,
            cost: f64,
            seen: &mut HashSet<PointId>,
            best: &mut Option<f64>,
        ) {
            if at == to {
                if best.map_or(true, |b| cost < b) {
                    *best = Some(cost);
                }
                return;
            }
            for edge in g.get_edges(at) {
                if seen.insert(edge.to) {
                    visit(g, edge.to, to, cost + edge.cost, seen, best);
                    seen.remove(&edge.to);
                }
            }
        }

        let mut best = None;
        let mut seen = HashSet::from([from]);
        visit(g, from, to, 0.0, &mut seen, &mut best);
        best
    }

    #[test]
    fn optimal_against_brute_force() {
        let mut rng = Lcg(0x5eed);

        for _ in 0..40 {
            let g = random_graph(&mut rng, 7, 9);
            for from in g.iter().map(|p| p.id) {
                for to in g.iter().map(|p| p.id) {
                    match (brute_force(&g, from, to), find_route(&g, from, to, 1000)) {
                        (Some(expected), Ok(route)) => {
                            assert_eq!(route.first(), Some(&from));
                            assert_eq!(route.last(), Some(&to));
                            assert_almost_eq!(route_cost(&g, &route).unwrap(), expected);
                        }
                        (None, Err(AStarError::NoPathFound)) => {}
                        (expected, got) => {
                            panic!("{from} -> {to}: expected {expected:?}, got {got:?}")
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn parallel_searches_share_graph() {
        let mut rng = Lcg(42);
        let g = random_graph(&mut rng, 60, 150);
        let targets: Vec<PointId> = g.iter().map(|p| p.id).collect();

        let sequential: Vec<_> = targets
            .iter()
            .map(|&to| find_route(&g, PointId(1), to, DEFAULT_STEP_LIMIT))
            .collect();

        let parallel: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = targets
                .chunks(15)
                .map(|chunk| {
                    let g = &g;
                    s.spawn(move || {
                        chunk
                            .iter()
                            .map(|&to| find_route(g, PointId(1), to, DEFAULT_STEP_LIMIT))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn heuristic_is_consistent_with_edges() {
        let mut rng = Lcg(7);
        let g = random_graph(&mut rng, 30, 60);
        let goal = g.coordinate(PointId(1)).unwrap();
        for point in g.iter() {
            let h = earth_distance(point.coordinate(), goal);
            for edge in g.get_edges(point.id) {
                let h_next = earth_distance(g.coordinate(edge.to).unwrap(), goal);
                assert!(h <= edge.cost + h_next + 1e-6);
            }
        }
    }
}

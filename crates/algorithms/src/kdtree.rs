//! 2D k-d tree over point coordinates
//!
//! Answers nearest-neighbour and fixed-radius queries in O(log n) average
//! time. Used to merge coincident samples before interpolation and to find
//! adjacent points when clustering exceedances.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

/// A 2D k-d tree. Query results report indices into the slice it was
/// built from.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    coords: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into `coords`
    point: usize,
    /// 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// One query hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the build slice
    pub index: usize,
    pub distance_sq: f64,
}

impl KdTree {
    /// Build from `(x, y)` coordinates.
    pub fn build(coords: &[(f64, f64)]) -> Self {
        let mut nodes = Vec::with_capacity(coords.len());
        if !coords.is_empty() {
            let mut indices: Vec<usize> = (0..coords.len()).collect();
            build_recursive(coords, &mut indices, 0, &mut nodes);
        }
        Self {
            nodes,
            coords: coords.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Closest point to (qx, qy); equal distances resolve to the lower index.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<Neighbor> {
        self.nearest_beyond(qx, qy, -1.0)
    }

    /// Closest point at a strictly positive distance from (qx, qy).
    ///
    /// Skips points coinciding with the query, so querying at a member of
    /// the tree finds its nearest distinct neighbour.
    pub fn nearest_distinct(&self, qx: f64, qy: f64) -> Option<Neighbor> {
        self.nearest_beyond(qx, qy, 0.0)
    }

    fn nearest_beyond(&self, qx: f64, qy: f64, floor_sq: f64) -> Option<Neighbor> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = Neighbor {
            index: usize::MAX,
            distance_sq: f64::INFINITY,
        };
        self.nearest_recursive(0, qx, qy, floor_sq, &mut best);
        (best.index != usize::MAX).then_some(best)
    }

    /// Every point with distance `<= radius`, sorted by index.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<Neighbor> {
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return Vec::new();
        }
        let mut hits = Vec::new();
        self.radius_recursive(0, qx, qy, radius * radius, &mut hits);
        hits.sort_by_key(|n| n.index);
        hits
    }

    fn offset(&self, node: &KdNode, qx: f64, qy: f64) -> (f64, f64, f64) {
        let (px, py) = self.coords[node.point];
        let dx = qx - px;
        let dy = qy - py;
        let diff = if node.split_dim == 0 { dx } else { dy };
        (dx, dy, diff)
    }

    fn nearest_recursive(&self, node_idx: usize, qx: f64, qy: f64, floor_sq: f64, best: &mut Neighbor) {
        let node = &self.nodes[node_idx];
        let (dx, dy, diff) = self.offset(node, qx, qy);
        let dist_sq = dx * dx + dy * dy;

        let closer = dist_sq < best.distance_sq || (dist_sq == best.distance_sq && node.point < best.index);
        if dist_sq > floor_sq && closer {
            best.index = node.point;
            best.distance_sq = dist_sq;
        }

        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(child) = first {
            self.nearest_recursive(child, qx, qy, floor_sq, best);
        }
        // `<=` so that ties on the far side are still visited
        if diff * diff <= best.distance_sq {
            if let Some(child) = second {
                self.nearest_recursive(child, qx, qy, floor_sq, best);
            }
        }
    }

    fn radius_recursive(&self, node_idx: usize, qx: f64, qy: f64, radius_sq: f64, hits: &mut Vec<Neighbor>) {
        let node = &self.nodes[node_idx];
        let (dx, dy, diff) = self.offset(node, qx, qy);
        let dist_sq = dx * dx + dy * dy;

        if dist_sq <= radius_sq {
            hits.push(Neighbor {
                index: node.point,
                distance_sq: dist_sq,
            });
        }

        // left holds keys <= the split, right holds keys >= the split
        if let Some(left) = node.left {
            if diff < 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(left, qx, qy, radius_sq, hits);
            }
        }
        if let Some(right) = node.right {
            if diff > 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(right, qx, qy, radius_sq, hits);
            }
        }
    }
}

/// Median split on alternating axes. Returns the index of the new node.
fn build_recursive(coords: &[(f64, f64)], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let split_dim = (depth % 2) as u8;
    let key = |i: usize| if split_dim == 0 { coords[i].0 } else { coords[i].1 };
    indices.sort_by(|&a, &b| key(a).total_cmp(&key(b)).then(a.cmp(&b)));

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (lower, rest) = indices.split_at_mut(median);
    let upper = &mut rest[1..];
    if !lower.is_empty() {
        let left = build_recursive(coords, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }
    if !upper.is_empty() {
        let right = build_recursive(coords, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }
    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords() -> Vec<(f64, f64)> {
        vec![
            (2.0, 3.0),
            (5.0, 4.0),
            (9.0, 6.0),
            (4.0, 7.0),
            (8.0, 1.0),
            (7.0, 2.0),
            (1.0, 8.0),
            (6.0, 5.0),
        ]
    }

    fn dist_sq(a: (f64, f64), x: f64, y: f64) -> f64 {
        (a.0 - x).powi(2) + (a.1 - y).powi(2)
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
        assert!(tree.within_radius(0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let pts = coords();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.len(), 8);
        for qx in 0..10 {
            for qy in 0..10 {
                let (qx, qy) = (qx as f64 + 0.5, qy as f64 + 0.5);
                let hit = tree.nearest(qx, qy).unwrap();
                let best = pts.iter().map(|&p| dist_sq(p, qx, qy)).fold(f64::INFINITY, f64::min);
                assert!((hit.distance_sq - best).abs() < 1e-10, "mismatch at ({}, {})", qx, qy);
            }
        }
    }

    #[test]
    fn test_nearest_tie_prefers_lower_index() {
        let tree = KdTree::build(&[(0.0, 0.0), (2.0, 0.0), (1.0, 5.0)]);
        let hit = tree.nearest(1.0, 0.0).unwrap();
        assert_eq!(hit.index, 0);
    }

    #[test]
    fn test_within_radius_matches_brute_force() {
        let mut pts = coords();
        // a row of points makes deep one-sided subtrees
        pts.extend((0..11).map(|i| (i as f64, 0.0)));
        let tree = KdTree::build(&pts);
        for qx in -2..=12 {
            for qy in -2..=10 {
                let (qx, qy) = (qx as f64, qy as f64);
                for radius in [0.0, 0.5, 1.0, 1.5, 2.5, 4.0, 20.0] {
                    let hits: Vec<usize> = tree.within_radius(qx, qy, radius).iter().map(|n| n.index).collect();
                    let expected: Vec<usize> = (0..pts.len())
                        .filter(|&i| dist_sq(pts[i], qx, qy) <= radius * radius)
                        .collect();
                    assert_eq!(hits, expected, "query ({}, {}) radius {}", qx, qy, radius);
                }
            }
        }
    }

    #[test]
    fn test_within_radius_at_row_ends() {
        let row: Vec<(f64, f64)> = (0..11).map(|i| (i as f64, 0.0)).collect();
        let tree = KdTree::build(&row);
        let first: Vec<usize> = tree.within_radius(0.0, 0.0, 1.5).iter().map(|n| n.index).collect();
        assert_eq!(first, vec![0, 1]);
        let last: Vec<usize> = tree.within_radius(10.0, 0.0, 1.5).iter().map(|n| n.index).collect();
        assert_eq!(last, vec![9, 10]);
    }

    #[test]
    fn test_nearest_distinct_skips_coincident() {
        let pts = vec![(1.0, 1.0), (1.0, 1.0), (4.0, 5.0), (1.0, 3.0)];
        let tree = KdTree::build(&pts);
        let hit = tree.nearest_distinct(1.0, 1.0).unwrap();
        assert_eq!(hit.index, 3);
        assert_eq!(hit.distance_sq, 4.0);
        assert!(KdTree::build(&[(2.0, 2.0)]).nearest_distinct(2.0, 2.0).is_none());
        for (i, &(x, y)) in coords().iter().enumerate() {
            let tree = KdTree::build(&coords());
            let hit = tree.nearest_distinct(x, y).unwrap();
            let best = coords()
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &p)| dist_sq(p, x, y))
                .fold(f64::INFINITY, f64::min);
            assert_eq!(hit.distance_sq, best);
        }
    }

    #[test]
    fn test_within_zero_radius_is_exact_match() {
        let tree = KdTree::build(&[(1.0, 1.0), (1.0, 1.0), (2.0, 2.0)]);
        let hits: Vec<usize> = tree.within_radius(1.0, 1.0, 0.0).iter().map(|n| n.index).collect();
        assert_eq!(hits, vec![0, 1]);
    }
}

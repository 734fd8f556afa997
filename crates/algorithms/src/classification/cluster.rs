//! Connected groups of exceeding points and cells
//!
//! Points are adjacent when their Euclidean distance is within the
//! adjacency distance; clusters are the transitive closure (single
//! linkage). Cells are adjacent when they touch by edge or corner.

use ndarray::Array2;

use crate::kdtree::KdTree;

/// Disjoint-set forest with path halving and union by size.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

/// Single-linkage clusters of the flagged points.
///
/// Each cluster lists point indices in ascending order; clusters are
/// ordered by their smallest member.
pub(crate) fn point_clusters(coords: &[(f64, f64)], flagged: &[bool], distance: f64) -> Vec<Vec<usize>> {
    let members: Vec<usize> = (0..coords.len()).filter(|&i| flagged[i]).collect();
    let member_coords: Vec<(f64, f64)> = members.iter().map(|&i| coords[i]).collect();
    let tree = KdTree::build(&member_coords);

    let mut uf = UnionFind::new(members.len());
    for (a, &(x, y)) in member_coords.iter().enumerate() {
        for hit in tree.within_radius(x, y, distance) {
            if hit.index > a {
                uf.union(a, hit.index);
            }
        }
    }

    group_by_root(&mut uf, members.len())
        .into_iter()
        .map(|group| group.into_iter().map(|a| members[a]).collect())
        .collect()
}

/// 8-connected clusters of the `true` cells, in row-major discovery order.
pub(crate) fn cell_clusters(mask: &Array2<bool>) -> Vec<Vec<(usize, usize)>> {
    let (rows, cols) = mask.dim();
    let mut seen = Array2::from_elem((rows, cols), false);
    let mut clusters = Vec::new();
    let mut stack = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            if !mask[[r, c]] || seen[[r, c]] {
                continue;
            }
            let mut cluster = Vec::new();
            seen[[r, c]] = true;
            stack.push((r, c));
            while let Some((cr, cc)) = stack.pop() {
                cluster.push((cr, cc));
                for dr in -1i64..=1 {
                    for dc in -1i64..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = cr as i64 + dr;
                        let nc = cc as i64 + dc;
                        if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if mask[[nr, nc]] && !seen[[nr, nc]] {
                            seen[[nr, nc]] = true;
                            stack.push((nr, nc));
                        }
                    }
                }
            }
            cluster.sort_unstable();
            clusters.push(cluster);
        }
    }
    clusters
}

/// Median distance from each point to its nearest distinct neighbour.
pub(crate) fn median_spacing(coords: &[(f64, f64)]) -> Option<f64> {
    let tree = KdTree::build(coords);
    let mut spacings: Vec<f64> = coords
        .iter()
        .filter_map(|&(x, y)| tree.nearest_distinct(x, y))
        .map(|hit| hit.distance_sq.sqrt())
        .collect();
    if spacings.is_empty() {
        return None;
    }
    spacings.sort_by(f64::total_cmp);
    let mid = spacings.len() / 2;
    Some(if spacings.len() % 2 == 0 {
        (spacings[mid - 1] + spacings[mid]) / 2.0
    } else {
        spacings[mid]
    })
}

fn group_by_root(uf: &mut UnionFind, n: usize) -> Vec<Vec<usize>> {
    let mut slot_of_root = vec![usize::MAX; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = uf.find(i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_point_clusters_single_linkage() {
        // chain 0-1-2 within 1.5, 3 isolated, 4 not flagged but bridging
        let coords = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (10.0, 0.0), (6.0, 0.0)];
        let flagged = vec![true, true, true, true, false];
        let clusters = point_clusters(&coords, &flagged, 1.5);
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_point_clusters_inclusive_distance() {
        let coords = vec![(0.0, 0.0), (2.0, 0.0)];
        assert_eq!(point_clusters(&coords, &[true, true], 2.0), vec![vec![0, 1]]);
        assert_eq!(point_clusters(&coords, &[true, true], 1.9).len(), 2);
    }

    #[test]
    fn test_cell_clusters_diagonal_connects() {
        let mask = array![
            [true, false, false, false],
            [false, true, false, true],
            [false, false, false, true],
        ];
        let clusters = cell_clusters(&mask);
        assert_eq!(clusters, vec![vec![(0, 0), (1, 1)], vec![(1, 3), (2, 3)]]);
    }

    #[test]
    fn test_median_spacing() {
        assert_eq!(median_spacing(&[(0.0, 0.0), (3.0, 4.0), (3.0, 5.0)]), Some(1.0));
        assert_eq!(median_spacing(&[(1.0, 1.0), (1.0, 1.0)]), None);
        assert_eq!(median_spacing(&[]), None);
    }

    #[test]
    fn test_median_spacing_matches_pairwise_scan() {
        let coords: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let t = i as f64;
                ((t * 7.3) % 23.0, (t * 3.1) % 17.0)
            })
            .chain([(0.0, 0.0), (0.0, 0.0)])
            .collect();
        let mut expected: Vec<f64> = coords
            .iter()
            .enumerate()
            .filter_map(|(i, &(x, y))| {
                coords
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &(ox, oy))| (x - ox).powi(2) + (y - oy).powi(2))
                    .filter(|&d| d > 0.0)
                    .reduce(f64::min)
                    .map(f64::sqrt)
            })
            .collect();
        expected.sort_by(f64::total_cmp);
        let mid = expected.len() / 2;
        let median = if expected.len() % 2 == 0 {
            (expected[mid - 1] + expected[mid]) / 2.0
        } else {
            expected[mid]
        };
        assert_eq!(median_spacing(&coords), Some(median));
    }

    #[test]
    fn test_point_clusters_row_with_far_members() {
        // three hot points 1 apart, eight more 10 apart further along the row
        let mut coords = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)];
        coords.extend((1..=8).map(|i| (2.0 + 10.0 * i as f64, 0.0)));
        let flagged = vec![true; coords.len()];
        let clusters = point_clusters(&coords, &flagged, 1.5);
        assert_eq!(clusters[0], vec![0, 1, 2]);
        assert_eq!(clusters.len(), 9);
        assert!(clusters[1..].iter().all(|c| c.len() == 1));
    }
}

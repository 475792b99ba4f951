// In: src/spatial/nearest.rs

//! This module answers "which reference point of the same category is closest
//! to this query point, and how far away is it?".
//!
//! Reference points are partitioned by category and each partition gets a
//! static k-d tree over unit vectors on the sphere. The chord between two unit
//! vectors grows with their central angle, so the Euclidean nearest neighbor is
//! also the great-circle nearest neighbor. The reported distance is recomputed
//! with the haversine formula and scaled by the configured Earth radius.

use hashbrown::HashMap;

use crate::spatial::geometry::{haversine_angle, unit_vector, LonLat};

//==================================================================================
// 1. Static k-d tree
//==================================================================================

/// An implicit k-d tree: `order` is a permutation of point indices arranged so
/// that every sub-slice has its splitting point at the middle.
#[derive(Debug, Clone)]
struct KdTree {
    points: Vec<[f64; 3]>,
    order: Vec<usize>,
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

impl KdTree {
    fn build(points: Vec<[f64; 3]>) -> Self {
        let mut order: Vec<usize> = (0..points.len()).collect();
        Self::build_range(&points, &mut order, 0);
        Self { points, order }
    }

    fn build_range(points: &[[f64; 3]], order: &mut [usize], depth: usize) {
        if order.len() <= 1 {
            return;
        }
        let axis = depth % 3;
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| {
            points[a][axis].total_cmp(&points[b][axis]).then(a.cmp(&b))
        });
        let (left, right) = order.split_at_mut(mid);
        Self::build_range(points, left, depth + 1);
        Self::build_range(points, &mut right[1..], depth + 1);
    }

    /// Index and squared chord of the nearest point. Ties go to the lowest index.
    fn nearest(&self, query: &[f64; 3]) -> Option<(usize, f64)> {
        if self.order.is_empty() {
            return None;
        }
        let mut best = (usize::MAX, f64::INFINITY);
        self.search(&self.order, 0, query, &mut best);
        Some(best)
    }

    fn search(&self, order: &[usize], depth: usize, query: &[f64; 3], best: &mut (usize, f64)) {
        if order.is_empty() {
            return;
        }
        let axis = depth % 3;
        let mid = order.len() / 2;
        let idx = order[mid];
        let point = &self.points[idx];

        let d = distance_sq(point, query);
        if d < best.1 || (d == best.1 && idx < best.0) {
            *best = (idx, d);
        }

        let diff = query[axis] - point[axis];
        let (near, far) = if diff < 0.0 {
            (&order[..mid], &order[mid + 1..])
        } else {
            (&order[mid + 1..], &order[..mid])
        };
        self.search(near, depth + 1, query, best);
        // `<=` keeps equally distant points on the far side in play for the tie-break.
        if diff * diff <= best.1 {
            self.search(far, depth + 1, query, best);
        }
    }
}

//==================================================================================
// 2. Per-category matcher
//==================================================================================

/// The nearest reference point found for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Position of the reference point in the sequence given to [`NearestMatcher::new`].
    pub reference: usize,
    /// Great-circle distance in metres.
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct Partition {
    tree: KdTree,
    members: Vec<(usize, LonLat)>,
}

#[derive(Debug, Clone)]
pub struct NearestMatcher {
    partitions: HashMap<String, Partition>,
    earth_radius: f64,
    max_distance: f64,
}

fn usable(point: Option<LonLat>) -> Option<LonLat> {
    point.filter(|(lon, lat)| lon.is_finite() && lat.is_finite())
}

impl NearestMatcher {
    /// Indexes the reference points, each given as `(category, position)`.
    /// Points without a usable position are left out of every partition.
    pub fn new<'a, I>(references: I, earth_radius: f64, max_distance: f64) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<LonLat>)>,
    {
        let mut grouped: HashMap<String, Vec<(usize, LonLat)>> = HashMap::new();
        let mut skipped = 0usize;
        for (i, (category, point)) in references.into_iter().enumerate() {
            match usable(point) {
                Some(point) => grouped.entry(category.to_string()).or_default().push((i, point)),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::debug!("[NEAREST] {skipped} reference points without a position");
        }

        let partitions = grouped
            .into_iter()
            .map(|(category, members)| {
                let vectors = members
                    .iter()
                    .map(|&(_, (lon, lat))| unit_vector(lat, lon))
                    .collect();
                let tree = KdTree::build(vectors);
                (category, Partition { tree, members })
            })
            .collect();

        Self {
            partitions,
            earth_radius,
            max_distance,
        }
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// The nearest same-category reference point, however far away. `None` when
    /// the category has no reference points or the query has no position.
    pub fn nearest(&self, category: &str, point: Option<LonLat>) -> Option<Nearest> {
        let (lon, lat) = usable(point)?;
        let partition = self.partitions.get(category)?;
        let (local, _) = partition.tree.nearest(&unit_vector(lat, lon))?;
        let (reference, (ref_lon, ref_lat)) = partition.members[local];
        let distance = haversine_angle(lat, lon, ref_lat, ref_lon) * self.earth_radius;
        Some(Nearest {
            reference,
            distance,
        })
    }

    /// Whether a nearest point is close enough to count as a match.
    pub fn accepts(&self, nearest: &Nearest) -> bool {
        nearest.distance <= self.max_distance
    }
}

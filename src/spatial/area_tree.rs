// In: src/spatial/area_tree.rs

//! This module implements the hierarchical point-in-polygon labeler.
//!
//! Areas are stored once in an arena (`Vec<Area>`) and refer to each other by
//! [`AreaId`]. The tree is built from the decoded area dataset on every run and
//! never mutated afterwards: labeling returns a separate `Vec<Option<AreaId>>`
//! keyed by point index.
//!
//! Labeling walks the tree level by level. At each level, every area is tested
//! in order against the points still in the pool; the points it contains leave
//! the pool (first match wins when boundaries overlap) and either descend into
//! the area's children or, for a leaf, are labeled with it. A point inside a
//! parent but inside none of its children stays unlabeled.

use geo::{BoundingRect, Contains, Point, Polygon, Rect};

use crate::error::{AfvalError, Result};
use crate::spatial::geometry::{polygon_from_ring, LonLat};
use crate::types::{Dataset, Record, Value};

/// Position of an area inside its [`AreaTree`].
pub type AreaId = usize;

#[derive(Debug, Clone)]
pub struct Area {
    pub naam: String,
    pub code: String,
    pub ligt_in: String,
    /// 0 for the top level (boroughs), 1 for districts, 2 for neighborhoods.
    pub depth: usize,
    pub parent: Option<AreaId>,
    children: Vec<AreaId>,
    polygon: Polygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl Area {
    pub fn children(&self) -> &[AreaId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn contains(&self, point: &Point<f64>) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        let (min, max) = (bounds.min(), bounds.max());
        if point.x() < min.x || point.x() > max.x || point.y() < min.y || point.y() > max.y {
            return false;
        }
        self.polygon.contains(point)
    }
}

/// Borough, district and neighborhood names for one labeled point. Blank when
/// the point is unlabeled or its leaf sits above that level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaLabels {
    pub stadsdeel: String,
    pub wijk: String,
    pub buurt: String,
}

#[derive(Debug, Clone, Default)]
pub struct AreaTree {
    areas: Vec<Area>,
    roots: Vec<AreaId>,
}

impl AreaTree {
    /// Builds the tree from area records listed per level, top level first.
    ///
    /// Every area below the top level is attached to the first area one level up
    /// whose `naam` equals its `ligt_in`. Areas without such a parent are dropped
    /// with a warning.
    pub fn from_levels(levels: &[&[Record]]) -> Result<Self> {
        let mut tree = AreaTree::default();
        let mut previous: Vec<AreaId> = Vec::new();

        for (depth, records) in levels.iter().enumerate() {
            let mut current = Vec::with_capacity(records.len());
            for record in records.iter() {
                let mut area = parse_area(record, depth)?;

                if depth > 0 {
                    let parent = previous
                        .iter()
                        .copied()
                        .find(|&id| tree.areas[id].naam == area.ligt_in);
                    match parent {
                        Some(parent) => area.parent = Some(parent),
                        None => {
                            log::warn!(
                                "[AREAS] dropping '{}' at depth {}: no parent named '{}'",
                                area.naam,
                                depth,
                                area.ligt_in
                            );
                            continue;
                        }
                    }
                }

                let id = tree.areas.len();
                match area.parent {
                    Some(parent) => tree.areas[parent].children.push(id),
                    None => tree.roots.push(id),
                }
                tree.areas.push(area);
                current.push(id);
            }
            previous = current;
        }

        log::debug!(
            "[AREAS] built tree with {} areas, {} at the top level",
            tree.areas.len(),
            tree.roots.len()
        );
        Ok(tree)
    }

    /// Builds the tree from a decoded area dataset, taking one group per level
    /// in the order given. Groups not named in `levels`, such as the `""`
    /// sentinel group, are ignored.
    pub fn from_dataset(dataset: &Dataset, levels: &[String]) -> Result<Self> {
        let groups: Vec<&[Record]> = levels.iter().map(|level| dataset.group(level)).collect();
        Self::from_levels(&groups)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id]
    }

    pub fn roots(&self) -> &[AreaId] {
        &self.roots
    }

    /// The area itself followed by its parent, grandparent, and so on.
    pub fn ancestors(&self, id: AreaId) -> impl Iterator<Item = &Area> + '_ {
        std::iter::successors(Some(&self.areas[id]), move |area| {
            area.parent.map(|parent| &self.areas[parent])
        })
    }

    /// Labels each point with the leaf area that contains it.
    ///
    /// `None` entries (points without coordinates) and points outside every
    /// leaf come back as `None`.
    pub fn label(&self, points: &[Option<LonLat>]) -> Vec<Option<AreaId>> {
        let mut labels = vec![None; points.len()];
        let pool: Vec<(usize, Point<f64>)> = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|(lon, lat)| (i, Point::new(lon, lat))))
            .collect();

        self.label_within(&self.roots, pool, &mut labels);
        labels
    }

    fn label_within(
        &self,
        ids: &[AreaId],
        mut pool: Vec<(usize, Point<f64>)>,
        labels: &mut [Option<AreaId>],
    ) {
        for &id in ids {
            if pool.is_empty() {
                break;
            }
            let area = &self.areas[id];
            let (inside, rest): (Vec<_>, Vec<_>) =
                pool.into_iter().partition(|(_, point)| area.contains(point));
            pool = rest;

            if area.is_leaf() {
                for (i, _) in inside {
                    labels[i] = Some(id);
                }
            } else if !inside.is_empty() {
                self.label_within(&area.children, inside, labels);
            }
        }
    }

    /// Maps a leaf and its ancestors onto borough/district/neighborhood by depth.
    pub fn labels(&self, id: Option<AreaId>) -> AreaLabels {
        let mut labels = AreaLabels::default();
        let Some(id) = id else {
            return labels;
        };
        for area in self.ancestors(id) {
            let slot = match area.depth {
                0 => &mut labels.stadsdeel,
                1 => &mut labels.wijk,
                2 => &mut labels.buurt,
                _ => continue,
            };
            *slot = area.naam.clone();
        }
        labels
    }
}

fn text(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn coordinates(record: &Record, field: &str, naam: &str) -> Result<Vec<f64>> {
    let Some(list) = record.get(field).and_then(Value::as_list) else {
        return Err(AfvalError::InvalidGeometry(format!(
            "area '{naam}' has no '{field}' ring"
        )));
    };
    list.iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                AfvalError::InvalidGeometry(format!(
                    "area '{naam}' has a non-numeric {field} vertex: {v}"
                ))
            })
        })
        .collect()
}

fn parse_area(record: &Record, depth: usize) -> Result<Area> {
    let naam = match record.get("naam").and_then(Value::as_str) {
        Some(naam) => naam.to_string(),
        None => {
            return Err(AfvalError::SpecMismatch(
                "area record without a 'naam'".to_string(),
            ))
        }
    };
    let lon = coordinates(record, "lon", &naam)?;
    let lat = coordinates(record, "lat", &naam)?;
    let polygon = polygon_from_ring(&lon, &lat)?;
    let bounds = polygon.bounding_rect();

    Ok(Area {
        code: text(record, "code"),
        ligt_in: text(record, "ligt_in"),
        naam,
        depth,
        parent: None,
        children: Vec::new(),
        polygon,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(json: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(json).unwrap()
    }

    fn square(naam: &str, ligt_in: &str, x0: f64, y0: f64, size: f64) -> serde_json::Value {
        json!({
            "naam": naam,
            "code": naam.to_uppercase(),
            "ligt_in": ligt_in,
            "lon": [x0, x0 + size, x0 + size, x0],
            "lat": [y0, y0, y0 + size, y0 + size],
        })
    }

    /// Two boroughs side by side. North has two districts; the western one
    /// has two neighborhoods covering only its lower half.
    fn city() -> AreaTree {
        let stadsdelen = records(json!([
            square("Noord", "", 0.0, 0.0, 10.0),
            square("Zuid", "", 10.0, 0.0, 10.0),
        ]));
        let wijken = records(json!([
            square("West", "Noord", 0.0, 0.0, 5.0),
            square("Oost", "Noord", 5.0, 0.0, 5.0),
            square("Wees", "Nergens", 0.0, 0.0, 5.0),
        ]));
        let buurten = records(json!([
            square("Plein", "West", 0.0, 0.0, 2.5),
            square("Haven", "West", 2.5, 0.0, 2.5),
        ]));
        AreaTree::from_levels(&[&stadsdelen, &wijken, &buurten]).unwrap()
    }

    fn names(tree: &AreaTree, labels: &[Option<AreaId>]) -> Vec<String> {
        labels
            .iter()
            .map(|l| l.map(|id| tree.area(id).naam.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_tree_drops_orphans_and_links_parents() {
        let tree = city();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.roots().len(), 2);
        let noord = tree.area(tree.roots()[0]);
        assert_eq!(noord.children().len(), 2);
        let chain: Vec<&str> = tree.ancestors(4).map(|a| a.naam.as_str()).collect();
        assert_eq!(chain, ["Plein", "West", "Noord"]);
    }

    #[test]
    fn test_label_picks_deepest_leaf() {
        let tree = city();
        let points = [
            Some((1.0, 1.0)),  // Plein
            Some((3.0, 2.0)),  // Haven
            Some((1.0, 4.0)),  // West, but no neighborhood covers it
            Some((7.0, 3.0)),  // Oost, a leaf district
            Some((15.0, 5.0)), // Zuid, a leaf borough
            Some((30.0, 5.0)), // outside the city
            None,
        ];
        let labels = tree.label(&points);
        assert_eq!(
            names(&tree, &labels),
            ["Plein", "Haven", "", "Oost", "Zuid", "", ""]
        );
    }

    #[test]
    fn test_labels_map_ancestors_by_depth() {
        let tree = city();
        let labels = tree.label(&[Some((1.0, 1.0)), Some((7.0, 3.0)), Some((30.0, 0.5))]);
        assert_eq!(
            tree.labels(labels[0]),
            AreaLabels {
                stadsdeel: "Noord".into(),
                wijk: "West".into(),
                buurt: "Plein".into(),
            }
        );
        assert_eq!(
            tree.labels(labels[1]),
            AreaLabels {
                stadsdeel: "Noord".into(),
                wijk: "Oost".into(),
                buurt: String::new(),
            }
        );
        assert_eq!(tree.labels(labels[2]), AreaLabels::default());
    }

    #[test]
    fn test_label_is_independent_of_point_order() {
        let tree = city();
        let forward = [Some((1.0, 1.0)), Some((3.0, 2.0)), Some((7.0, 3.0))];
        let backward = [Some((7.0, 3.0)), Some((3.0, 2.0)), Some((1.0, 1.0))];
        let mut a = names(&tree, &tree.label(&forward));
        let b = names(&tree, &tree.label(&backward));
        a.reverse();
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_overlapping_area_wins() {
        let top = records(json!([
            square("Eerste", "", 0.0, 0.0, 4.0),
            square("Tweede", "", 2.0, 0.0, 4.0),
        ]));
        let tree = AreaTree::from_levels(&[&top]).unwrap();
        let labels = tree.label(&[Some((3.0, 1.0)), Some((5.0, 1.0))]);
        assert_eq!(names(&tree, &labels), ["Eerste", "Tweede"]);
    }

    #[test]
    fn test_from_dataset_ignores_sentinel_group() {
        let ds: Dataset = serde_json::from_value(json!({
            "last_change": null,
            "": [{"naam": "", "code": "", "ligt_in": "", "lon": [], "lat": []}],
            "stadsdelen": [square("Noord", "", 0.0, 0.0, 10.0)],
            "wijken": [square("West", "Noord", 0.0, 0.0, 5.0)],
            "buurten": [],
        }))
        .unwrap();
        let levels: Vec<String> = ["stadsdelen", "wijken", "buurten"].map(String::from).into();
        let tree = AreaTree::from_dataset(&ds, &levels).unwrap();
        assert_eq!(tree.len(), 2);
        let labels = tree.label(&[Some((1.0, 1.0))]);
        assert_eq!(tree.labels(labels[0]).wijk, "West");
    }

    #[test]
    fn test_bad_ring_is_invalid_geometry() {
        let bad = records(json!([{"naam": "X", "lon": [0.0, 1.0], "lat": [0.0, null]}]));
        assert!(matches!(
            AreaTree::from_levels(&[&bad]),
            Err(AfvalError::InvalidGeometry(_))
        ));
    }
}

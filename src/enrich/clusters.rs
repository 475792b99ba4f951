// In: src/enrich/clusters.rs

//! Container-side context for weighing enrichment.
//!
//! Containers standing on the same cluster and holding the same fraction are
//! emptied together, so a weighing is attributed to the whole cluster/fraction
//! group of its nearest container rather than to that single container.

use indexmap::IndexMap;

use crate::config::EnrichmentConfig;
use crate::spatial::{AreaLabels, AreaTree, LonLat, NearestMatcher};
use crate::types::{Record, Value};

/// Aggregates of one `(cluster_id, fractie)` group of containers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFraction {
    pub containers: Vec<String>,
    /// Summed nominal volume.
    pub containervolume: Value,
    /// Summed volume with pressing containers weighted by the press factor.
    pub afvalvolume: Value,
    /// Cluster name and address of the group's first container.
    pub cluster: Value,
    pub adres: Value,
}

/// Reads `(lon, lat)` from a record. `None` unless both are numbers.
pub fn position(record: &Record) -> Option<LonLat> {
    let lon = record.get("lon").and_then(Value::as_f64)?;
    let lat = record.get("lat").and_then(Value::as_f64)?;
    Some((lon, lat))
}

fn field(record: &Record, name: &str) -> Value {
    record.get(name).cloned().unwrap_or_default()
}

fn text(record: &Record, name: &str) -> String {
    match record.get(name) {
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Volumes are emitted as integers when they have no fractional part, so the
/// frequency-ordered index tables do not hold both `5` and `5.0`.
fn volume_value(total: f64) -> Value {
    if total.fract() == 0.0 && total.abs() < i64::MAX as f64 {
        Value::Int(total as i64)
    } else {
        Value::Float(total)
    }
}

/// Groups containers by `(cluster_id, fractie)` in first-seen order. Containers
/// without a volume count as zero.
pub fn cluster_fractions(
    containers: &[Record],
    press_factor: f64,
) -> IndexMap<(Value, Value), ClusterFraction> {
    let mut groups: IndexMap<(Value, Value), Vec<&Record>> = IndexMap::new();
    for container in containers {
        let key = (field(container, "cluster_id"), field(container, "fractie"));
        groups.entry(key).or_default().push(container);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let mut nominal = 0.0;
            let mut pressed = 0.0;
            for c in &members {
                let volume = c.get("volume").and_then(Value::as_f64).unwrap_or(0.0);
                let factor = match c.get("persend") {
                    Some(Value::Bool(true)) => press_factor,
                    _ => 1.0,
                };
                nominal += volume;
                pressed += factor * volume;
            }
            let first = members[0];
            let info = ClusterFraction {
                containers: members.iter().map(|c| text(c, "code")).collect(),
                containervolume: volume_value(nominal),
                afvalvolume: volume_value(pressed),
                cluster: field(first, "cluster"),
                adres: field(first, "adres"),
            };
            (key, info)
        })
        .collect()
}

/// Everything a weighing needs from the container side, built once per run.
#[derive(Debug, Clone)]
pub struct ContainerContext {
    /// Cluster/fraction group of each container, by container position.
    groups: Vec<usize>,
    fractions: Vec<ClusterFraction>,
    /// Area labels of each container, by container position.
    labels: Vec<AreaLabels>,
    matcher: NearestMatcher,
}

/// Outcome counts of one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub matched: usize,
    pub unmatched: usize,
    /// Weighings that received their area labels from their own position.
    pub labeled_by_position: usize,
}

impl ContainerContext {
    pub fn new(containers: &[Record], tree: &AreaTree, config: &EnrichmentConfig) -> Self {
        let table = cluster_fractions(containers, config.press_factor);
        let groups = containers
            .iter()
            .map(|c| {
                let key = (field(c, "cluster_id"), field(c, "fractie"));
                table.get_index_of(&key).unwrap_or_default()
            })
            .collect();
        let fractions = table.into_values().collect();

        let positions: Vec<Option<LonLat>> = containers.iter().map(position).collect();
        let labels = tree
            .label(&positions)
            .into_iter()
            .map(|id| tree.labels(id))
            .collect();

        let categories: Vec<String> = containers.iter().map(|c| text(c, "fractie")).collect();
        let matcher = NearestMatcher::new(
            categories.iter().map(String::as_str).zip(positions.iter().copied()),
            config.earth_radius,
            config.max_distance,
        );

        Self {
            groups,
            fractions,
            labels,
            matcher,
        }
    }

    /// Attaches the nearest same-fraction container's attributes to a weighing.
    /// Returns whether the container was within the cutoff distance.
    pub fn enrich(&self, weighing: &mut Record) -> bool {
        let fractie = text(weighing, "fractie");
        let nearest = self.matcher.nearest(&fractie, position(weighing));

        let afstand = nearest.map_or(Value::Null, |n| Value::Float(n.distance));
        weighing.insert("afstand".into(), afstand);

        match nearest.filter(|n| self.matcher.accepts(n)) {
            Some(n) => {
                let info = &self.fractions[self.groups[n.reference]];
                let labels = &self.labels[n.reference];
                let containers = info.containers.iter().map(|c| Value::from(c.as_str())).collect();
                weighing.insert("containers".into(), Value::List(containers));
                weighing.insert("containervolume".into(), info.containervolume.clone());
                weighing.insert("afvalvolume".into(), info.afvalvolume.clone());
                weighing.insert("cluster".into(), info.cluster.clone());
                weighing.insert("adres".into(), info.adres.clone());
                set_labels(weighing, labels);
                true
            }
            None => {
                weighing.insert("containers".into(), Value::List(Vec::new()));
                weighing.insert("containervolume".into(), Value::Null);
                weighing.insert("afvalvolume".into(), Value::Null);
                weighing.insert("cluster".into(), Value::from(""));
                weighing.insert("adres".into(), Value::from(""));
                set_labels(weighing, &AreaLabels::default());
                false
            }
        }
    }
}

fn set_labels(record: &mut Record, labels: &AreaLabels) {
    record.insert("buurt".into(), Value::from(labels.buurt.as_str()));
    record.insert("wijk".into(), Value::from(labels.wijk.as_str()));
    record.insert("stadsdeel".into(), Value::from(labels.stadsdeel.as_str()));
}

/// Enriches weighings in place: nearest container first, then area labels from
/// the weighing's own position for those still without a borough.
pub fn enrich_weighings(
    weighings: &mut [Record],
    containers: &[Record],
    tree: &AreaTree,
    config: &EnrichmentConfig,
) -> EnrichmentSummary {
    let context = ContainerContext::new(containers, tree, config);
    let mut summary = EnrichmentSummary::default();

    for weighing in weighings.iter_mut() {
        if context.enrich(weighing) {
            summary.matched += 1;
        } else {
            summary.unmatched += 1;
        }
    }

    let bare: Vec<usize> = weighings
        .iter()
        .enumerate()
        .filter(|(_, w)| w.get("stadsdeel").and_then(Value::as_str).unwrap_or("").is_empty())
        .map(|(i, _)| i)
        .collect();
    let positions: Vec<Option<LonLat>> = bare.iter().map(|&i| position(&weighings[i])).collect();
    for (&i, id) in bare.iter().zip(tree.label(&positions)) {
        if id.is_some() {
            set_labels(&mut weighings[i], &tree.labels(id));
            summary.labeled_by_position += 1;
        }
    }

    log::debug!(
        "[WEIGHINGS] {} matched, {} unmatched, {} labeled by position",
        summary.matched,
        summary.unmatched,
        summary.labeled_by_position
    );
    summary
}

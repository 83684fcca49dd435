use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;

/// Trait value of one group member, embedded on the x axis of a 2-D R*-tree.
#[derive(Clone, Debug)]
pub struct TraitLocation {
    /// Index into the caller's trait slice.
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for TraitLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Build an R*-tree over trait values via bulk_load (O(n log n)).
pub fn build_index(traits: &[f64]) -> RTree<TraitLocation> {
    let locations: Vec<TraitLocation> = traits
        .iter()
        .enumerate()
        .map(|(index, &value)| TraitLocation {
            index,
            position: [value, 0.0],
        })
        .collect();
    RTree::bulk_load(locations)
}

/// Visit every index whose trait lies within raw distance `radius` of `center`
/// (excluding `self_index`). With `period = Some(p)` the trait line wraps at `p`.
pub fn for_each_within(
    tree: &RTree<TraitLocation>,
    center: f64,
    radius: f64,
    self_index: usize,
    period: Option<f64>,
    mut visitor: impl FnMut(usize),
) {
    let Some(period) = period else {
        let envelope = AABB::from_corners([center - radius, 0.0], [center + radius, 0.0]);
        for loc in tree.locate_in_envelope(&envelope) {
            if loc.index != self_index && (loc.position[0] - center).abs() <= radius {
                visitor(loc.index);
            }
        }
        return;
    };

    assert!(
        period.is_finite() && period > 0.0,
        "period must be positive and finite"
    );
    let (offsets, len) = wrap_offsets(center, radius, period);

    // Shifted windows are disjoint when the query diameter is shorter than the period.
    if radius * 2.0 < period {
        for &offset in &offsets[..len] {
            let translated = center + offset;
            let envelope =
                AABB::from_corners([translated - radius, 0.0], [translated + radius, 0.0]);
            for loc in tree.locate_in_envelope(&envelope) {
                if loc.index != self_index && (loc.position[0] - translated).abs() <= radius {
                    visitor(loc.index);
                }
            }
        }
        return;
    }

    let mut seen = HashSet::new();
    for &offset in &offsets[..len] {
        let translated = center + offset;
        let envelope = AABB::from_corners([translated - radius, 0.0], [translated + radius, 0.0]);
        for loc in tree.locate_in_envelope(&envelope) {
            if loc.index == self_index {
                continue;
            }
            let delta = wrapped_delta(loc.position[0] - center, period);
            if delta.abs() <= radius && seen.insert(loc.index) {
                visitor(loc.index);
            }
        }
    }
}

fn wrap_offsets(coord: f64, radius: f64, period: f64) -> ([f64; 3], usize) {
    let mut offsets = [0.0; 3];
    let mut len = 1usize;
    if coord < radius {
        offsets[len] = period;
        len += 1;
    }
    if coord + radius >= period {
        offsets[len] = -period;
        len += 1;
    }
    (offsets, len)
}

fn wrapped_delta(delta: f64, period: f64) -> f64 {
    (delta + period / 2.0).rem_euclid(period) - period / 2.0
}

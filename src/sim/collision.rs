//! Static level geometry and the queries the character controller runs on it
//!
//! Only axis-aligned boxes exist. Overlap is strict (touching edges do not
//! overlap) while probes are inclusive (a probe starting on a surface hits
//! it), so a box resting exactly on the floor is grounded but not embedded.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box described by its center and full size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size: size.abs(),
        }
    }

    /// Box spanning two corners
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new((min + max) * 0.5, max - min)
    }

    #[inline]
    pub fn half(&self) -> Vec2 {
        self.size * 0.5
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.half()
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.half()
    }

    /// Interiors intersect (shared edges don't count)
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let delta = (self.center - other.center).abs();
        let reach = self.half() + other.half();
        delta.x < reach.x && delta.y < reach.y
    }

    /// Same box moved to `center`
    #[inline]
    pub fn at(&self, center: Vec2) -> Self {
        Self {
            center,
            size: self.size,
        }
    }

    /// Whether a segment from `origin` along unit `dir` reaches this box
    /// within `max_distance` (slab test, boundaries inclusive)
    pub fn ray_hits(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> bool {
        let min = self.min();
        let max = self.max();
        let mut t_enter = 0.0_f32;
        let mut t_exit = max_distance;

        for axis in 0..2 {
            if dir[axis].abs() < f32::EPSILON {
                // Parallel to this slab: origin must already be inside it
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / dir[axis];
            let mut t0 = (min[axis] - origin[axis]) * inv;
            let mut t1 = (max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// Queries the controller needs from the level
pub trait StaticGeometry {
    /// Does a box of `size` centered at `center` intersect any solid?
    fn overlaps(&self, center: Vec2, size: Vec2) -> bool;

    /// Does a probe from `point` along `dir` hit a solid within `max_distance`?
    fn probe(&self, point: Vec2, dir: Vec2, max_distance: f32) -> bool;
}

/// Handle to a solid, stable for the lifetime of the geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolidId(pub u32);

#[derive(Debug, Clone, PartialEq)]
struct Solid {
    bounds: Aabb,
    /// Disabled solids are skipped by every query (open doors, broken blocks)
    enabled: bool,
}

/// Flat list of level solids
///
/// Solids are never removed, only disabled, so `SolidId`s stay valid and
/// iteration order is stable.
#[derive(Debug, Clone, Default)]
pub struct LevelGeometry {
    solids: Vec<Solid>,
}

impl LevelGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_solid(&mut self, bounds: Aabb) -> SolidId {
        let id = SolidId(self.solids.len() as u32);
        self.solids.push(Solid {
            bounds,
            enabled: true,
        });
        id
    }

    /// Enable or disable a solid; unknown ids are ignored
    pub fn set_enabled(&mut self, id: SolidId, enabled: bool) {
        match self.solids.get_mut(id.0 as usize) {
            Some(solid) => solid.enabled = enabled,
            None => log::warn!("Ignoring toggle of unknown solid {:?}", id),
        }
    }

    pub fn is_enabled(&self, id: SolidId) -> bool {
        self.solids
            .get(id.0 as usize)
            .is_some_and(|solid| solid.enabled)
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }

    fn active(&self) -> impl Iterator<Item = &Aabb> {
        self.solids
            .iter()
            .filter(|solid| solid.enabled)
            .map(|solid| &solid.bounds)
    }
}

impl StaticGeometry for LevelGeometry {
    fn overlaps(&self, center: Vec2, size: Vec2) -> bool {
        let probe = Aabb::new(center, size);
        self.active().any(|bounds| bounds.overlaps(&probe))
    }

    fn probe(&self, point: Vec2, dir: Vec2, max_distance: f32) -> bool {
        self.active()
            .any(|bounds| bounds.ray_hits(point, dir, max_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> Aabb {
        Aabb::from_min_max(Vec2::new(-10.0, -1.0), Vec2::new(10.0, 0.0))
    }

    #[test]
    fn test_aabb_extents() {
        let b = Aabb::new(Vec2::new(1.0, 2.0), Vec2::new(2.0, 4.0));
        assert_eq!(b.min(), Vec2::new(0.0, 0.0));
        assert_eq!(b.max(), Vec2::new(2.0, 4.0));
        assert_eq!(Aabb::from_min_max(b.min(), b.max()), b);
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let player = Aabb::new(Vec2::new(0.0, 0.5), Vec2::ONE);
        assert!(!player.overlaps(&floor()));

        let sunk = player.at(Vec2::new(0.0, 0.49));
        assert!(sunk.overlaps(&floor()));
    }

    #[test]
    fn test_probe_from_surface_hits() {
        let f = floor();
        assert!(f.ray_hits(Vec2::new(0.0, 0.0), Vec2::NEG_Y, 0.1));
        assert!(f.ray_hits(Vec2::new(0.0, 0.05), Vec2::NEG_Y, 0.1));
        assert!(!f.ray_hits(Vec2::new(0.0, 0.2), Vec2::NEG_Y, 0.1));
        // Pointing away
        assert!(!f.ray_hits(Vec2::new(0.0, 0.05), Vec2::Y, 0.1));
        // Beside the box
        assert!(!f.ray_hits(Vec2::new(11.0, 0.05), Vec2::NEG_Y, 0.1));
    }

    #[test]
    fn test_horizontal_probe() {
        let wall = Aabb::from_min_max(Vec2::new(2.0, 0.0), Vec2::new(3.0, 5.0));
        assert!(wall.ray_hits(Vec2::new(1.95, 1.0), Vec2::X, 0.1));
        assert!(!wall.ray_hits(Vec2::new(1.8, 1.0), Vec2::X, 0.1));
        assert!(!wall.ray_hits(Vec2::new(1.95, 6.0), Vec2::X, 0.1));
    }

    #[test]
    fn test_disabled_solid_is_ignored() {
        let mut geometry = LevelGeometry::new();
        let door = geometry.add_solid(Aabb::new(Vec2::ZERO, Vec2::ONE));

        assert!(geometry.overlaps(Vec2::ZERO, Vec2::splat(0.5)));
        assert!(geometry.probe(Vec2::new(-1.0, 0.0), Vec2::X, 1.0));

        geometry.set_enabled(door, false);
        assert!(!geometry.is_enabled(door));
        assert!(!geometry.overlaps(Vec2::ZERO, Vec2::splat(0.5)));
        assert!(!geometry.probe(Vec2::new(-1.0, 0.0), Vec2::X, 1.0));

        geometry.set_enabled(door, true);
        assert!(geometry.overlaps(Vec2::ZERO, Vec2::splat(0.5)));
    }

    #[test]
    fn test_unknown_solid_toggle_is_noop() {
        let mut geometry = LevelGeometry::new();
        geometry.set_enabled(SolidId(7), false);
        assert!(geometry.is_empty());
        assert!(!geometry.is_enabled(SolidId(7)));
    }
}

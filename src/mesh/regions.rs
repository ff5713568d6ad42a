//! Boundary regions of the channel.
//!
//! Regions are fixed at setup. A facet may belong to several regions
//! (for instance a corner facet that satisfies two predicates); which
//! constraint wins is decided by the order of the boundary conditions.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tagged part of the channel boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryRegion {
    /// Left end, x = 0
    Inlet,
    /// Right end, x = length
    Outlet,
    /// Top and bottom wall
    Walls,
    /// Surface of the cylinder
    Obstacle,
}

impl BoundaryRegion {
    /// All regions
    pub const ALL: [BoundaryRegion; 4] = [
        BoundaryRegion::Inlet,
        BoundaryRegion::Outlet,
        BoundaryRegion::Walls,
        BoundaryRegion::Obstacle,
    ];

    fn bit(self) -> u8 {
        match self {
            BoundaryRegion::Inlet => 1,
            BoundaryRegion::Outlet => 1 << 1,
            BoundaryRegion::Walls => 1 << 2,
            BoundaryRegion::Obstacle => 1 << 3,
        }
    }
}

impl fmt::Display for BoundaryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryRegion::Inlet => "inlet",
            BoundaryRegion::Outlet => "outlet",
            BoundaryRegion::Walls => "walls",
            BoundaryRegion::Obstacle => "obstacle",
        };
        write!(f, "{}", name)
    }
}

/// Set of regions attached to one facet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegionMask(u8);

impl RegionMask {
    /// No region
    pub fn empty() -> Self {
        RegionMask(0)
    }

    /// Mask with a single region
    pub fn from_region(region: BoundaryRegion) -> Self {
        RegionMask(region.bit())
    }

    /// Add region
    pub fn insert(&mut self, region: BoundaryRegion) {
        self.0 |= region.bit();
    }

    /// Builder style insert
    pub fn with(mut self, region: BoundaryRegion) -> Self {
        self.insert(region);
        self
    }

    /// Contains region
    pub fn contains(&self, region: BoundaryRegion) -> bool {
        self.0 & region.bit() != 0
    }

    /// No region set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over contained regions
    pub fn iter(&self) -> impl Iterator<Item = BoundaryRegion> + '_ {
        BoundaryRegion::ALL
            .iter()
            .copied()
            .filter(move |r| self.contains(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_insert_contains() {
        let mut mask = RegionMask::empty();
        assert!(mask.is_empty());
        mask.insert(BoundaryRegion::Inlet);
        mask.insert(BoundaryRegion::Walls);
        assert!(mask.contains(BoundaryRegion::Inlet));
        assert!(mask.contains(BoundaryRegion::Walls));
        assert!(!mask.contains(BoundaryRegion::Outlet));
        let regions: Vec<_> = mask.iter().collect();
        assert_eq!(regions, vec![BoundaryRegion::Inlet, BoundaryRegion::Walls]);
    }

    #[test]
    fn test_region_serde_name() {
        let json = serde_json::to_string(&BoundaryRegion::Obstacle).unwrap();
        assert_eq!(json, "\"obstacle\"");
    }
}

//! # Boundary conditions
//!
//! A [`BoundaryConditionSet`] is an ordered list of constraints attached
//! to boundary regions. Conditions are applied in list order; where two
//! regions share a node, the later condition overrides the earlier one.
use crate::error::SetupError;
use crate::fem::gauss_line3;
use crate::field::Quantity;
use crate::mesh::{BoundaryRegion, Mesh};
use crate::space::FunctionSpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parabolic inflow u = 4 U_m y (H - y) / H^2 in x direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InletProfile {
    /// Peak velocity U_m
    pub peak: f64,
    /// Channel height H
    pub height: f64,
}

impl InletProfile {
    /// Velocity at point p
    pub fn value(&self, p: [f64; 2]) -> [f64; 2] {
        let y = p[1];
        [4. * self.peak * y * (self.height - y) / self.height.powi(2), 0.]
    }
}

/// Linear systems a condition is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    /// Tentative velocity and velocity correction
    Velocity,
    /// Pressure correction
    Pressure,
    /// Scalar transport
    Scalar,
}

impl SystemKind {
    /// Systems that solve for `field`
    pub fn of(field: Quantity) -> Self {
        match field {
            Quantity::Velocity => SystemKind::Velocity,
            Quantity::Pressure => SystemKind::Pressure,
            Quantity::Scalar => SystemKind::Scalar,
        }
    }
}

/// Value imposed on a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    /// Scalar value
    Value(f64),
    /// Constant vector
    Vector([f64; 2]),
    /// Parabolic inflow profile
    Parabolic(InletProfile),
    /// Natural condition, releases earlier constraints on the region
    Free,
}

/// One boundary condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    /// Region the condition acts on
    pub region: BoundaryRegion,
    /// Constrained quantity
    pub field: Quantity,
    /// Imposed value
    pub constraint: Constraint,
    /// Systems the condition is applied to
    pub system: SystemKind,
}

/// Ordered boundary conditions of all fields
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditionSet {
    conditions: Vec<BoundaryCondition>,
    inlet_mean: Option<f64>,
}

impl BoundaryConditionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append condition (applied after all present ones)
    pub fn push(&mut self, condition: BoundaryCondition) {
        self.conditions.push(condition);
        self.inlet_mean = None;
    }

    /// Builder style [`BoundaryConditionSet::push`]
    pub fn with(mut self, region: BoundaryRegion, field: Quantity, constraint: Constraint) -> Self {
        self.push(BoundaryCondition {
            region,
            field,
            constraint,
            system: SystemKind::of(field),
        });
        self
    }

    /// Channel flow: no-slip on obstacle (if present) and walls, parabolic
    /// inflow, fixed outlet pressure. The inlet comes last and therefore
    /// owns the inlet corner nodes.
    pub fn channel(profile: InletProfile, outlet_pressure: f64, obstacle: bool) -> Self {
        let mut set = Self::new();
        if obstacle {
            set = set.with(
                BoundaryRegion::Obstacle,
                Quantity::Velocity,
                Constraint::Vector([0., 0.]),
            );
        }
        set.with(
            BoundaryRegion::Walls,
            Quantity::Velocity,
            Constraint::Vector([0., 0.]),
        )
        .with(
            BoundaryRegion::Inlet,
            Quantity::Velocity,
            Constraint::Parabolic(profile),
        )
        .with(
            BoundaryRegion::Outlet,
            Quantity::Pressure,
            Constraint::Value(outlet_pressure),
        )
    }

    /// All conditions in order
    pub fn conditions(&self) -> &[BoundaryCondition] {
        &self.conditions
    }

    /// Conditions of `field` in application order
    pub fn conditions_for(&self, field: Quantity) -> Vec<&BoundaryCondition> {
        self.conditions.iter().filter(|c| c.field == field).collect()
    }

    /// Conditions applied to `system` in application order
    pub fn conditions_of(&self, system: SystemKind) -> Vec<&BoundaryCondition> {
        self.conditions.iter().filter(|c| c.system == system).collect()
    }

    /// Regions left free in `system` (no condition, or the last
    /// condition is [`Constraint::Free`])
    pub fn natural_regions(&self, system: SystemKind) -> Vec<BoundaryRegion> {
        let conditions = self.conditions_of(system);
        BoundaryRegion::ALL
            .iter()
            .copied()
            .filter(|&r| match conditions.iter().rev().find(|c| c.region == r) {
                Some(c) => c.constraint == Constraint::Free,
                None => true,
            })
            .collect()
    }

    /// Remove all conditions of `field` on `region`
    pub fn remove(&mut self, region: BoundaryRegion, field: Quantity) {
        self.conditions
            .retain(|c| !(c.region == region && c.field == field));
        self.inlet_mean = None;
    }

    /// Check the conditions against the tagged mesh and compute the mean
    /// inflow velocity.
    pub fn setup(&mut self, mesh: &Mesh) -> Result<(), SetupError> {
        for c in &self.conditions {
            if mesh.facets_in(c.region).next().is_none() {
                return Err(SetupError::EmptyRegion(c.region.to_string()));
            }
            if c.system != SystemKind::of(c.field) {
                return Err(SetupError::InvalidConfig(format!(
                    "{:?} condition cannot act on the {:?} systems",
                    c.field, c.system
                )));
            }
            let consistent = match (c.field, c.constraint) {
                (_, Constraint::Free) => true,
                (Quantity::Velocity, Constraint::Vector(_))
                | (Quantity::Velocity, Constraint::Parabolic(_)) => true,
                (Quantity::Pressure, Constraint::Value(_))
                | (Quantity::Scalar, Constraint::Value(_)) => true,
                _ => false,
            };
            if !consistent {
                return Err(SetupError::InvalidConfig(format!(
                    "constraint {:?} does not fit field {:?}",
                    c.constraint, c.field
                )));
            }
        }
        self.inlet_mean = self.compute_inlet_mean(mesh);
        Ok(())
    }

    /// Mean inflow velocity over the inlet, available after setup
    pub fn inlet_mean(&self) -> Option<f64> {
        self.inlet_mean
    }

    fn compute_inlet_mean(&self, mesh: &Mesh) -> Option<f64> {
        let (region, profile) = self.conditions.iter().find_map(|c| match c.constraint {
            Constraint::Parabolic(p) => Some((c.region, p)),
            _ => None,
        })?;
        let mut flux = 0.;
        let mut length = 0.;
        for facet in mesh.facets_in(region) {
            let [a, b] = mesh.edges[facet.edge];
            let (pa, pb) = (mesh.vertex(a), mesh.vertex(b));
            let len = mesh.edge_length(facet.edge);
            for (t, w) in gauss_line3().iter() {
                let p = [pa[0] + t * (pb[0] - pa[0]), pa[1] + t * (pb[1] - pa[1])];
                flux += w * len * profile.value(p)[0];
            }
            length += len;
        }
        if length > 0. {
            Some(flux / length)
        } else {
            None
        }
    }

    /// Resolved Dirichlet values (dof, value) of `system` on `space`.
    /// Later conditions override earlier ones node by node.
    pub fn dirichlet_dofs(&self, space: &FunctionSpace, system: SystemKind) -> Vec<(usize, f64)> {
        let mut resolved: BTreeMap<usize, Option<f64>> = BTreeMap::new();
        for c in self.conditions_of(system) {
            for node in space.region_nodes(c.region) {
                let p = space.node_coords(node);
                let values: [Option<f64>; 2] = match c.constraint {
                    Constraint::Value(v) => [Some(v), Some(v)],
                    Constraint::Vector(v) => [Some(v[0]), Some(v[1])],
                    Constraint::Parabolic(profile) => {
                        let v = profile.value(p);
                        [Some(v[0]), Some(v[1])]
                    }
                    Constraint::Free => [None, None],
                };
                for (comp, value) in values.iter().enumerate().take(space.components()) {
                    resolved.insert(space.dof(comp, node), *value);
                }
            }
        }
        resolved
            .into_iter()
            .filter_map(|(dof, v)| v.map(|v| (dof, v)))
            .collect()
    }
}

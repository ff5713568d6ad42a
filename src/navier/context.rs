//! Function spaces and cached cell data of a run
//!
//! Built once before time stepping. Velocity is a P2 vector field,
//! pressure and the transported scalar are P1.
use crate::error::MeshError;
use crate::fem::{CellGeometry, QuadratureRule};
use crate::field::FieldStore;
use crate::mesh::Mesh;
use crate::space::{Degree, FunctionSpace};
use std::sync::Arc;

/// Discretization of the flow problem
#[derive(Debug, Clone)]
pub struct Discretization {
    mesh: Arc<Mesh>,
    velocity: FunctionSpace,
    pressure: FunctionSpace,
    scalar: Option<FunctionSpace>,
    geometry: Vec<CellGeometry>,
    rule: QuadratureRule,
}

impl Discretization {
    /// Build all spaces on `mesh`. Fails on zero-area cells.
    pub fn new(mesh: Arc<Mesh>, transport: bool) -> Result<Self, MeshError> {
        let mut geometry = Vec::with_capacity(mesh.num_cells());
        for cell in 0..mesh.num_cells() {
            let geo = CellGeometry::new(mesh.cell_coords(cell));
            if !(geo.area > 0.) || !geo.area.is_finite() {
                return Err(MeshError::DegenerateCell {
                    cell,
                    area: geo.area,
                });
            }
            geometry.push(geo);
        }
        let velocity = FunctionSpace::new(mesh.clone(), Degree::P2, 2);
        let pressure = FunctionSpace::new(mesh.clone(), Degree::P1, 1);
        let scalar = if transport {
            Some(FunctionSpace::new(mesh.clone(), Degree::P1, 1))
        } else {
            None
        };
        Ok(Self {
            mesh,
            velocity,
            pressure,
            scalar,
            geometry,
            rule: QuadratureRule::triangle_degree5(),
        })
    }

    /// Mesh
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// P2 vector space of the velocity
    pub fn velocity_space(&self) -> &FunctionSpace {
        &self.velocity
    }

    /// P1 space of the pressure
    pub fn pressure_space(&self) -> &FunctionSpace {
        &self.pressure
    }

    /// P1 space of the transported scalar
    pub fn scalar_space(&self) -> Option<&FunctionSpace> {
        self.scalar.as_ref()
    }

    /// Affine geometry of a cell
    pub fn cell(&self, cell: usize) -> &CellGeometry {
        &self.geometry[cell]
    }

    /// Cell quadrature rule
    pub fn rule(&self) -> &QuadratureRule {
        &self.rule
    }

    /// Zero fields of matching sizes
    pub fn allocate_fields(&self, iterate: bool) -> FieldStore {
        FieldStore::new(
            self.velocity.num_dofs(),
            self.pressure.num_dofs(),
            self.scalar.as_ref().map(|s| s.num_dofs()),
            iterate,
        )
    }
}

/// Value of a P1 field at barycentric point `l` of a cell
pub(crate) fn p1_value(local: &[f64; 6], l: &[f64; 3]) -> f64 {
    local[0] * l[0] + local[1] * l[1] + local[2] * l[2]
}

/// Constant gradient of a P1 field on a cell
pub(crate) fn p1_gradient(local: &[f64; 6], geo: &CellGeometry) -> [f64; 2] {
    let mut g = [0.; 2];
    for (v, gl) in local.iter().zip(geo.grad_lambda.iter()) {
        g[0] += v * gl[0];
        g[1] += v * gl[1];
    }
    g
}

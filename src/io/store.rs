//! In-memory samples of the vertex values and their export
use crate::error::Result;
use crate::field::FieldSet;
use crate::mesh::Mesh;
use crate::navier::Discretization;
use ndarray::{Array1, Array2};
use num_traits::ToPrimitive;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Mesh arrays and time samples of u, v and p at the vertices
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    x: Array1<f32>,
    y: Array1<f32>,
    triangles: Array2<usize>,
    u: Vec<Array1<f32>>,
    v: Vec<Array1<f32>>,
    p: Vec<Array1<f32>>,
    steps: Vec<usize>,
}

fn to_f32(values: &Array1<f64>) -> Array1<f32> {
    values.mapv(|x| x.to_f32().unwrap_or(f32::NAN))
}

impl ResultStore {
    /// Empty store for `mesh`
    pub fn new(mesh: &Mesh) -> Self {
        let mut triangles = Array2::zeros((mesh.num_cells(), 3));
        for (c, cell) in mesh.cells.iter().enumerate() {
            for k in 0..3 {
                triangles[[c, k]] = cell[k];
            }
        }
        Self {
            x: to_f32(&mesh.vertices.column(0).to_owned()),
            y: to_f32(&mesh.vertices.column(1).to_owned()),
            triangles,
            ..Self::default()
        }
    }

    /// Record vertex values of the committed `fields` at `step`
    pub fn sample(&mut self, step: usize, ctx: &Discretization, fields: &FieldSet) {
        let vspace = ctx.velocity_space();
        let pspace = ctx.pressure_space();
        self.u.push(to_f32(&vspace.vertex_values(&fields.velocity.v, 0)));
        self.v.push(to_f32(&vspace.vertex_values(&fields.velocity.v, 1)));
        self.p.push(to_f32(&pspace.vertex_values(&fields.pressure.v, 0)));
        self.steps.push(step);
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No samples
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps at which samples were taken
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Samples of velocity-x, shape (samples, vertices)
    pub fn u(&self) -> Array2<f32> {
        stack(&self.u, self.x.len())
    }

    /// Samples of velocity-y
    pub fn v(&self) -> Array2<f32> {
        stack(&self.v, self.x.len())
    }

    /// Samples of pressure
    pub fn p(&self) -> Array2<f32> {
        stack(&self.p, self.x.len())
    }

    /// Vertex coordinates
    pub fn coordinates(&self) -> (&Array1<f32>, &Array1<f32>) {
        (&self.x, &self.y)
    }

    /// Triangle connectivity
    pub fn triangles(&self) -> &Array2<usize> {
        &self.triangles
    }

    /// Write `000000x.json`, `000000y.json`, `000000t.json` and
    /// `{step:06}u.json`, `{step:06}v.json`, `{step:06}p.json` to `dir`.
    pub fn export<P: AsRef<Path>>(&self, dir: P, step: usize) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(6);
        written.push(write_json(dir, &format!("{:06}x.json", 0), &self.x)?);
        written.push(write_json(dir, &format!("{:06}y.json", 0), &self.y)?);
        written.push(write_json(dir, &format!("{:06}t.json", 0), &self.triangles)?);
        written.push(write_json(dir, &format!("{:06}u.json", step), &self.u())?);
        written.push(write_json(dir, &format!("{:06}v.json", step), &self.v())?);
        written.push(write_json(dir, &format!("{:06}p.json", step), &self.p())?);
        log::info!("exported {} samples to {:?}", self.len(), dir);
        Ok(written)
    }
}

fn stack(samples: &[Array1<f32>], n: usize) -> Array2<f32> {
    let mut out = Array2::zeros((samples.len(), n));
    for (mut row, s) in out.outer_iter_mut().zip(samples.iter()) {
        row.assign(s);
    }
    out
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(writer, value)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use std::sync::Arc;

    #[test]
    fn test_sample_and_export() {
        let mesh = Arc::new(Mesh::rectangle(1., 1., 2, 2).unwrap());
        let ctx = Discretization::new(mesh.clone(), false).unwrap();
        let mut store = ResultStore::new(&mesh);
        let mut fields = ctx.allocate_fields(false);
        fields.initialize(
            crate::field::Quantity::Pressure,
            &Array1::from_elem(ctx.pressure_space().num_dofs(), 1.5),
        );
        store.sample(2, &ctx, fields.previous());
        store.sample(4, &ctx, fields.previous());
        assert_eq!(store.len(), 2);
        assert_eq!(store.steps(), &[2, 4]);
        assert_eq!(store.p().shape(), &[2, 9]);
        assert_eq!(store.p()[[1, 4]], 1.5);

        let dir = tempfile::tempdir().unwrap();
        let written = store.export(dir.path(), 4).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "000000x.json",
                "000000y.json",
                "000000t.json",
                "000004u.json",
                "000004v.json",
                "000004p.json"
            ]
        );
        let text = std::fs::read_to_string(dir.path().join("000004p.json")).unwrap();
        let p: Array2<f32> = serde_json::from_str(&text).unwrap();
        assert_eq!(p, store.p());
    }
}

//! VTK XML unstructured grid snapshots
//!
//! Points are the mesh vertices and cells are linear triangles. P2
//! velocity is written at its vertex nodes.
use crate::field::FieldSet;
use crate::navier::Discretization;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// VTK cell type of a linear triangle
const VTK_TRIANGLE: u8 = 5;

struct VtkWriter<W: Write> {
    writer: BufWriter<W>,
    indent: usize,
}

impl<W: Write> VtkWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            indent: 0,
        }
    }

    fn write_indent(&mut self) -> std::io::Result<()> {
        for _ in 0..self.indent {
            write!(self.writer, "  ")?;
        }
        Ok(())
    }

    fn start(&mut self, name: &str, attrs: &[(&str, String)]) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<{}", name)?;
        for (key, value) in attrs {
            write!(self.writer, " {}=\"{}\"", key, value)?;
        }
        writeln!(self.writer, ">")?;
        self.indent += 1;
        Ok(())
    }

    fn end(&mut self, name: &str) -> std::io::Result<()> {
        self.indent -= 1;
        self.write_indent()?;
        writeln!(self.writer, "</{}>", name)
    }

    fn data_array<T: std::fmt::Display>(
        &mut self,
        kind: &str,
        name: &str,
        components: usize,
        data: impl Iterator<Item = T>,
    ) -> std::io::Result<()> {
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"{}\" Name=\"{}\" NumberOfComponents=\"{}\" format=\"ascii\">",
            kind, name, components
        )?;
        self.indent += 1;
        self.write_indent()?;
        for (i, v) in data.enumerate() {
            if i > 0 {
                if i % 6 == 0 {
                    writeln!(self.writer)?;
                    self.write_indent()?;
                } else {
                    write!(self.writer, " ")?;
                }
            }
            write!(self.writer, "{}", v)?;
        }
        writeln!(self.writer)?;
        self.indent -= 1;
        self.write_indent()?;
        writeln!(self.writer, "</DataArray>")
    }
}

/// Write velocity, pressure and (if present) scalar at the vertices
pub fn write_vtu<P: AsRef<Path>>(
    path: P,
    ctx: &Discretization,
    fields: &FieldSet,
    time: f64,
) -> std::io::Result<()> {
    let mesh = ctx.mesh();
    let nv = mesh.num_vertices();
    let vspace = ctx.velocity_space();
    let ux = vspace.vertex_values(&fields.velocity.v, 0);
    let uy = vspace.vertex_values(&fields.velocity.v, 1);
    let p = ctx.pressure_space().vertex_values(&fields.pressure.v, 0);

    let mut w = VtkWriter::new(File::create(path)?);
    writeln!(w.writer, "<?xml version=\"1.0\"?>")?;
    w.start(
        "VTKFile",
        &[
            ("type", "UnstructuredGrid".into()),
            ("version", "0.1".into()),
            ("byte_order", "LittleEndian".into()),
        ],
    )?;
    w.start("UnstructuredGrid", &[])?;
    w.start("FieldData", &[])?;
    w.data_array("Float64", "TIME", 1, std::iter::once(time))?;
    w.end("FieldData")?;
    w.start(
        "Piece",
        &[
            ("NumberOfPoints", nv.to_string()),
            ("NumberOfCells", mesh.num_cells().to_string()),
        ],
    )?;

    w.start("Points", &[])?;
    w.data_array(
        "Float64",
        "Points",
        3,
        (0..nv).flat_map(|i| {
            let p = mesh.vertex(i);
            vec![p[0], p[1], 0.]
        }),
    )?;
    w.end("Points")?;

    w.start("Cells", &[])?;
    w.data_array(
        "Int64",
        "connectivity",
        1,
        mesh.cells.iter().flat_map(|c| c.iter().copied()),
    )?;
    w.data_array("Int64", "offsets", 1, (1..=mesh.num_cells()).map(|c| 3 * c))?;
    w.data_array(
        "UInt8",
        "types",
        1,
        std::iter::repeat(VTK_TRIANGLE).take(mesh.num_cells()),
    )?;
    w.end("Cells")?;

    w.start("PointData", &[("Scalars", "pressure".into())])?;
    w.data_array(
        "Float64",
        "velocity",
        3,
        (0..nv).flat_map(|i| vec![ux[i], uy[i], 0.]),
    )?;
    w.data_array("Float64", "pressure", 1, p.iter().copied())?;
    if let (Some(scalar), Some(space)) = (&fields.scalar, ctx.scalar_space()) {
        let r = space.vertex_values(&scalar.v, 0);
        w.data_array("Float64", "scalar", 1, r.iter().copied())?;
    }
    w.end("PointData")?;

    w.end("Piece")?;
    w.end("UnstructuredGrid")?;
    w.end("VTKFile")?;
    w.writer.flush()
}

/// Write `frame_{step:06}.vtu` into `dir`, creating it if needed
pub fn write_snapshot<P: AsRef<Path>>(
    dir: P,
    step: usize,
    time: f64,
    ctx: &Discretization,
    fields: &FieldSet,
) -> std::io::Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("frame_{:06}.vtu", step));
    write_vtu(&path, ctx, fields, time)?;
    Ok(path)
}

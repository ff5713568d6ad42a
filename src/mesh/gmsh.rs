//! Gmsh mesh import.
//!
//! Reads Gmsh MSH format 2.2 (ASCII). Only 3-node triangles (type 2) are
//! kept, the z coordinate is dropped. Points that no triangle uses, such as
//! the centre point of a circle, are removed before the mesh is built.
use super::channel::ChannelGeometry;
use super::Mesh;
use crate::error::{Error, MeshError};
use ndarray::Array2;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const TRIANGLE: u32 = 2;

/// Read a Gmsh MSH 2.2 file and tag its boundary with `geometry`.
pub fn read_gmsh<P: AsRef<Path>>(path: P, geometry: &ChannelGeometry) -> Result<Mesh, Error> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut mesh = parse_gmsh(reader)?;
    mesh.tag_boundary(|a, b| geometry.classify(a, b));
    Ok(mesh)
}

/// Parse MSH 2.2 text into an untagged mesh
pub fn parse_gmsh<R: BufRead>(reader: R) -> Result<Mesh, Error> {
    let mut lines = reader.lines().enumerate();
    let mut nodes: Option<(Vec<u64>, Vec<[f64; 2]>)> = None;
    let mut triangles: Option<Vec<[u64; 3]>> = None;

    while let Some((_, line)) = lines.next() {
        let line = line?;
        match line.trim() {
            "$MeshFormat" => parse_mesh_format(&mut lines)?,
            "$Nodes" => nodes = Some(parse_nodes(&mut lines)?),
            "$Elements" => triangles = Some(parse_elements(&mut lines)?),
            _ => (),
        }
    }

    let (ids, coords) = nodes.ok_or_else(|| MeshError::MissingSection("$Nodes".into()))?;
    let triangles = triangles.ok_or_else(|| MeshError::MissingSection("$Elements".into()))?;

    let index: HashMap<u64, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut vertices = Array2::zeros((coords.len(), 2));
    for (i, p) in coords.iter().enumerate() {
        vertices[[i, 0]] = p[0];
        vertices[[i, 1]] = p[1];
    }
    let mut cells = Vec::with_capacity(triangles.len());
    for (k, t) in triangles.iter().enumerate() {
        let mut cell = [0usize; 3];
        for (c, id) in cell.iter_mut().zip(t.iter()) {
            *c = *index.get(id).ok_or(MeshError::InvalidIndex {
                cell: k,
                vertex: *id as usize,
                num_vertices: coords.len(),
            })?;
        }
        cells.push(cell);
    }

    let (vertices, cells) = Mesh::prune_orphans(&vertices, &cells);
    Ok(Mesh::new(vertices, cells)?)
}

type Lines<R> = std::iter::Enumerate<std::io::Lines<R>>;

fn next_line<R: BufRead>(lines: &mut Lines<R>, section: &str) -> Result<(usize, String), Error> {
    match lines.next() {
        Some((n, line)) => Ok((n + 1, line?)),
        None => Err(MeshError::MissingSection(section.into()).into()),
    }
}

fn parse_error(line: usize, message: String) -> Error {
    MeshError::Parse { line, message }.into()
}

fn skip_to<R: BufRead>(lines: &mut Lines<R>, end: &str) -> Result<(), Error> {
    loop {
        let (_, line) = next_line(lines, end)?;
        if line.trim() == end {
            return Ok(());
        }
    }
}

fn parse_mesh_format<R: BufRead>(lines: &mut Lines<R>) -> Result<(), Error> {
    let (n, line) = next_line(lines, "$EndMeshFormat")?;
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| parse_error(n, "empty format line".into()))?;
    if !version.starts_with("2.") {
        return Err(MeshError::UnsupportedVersion(version.into()).into());
    }
    if parts.next() != Some("0") {
        return Err(MeshError::UnsupportedVersion(format!("{} (binary)", version)).into());
    }
    skip_to(lines, "$EndMeshFormat")
}

fn parse_count<R: BufRead>(lines: &mut Lines<R>, section: &str) -> Result<usize, Error> {
    let (n, line) = next_line(lines, section)?;
    line.trim()
        .parse()
        .map_err(|_| parse_error(n, format!("invalid count `{}`", line.trim())))
}

fn parse_nodes<R: BufRead>(lines: &mut Lines<R>) -> Result<(Vec<u64>, Vec<[f64; 2]>), Error> {
    let count = parse_count(lines, "$EndNodes")?;
    let mut ids = Vec::with_capacity(count);
    let mut coords = Vec::with_capacity(count);
    for _ in 0..count {
        let (n, line) = next_line(lines, "$EndNodes")?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(parse_error(n, format!("invalid node line `{}`", line)));
        }
        let id = parts[0]
            .parse::<u64>()
            .map_err(|_| parse_error(n, format!("invalid node id `{}`", parts[0])))?;
        let x = parts[1]
            .parse::<f64>()
            .map_err(|_| parse_error(n, format!("invalid x coordinate `{}`", parts[1])))?;
        let y = parts[2]
            .parse::<f64>()
            .map_err(|_| parse_error(n, format!("invalid y coordinate `{}`", parts[2])))?;
        ids.push(id);
        coords.push([x, y]);
    }
    skip_to(lines, "$EndNodes")?;
    Ok((ids, coords))
}

fn parse_elements<R: BufRead>(lines: &mut Lines<R>) -> Result<Vec<[u64; 3]>, Error> {
    let count = parse_count(lines, "$EndElements")?;
    let mut triangles = Vec::new();
    for _ in 0..count {
        let (n, line) = next_line(lines, "$EndElements")?;
        // elem_id elem_type n_tags tag1 ... tagN node1 node2 ...
        let parts: Vec<u64> = line
            .split_whitespace()
            .map(|s| s.parse::<u64>())
            .collect::<Result<_, _>>()
            .map_err(|_| parse_error(n, format!("invalid element line `{}`", line)))?;
        if parts.len() < 3 {
            return Err(parse_error(n, format!("invalid element line `{}`", line)));
        }
        if parts[1] as u32 != TRIANGLE {
            continue;
        }
        let start = 3 + parts[2] as usize;
        if parts.len() < start + 3 {
            return Err(parse_error(n, "triangle needs 3 nodes".into()));
        }
        triangles.push([parts[start], parts[start + 1], parts[start + 2]]);
    }
    skip_to(lines, "$EndElements")?;
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoundaryRegion;
    use std::io::Write;

    const SQUARE: &str = "$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
5
1 0 0 0
2 1 0 0
3 1 1 0
4 0 1 0
9 0.5 0.5 0
$EndNodes
$Elements
4
1 1 2 1 1 1 2
2 15 2 0 1 9
3 2 2 0 1 1 2 3
4 2 2 0 1 1 3 4
$EndElements
";

    #[test]
    fn test_parse_drops_unused_points() {
        let mesh = parse_gmsh(SQUARE.as_bytes()).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_cells(), 2);
        assert_eq!(mesh.facets.len(), 4);
    }

    #[test]
    fn test_read_and_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.msh");
        let mut file = File::create(&path).unwrap();
        file.write_all(SQUARE.as_bytes()).unwrap();

        let geometry = ChannelGeometry {
            length: 1.,
            height: 1.,
            obstacle: false,
            ..ChannelGeometry::default()
        };
        let mesh = read_gmsh(&path, &geometry).unwrap();
        assert_eq!(mesh.facets_in(BoundaryRegion::Inlet).count(), 1);
        assert_eq!(mesh.facets_in(BoundaryRegion::Outlet).count(), 1);
        // one cell high: inlet and outlet facets touch both walls
        assert_eq!(mesh.facets_in(BoundaryRegion::Walls).count(), 4);
    }

    #[test]
    fn test_unsupported_version() {
        let text = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n";
        let err = parse_gmsh(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Mesh(MeshError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_missing_elements() {
        let text = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n1\n1 0 0 0\n$EndNodes\n";
        let err = parse_gmsh(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Mesh(MeshError::MissingSection(_))));
    }
}

use bevy_utils::HashMap;
use glam::Vec3;
use itertools::Itertools;
use tracing::debug;

use crate::mesh::{sector::SectorError, EdgeTag, Face, MeshConstructionError, Neighbor, Sector, StackVec, SubdivisionMesh, Vertex, VertexId, VertexTag};

/// Flat description of a control mesh, as handed over by loaders and primitive generators
#[derive(Copy, Clone, Debug)]
pub struct ControlMesh<'a> {
    pub coordinates: &'a [[f32;3]],
    /// Vertex indices of every face, one face after another
    pub face_indices: &'a [usize],
    pub face_vertex_counts: &'a [usize],
    /// How many entries of `face_vertex_counts` to use
    pub face_count: usize,
    /// One flag per coordinate, 0 smooth, 1 crease, 2 corner. Empty means all smooth.
    pub vertex_flags: &'a [i32],
}

impl<'a> ControlMesh<'a> {
    pub fn new(coordinates:&'a [[f32;3]], face_indices:&'a [usize], face_vertex_counts:&'a [usize]) -> Self {
        Self { coordinates, face_indices, face_vertex_counts, face_count: face_vertex_counts.len(), vertex_flags: &[] }
    }

    #[must_use]
    pub const fn with_vertex_flags(mut self, vertex_flags:&'a [i32]) -> Self {
        self.vertex_flags = vertex_flags;
        self
    }

    #[must_use]
    pub const fn with_face_count(mut self, face_count:usize) -> Self {
        self.face_count = face_count;
        self
    }

    /// Vertex tags read from the flags, smooth where no flags were given
    fn vertex_tags(&self) -> Result<Vec<VertexTag>, MeshConstructionError> {
        if self.vertex_flags.is_empty() {
            return Ok(vec![VertexTag::Smooth; self.coordinates.len()]);
        }
        if self.vertex_flags.len() < self.coordinates.len() {
            return Err(MeshConstructionError::MissingVertexFlags { len: self.vertex_flags.len(), required: self.coordinates.len() });
        }
        self.vertex_flags[..self.coordinates.len()].iter().map(|&flag| VertexTag::try_from(flag)).collect()
    }

    /// Split `face_indices` into one slice per face
    fn polygons(&self) -> Result<Vec<&'a [usize]>, MeshConstructionError> {
        if self.face_count > self.face_vertex_counts.len() {
            return Err(MeshConstructionError::IndexOutOfRange { what: "face count", index: self.face_count, len: self.face_vertex_counts.len() });
        }
        let mut polygons = Vec::with_capacity(self.face_count);
        let mut offset = 0;
        for (face, &count) in self.face_vertex_counts[..self.face_count].iter().enumerate() {
            if count < 3 {
                return Err(MeshConstructionError::NeedPolygons { face, count });
            }
            let Some(polygon) = self.face_indices.get(offset..offset + count) else {
                return Err(MeshConstructionError::IndexOutOfRange { what: "face vertex", index: offset + count, len: self.face_indices.len() });
            };
            if let Some(&index) = polygon.iter().find(|&&index| index >= self.coordinates.len()) {
                return Err(MeshConstructionError::IndexOutOfRange { what: "vertex", index, len: self.coordinates.len() });
            }
            if let Some(&vertex) = polygon.iter().duplicates().next() {
                return Err(MeshConstructionError::DuplicateVertices { face, vertex });
            }
            polygons.push(polygon);
            offset += count;
        }
        Ok(polygons)
    }
}

impl TryFrom<ControlMesh<'_>> for SubdivisionMesh {
    type Error = MeshConstructionError;

    fn try_from(value: ControlMesh<'_>) -> Result<Self, Self::Error> {
        let polygons = value.polygons()?;
        let mut tags = value.vertex_tags()?;

        // (from, to) -> (face, edge)
        let mut edges:HashMap<(usize, usize), (usize, usize)> = HashMap::default();
        for (face, polygon) in polygons.iter().enumerate() {
            for (edge, (&from, &to)) in polygon.iter().circular_tuple_windows().enumerate() {
                if edges.insert((from, to), (face, edge)).is_some() {
                    return Err(if edges.contains_key(&(to, from)) {
                        MeshConstructionError::NonManifold(from, to)
                    } else {
                        MeshConstructionError::WrongWinding(from, to)
                    });
                }
            }
        }

        let mut corners = vec![0usize; value.coordinates.len()];
        let mut boundary = vec![false; value.coordinates.len()];
        for polygon in &polygons {
            for (&from, &to) in polygon.iter().circular_tuple_windows() {
                corners[from] += 1;
                if !edges.contains_key(&(to, from)) {
                    boundary[from] = true;
                    boundary[to] = true;
                }
            }
        }
        for (tag, &on_boundary) in tags.iter_mut().zip(&boundary) {
            if on_boundary && *tag == VertexTag::Smooth {
                *tag = VertexTag::Crease;
            }
        }

        let mut mesh = SubdivisionMesh::new();
        let mut index_to_vertex_map:Vec<Option<VertexId>> = vec![None; value.coordinates.len()];
        let mut face_ids = Vec::with_capacity(polygons.len());
        for polygon in &polygons {
            let vertices:StackVec<VertexId> = polygon.iter().map(|&index| match index_to_vertex_map[index] {
                Some(v) => v,
                None => {
                    let special = tags[index] != VertexTag::Smooth || boundary[index] || corners[index] != 4;
                    let mut vertex = Vertex::new(0, tags[index], special);
                    vertex.set_position(0, Vec3::from_array(value.coordinates[index]));
                    let v = mesh.new_vertex(vertex);
                    index_to_vertex_map[index] = Some(v);
                    v
                }
            }).collect();
            face_ids.push(mesh.new_face(Face::new(vertices, 0)));
        }

        for (face, polygon) in polygons.iter().enumerate() {
            for (edge, (&from, &to)) in polygon.iter().circular_tuple_windows().enumerate() {
                if let Some(&(other, other_edge)) = edges.get(&(to, from)) {
                    mesh[face_ids[face]].neighbors[edge] = Some(Neighbor { face: face_ids[other], edge: other_edge });
                }
            }
        }
        mesh.control_vertices = index_to_vertex_map;
        debug!(faces = polygons.len(), vertices = mesh.vertex_count(), edges = edges.len(), "built control mesh");
        Ok(mesh)
    }
}

/// Build a control mesh from flat arrays. `vertex_flags` may be empty.
pub fn build_control_mesh(coordinates:&[[f32;3]], face_indices:&[usize], face_vertex_counts:&[usize], face_count:usize, vertex_flags:&[i32]) -> Result<SubdivisionMesh, MeshConstructionError> {
    ControlMesh::new(coordinates, face_indices, face_vertex_counts)
        .with_face_count(face_count)
        .with_vertex_flags(vertex_flags)
        .try_into()
}

impl SubdivisionMesh {
    /// Declare a sector on corner `vertex` of control face `face`, replacing any earlier one
    pub fn add_sector(&mut self, face:usize, vertex:usize, sector:Sector) -> Result<(), SectorError> {
        let face_id = self.editable_face(face, vertex)?;
        let pivot = self[face_id].vertex(vertex);
        let sector = sector.validated(self[pivot].tag())?;
        self[face_id].sectors[vertex] = Some(sector);
        self[pivot].special = true;
        Ok(())
    }

    /// Remove the sector on corner `vertex` of control face `face`, returning it if there was one
    pub fn remove_sector(&mut self, face:usize, vertex:usize) -> Result<Option<Sector>, SectorError> {
        let face_id = self.editable_face(face, vertex)?;
        Ok(self[face_id].sectors[vertex].take())
    }

    /// Tag the control edge between control vertices `a` and `b` as a crease, on both of its faces
    pub fn tag_edge(&mut self, a:usize, b:usize) -> Result<(), SectorError> {
        if self.is_refined() {
            return Err(SectorError::AlreadySubdivided);
        }
        let (Some(va), Some(vb)) = (self.control_vertex(a), self.control_vertex(b)) else {
            return Err(SectorError::UnknownEdge(a, b));
        };
        let mut found = false;
        for face in self.faces_at_depth(0).to_vec() {
            let f = &mut self[face];
            for edge in 0..f.vertex_count() {
                let ends = (f.vertex(edge), f.vertex(f.next(edge)));
                if ends == (va, vb) || ends == (vb, va) {
                    f.edge_tags[edge] = EdgeTag::Crease;
                    found = true;
                }
            }
        }
        if found { Ok(()) } else { Err(SectorError::UnknownEdge(a, b)) }
    }

    fn editable_face(&self, face:usize, vertex:usize) -> Result<crate::mesh::FaceId, SectorError> {
        if self.is_refined() {
            return Err(SectorError::AlreadySubdivided);
        }
        let face_id = self.control_face(face).ok_or(SectorError::UnknownFace(face))?;
        let count = self[face_id].vertex_count();
        if vertex >= count {
            return Err(SectorError::VertexOutOfRange { face, vertex, count });
        }
        Ok(face_id)
    }
}

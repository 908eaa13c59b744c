use glam::Vec3;
use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;
use thiserror::Error;

pub mod sector;
pub mod traversal;
pub mod vertex_ops;
pub mod edge_ops;
pub mod face_ops;
pub mod mesh_ops;

pub use sector::{Sector, SectorError, SectorTag};
pub use traversal::{Ring, RingFace, TraversalError, TraversalErrorKind, TraversalResult};

use crate::OPTIMIZE_FOR_NGONS_UNDER_SIZE;

pub type StackVec<T> = SmallVec<[T;OPTIMIZE_FOR_NGONS_UNDER_SIZE]>;

#[derive(Copy, Clone, PartialEq, Eq)]
/// A single position on a mesh. A vertex, the n-th edge of a face, or a face
pub enum MeshPosition{
    Vertex(VertexId),
    Edge(FaceId, usize),
    Face(FaceId)
}

slotmap::new_key_type! {
    /// Index of a given [`Vertex`] in the vertex arena
    pub struct VertexId;
}
slotmap::new_key_type! {
    /// Index of a given [`Face`] in the face arena
    pub struct FaceId;
}

impl std::fmt::Debug for MeshPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex(arg0) => f.write_fmt(format_args!("{:?}", arg0)),
            Self::Edge(arg0, arg1) => f.write_fmt(format_args!("{:?}#{}", arg0, arg1)),
            Self::Face(arg0) => f.write_fmt(format_args!("{:?}", arg0)),
        }
    }
}

impl MeshPosition {
    pub fn is_valid(&self, mesh:&SubdivisionMesh) -> bool {
        match self {
            &MeshPosition::Vertex(vertex_id) => mesh.vertices.contains_key(vertex_id),
            &MeshPosition::Edge(face_id, edge) => mesh.faces.get(face_id).is_some_and(|face| edge < face.vertex_count()),
            &MeshPosition::Face(face_id) => mesh.faces.contains_key(face_id),
        }
    }
}

impl From<VertexId> for MeshPosition {
    #[inline]
    fn from(value: VertexId) -> Self {
        Self::Vertex(value)
    }
}

impl From<FaceId> for MeshPosition {
    #[inline]
    fn from(value: FaceId) -> Self {
        Self::Face(value)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
/// How a vertex takes part in the piecewise-smooth surface.
pub enum VertexTag {
    #[default]
    Smooth,
    /// Lies on a crease curve, or on the mesh boundary
    Crease,
    /// Joins crease curves at a sharp corner
    Corner,
}

impl TryFrom<i32> for VertexTag {
    type Error = MeshConstructionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Smooth),
            1 => Ok(Self::Crease),
            2 => Ok(Self::Corner),
            other => Err(MeshConstructionError::UnknownVertexFlag(other)),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeTag {
    #[default]
    Untagged,
    Crease,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Face on the other side of an edge, and the index of that same edge in the neighbor's numbering
pub struct Neighbor {
    pub face: FaceId,
    pub edge: usize,
}

#[derive(Debug, Clone, Default)]
/// Vertex keeps its position at every depth since the level that created it.
/// `positions[0]` is the position at `creation_depth`.
pub struct Vertex {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) creation_depth: usize,
    pub(crate) tag: VertexTag,
    /// Needs ring based rules instead of the regular Catmull-Clark masks
    pub(crate) special: bool,
    pub(crate) normal: Option<Vec3>,
    pub(crate) secondary_normal: Option<Vec3>,
    pub(crate) limit: Option<Vec3>,
}

impl Vertex {
    pub(crate) fn new(creation_depth:usize, tag:VertexTag, special:bool) -> Self {
        Self { creation_depth, tag, special, ..Default::default() }
    }

    pub fn tag(&self) -> VertexTag {
        self.tag
    }

    pub fn is_special(&self) -> bool {
        self.special
    }

    pub fn creation_depth(&self) -> usize {
        self.creation_depth
    }

    /// Position at a given depth, if it was computed
    pub fn position(&self, depth:usize) -> Option<Vec3> {
        depth.checked_sub(self.creation_depth).and_then(|offset| self.positions.get(offset).copied())
    }

    #[inline]
    pub fn has_position(&self, depth:usize) -> bool {
        self.position(depth).is_some()
    }

    /// Deepest level with a computed position
    pub fn depth(&self) -> Option<usize> {
        self.positions.len().checked_sub(1).map(|offset| offset + self.creation_depth)
    }

    /// Positions are appended one depth at a time. Writing an already computed depth overwrites it.
    pub(crate) fn set_position(&mut self, depth:usize, position:Vec3) {
        let offset = depth - self.creation_depth;
        debug_assert!(offset <= self.positions.len(), "Position history can't skip levels");
        if offset == self.positions.len() {
            self.positions.push(position);
        } else {
            self.positions[offset] = position;
        }
    }

    /// Limit surface normal. For crease and corner vertices this is the normal of the first sector visited.
    pub fn normal(&self) -> Option<Vec3> {
        self.normal
    }

    /// Normal of the sector on the other side of a crease
    pub fn secondary_normal(&self) -> Option<Vec3> {
        self.secondary_normal
    }

    pub fn limit_position(&self) -> Option<Vec3> {
        self.limit
    }
}

#[derive(Debug, Clone)]
/// A polygon at some refinement depth. Local edge `i` goes from `vertices[i]` to `vertices[i+1]`.
pub struct Face {
    pub(crate) vertices: StackVec<VertexId>,
    pub(crate) neighbors: StackVec<Option<Neighbor>>,
    pub(crate) edge_tags: StackVec<EdgeTag>,
    pub(crate) sectors: StackVec<Option<Sector>>,
    pub(crate) children: Option<StackVec<FaceId>>,
    pub(crate) center: Option<VertexId>,
    pub(crate) depth: usize,
}

impl Face {
    pub(crate) fn new(vertices:StackVec<VertexId>, depth:usize) -> Self {
        let count = vertices.len();
        Self {
            vertices,
            neighbors: smallvec::smallvec![None; count],
            edge_tags: smallvec::smallvec![EdgeTag::Untagged; count],
            sectors: smallvec::smallvec![None; count],
            children: None,
            center: None,
            depth,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    #[inline]
    pub fn vertex(&self, corner:usize) -> VertexId {
        self.vertices[corner]
    }

    #[inline]
    pub fn next(&self, corner:usize) -> usize {
        (corner + 1) % self.vertices.len()
    }

    #[inline]
    pub fn prev(&self, corner:usize) -> usize {
        (corner + self.vertices.len() - 1) % self.vertices.len()
    }

    /// Local index of a vertex in this face
    pub fn corner_of(&self, vertex:VertexId) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    #[inline]
    pub fn neighbor(&self, edge:usize) -> Option<Neighbor> {
        self.neighbors[edge]
    }

    #[inline]
    pub fn edge_tag(&self, edge:usize) -> EdgeTag {
        self.edge_tags[edge]
    }

    #[inline]
    pub fn is_boundary_edge(&self, edge:usize) -> bool {
        self.neighbors[edge].is_none()
    }

    /// Boundary edges behave like crease edges
    #[inline]
    pub fn is_tagged_edge(&self, edge:usize) -> bool {
        self.is_boundary_edge(edge) || self.edge_tags[edge] != EdgeTag::Untagged
    }

    pub fn sector(&self, corner:usize) -> Option<&Sector> {
        self.sectors[corner].as_ref()
    }

    /// Child faces, one per corner, in corner order
    pub fn children(&self) -> Option<&[FaceId]> {
        self.children.as_deref()
    }

    pub fn center(&self) -> Option<VertexId> {
        self.center
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum MeshConstructionError{
    #[error("face {face} has {count} vertices, polygons need at least 3")]
    NeedPolygons{ face:usize, count:usize },
    #[error("face {face} references vertex {vertex} more than once")]
    DuplicateVertices{ face:usize, vertex:usize },
    #[error("{what} index {index} is out of range for length {len}")]
    IndexOutOfRange{ what:&'static str, index:usize, len:usize },

    /// Manifold is when each edge is contained in at most two polygons (or one polygon if it is on the boundary).
    /// NonManifold is when one edge is in more than two polygons
    #[error("edge {0}-{1} is shared by more than two faces")]
    NonManifold(usize, usize),
    /// Two faces walk their shared edge in the same direction
    #[error("faces sharing edge {0}-{1} disagree on winding")]
    WrongWinding(usize, usize),
    #[error("vertex flags cover {len} of {required} vertices")]
    MissingVertexFlags{ len:usize, required:usize },
    #[error("unknown vertex flag {0}")]
    UnknownVertexFlag(i32),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Flat snapshot of one refinement level
pub struct LevelMesh {
    pub positions: Vec<Vec3>,
    pub face_vertex_counts: Vec<usize>,
    pub face_indices: Vec<usize>,
}

#[derive(Debug, Clone)]
/// Face hierarchy of a subdivision surface. Level 0 holds the control faces in input order,
/// every deeper level holds the children of the level above.
pub struct SubdivisionMesh {
    vertices: SlotMap<VertexId, Vertex>,
    faces: SlotMap<FaceId, Face>,
    levels: Vec<Vec<FaceId>>,
    /// Deepest level whose positions are all computed
    pub(crate) computed: usize,
    pub(crate) control_vertices: Vec<Option<VertexId>>,
}

macro_rules! index_mesh_with {
    ($id_type:ty, $output_type:ty, $property:ident) => {
        impl std::ops::Index<$id_type> for SubdivisionMesh {
            type Output = $output_type;

            fn index(&self, index: $id_type) -> &Self::Output {
                match self.$property.get(index) {
                    Some(value) => value,
                    None => panic!("Broken {} pointer while reading a mesh.", stringify!($id_type)),
                }
            }
        }

        impl std::ops::IndexMut<$id_type> for SubdivisionMesh {
            fn index_mut(&mut self, index: $id_type) -> &mut Self::Output {
                match self.$property.get_mut(index) {
                    Some(value) => value,
                    None => panic!("Broken {} pointer while writing a mesh.", stringify!($id_type)),
                }
            }
        }
    };
}

index_mesh_with!(VertexId, Vertex, vertices);
index_mesh_with!(FaceId, Face, faces);

impl Default for SubdivisionMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl SubdivisionMesh {
    pub fn new() -> Self {
        Self{
            vertices: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            levels: vec![Vec::new()],
            computed: 0,
            control_vertices: Vec::new(),
        }
    }

    pub(crate) fn new_vertex(&mut self, vertex:Vertex) -> VertexId {
        self.vertices.insert(vertex)
    }

    /// Insert a face and register it with its level
    pub(crate) fn new_face(&mut self, face:Face) -> FaceId {
        let depth = face.depth;
        let face_id = self.faces.insert(face);
        if self.levels.len() <= depth {
            self.levels.resize_with(depth + 1, Vec::new);
        }
        self.levels[depth].push(face_id);
        face_id
    }

    /// Deepest fully computed level
    pub fn depth(&self) -> usize {
        self.computed
    }

    /// Whether any face has children yet, even if their level wasn't finished
    pub(crate) fn is_refined(&self) -> bool {
        self.levels.len() > 1
    }

    pub fn faces_at_depth(&self, depth:usize) -> &[FaceId] {
        self.levels.get(depth).map_or(&[], |faces| faces.as_slice())
    }

    /// Face by its index in the control mesh input
    pub fn control_face(&self, index:usize) -> Option<FaceId> {
        self.faces_at_depth(0).get(index).copied()
    }

    /// Vertex by its index in the control mesh coordinate array
    pub fn control_vertex(&self, index:usize) -> Option<VertexId> {
        self.control_vertices.get(index).copied().flatten()
    }

    /// How many faces are currently allocated
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// How many vertices are currently allocated
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_keys(&self) -> slotmap::basic::Keys<FaceId, Face>{
        self.faces.keys()
    }

    pub fn vertex_keys(&self) -> slotmap::basic::Keys<VertexId, Vertex>{
        self.vertices.keys()
    }

    pub fn position(&self, vertex:VertexId, depth:usize) -> Option<Vec3> {
        self.vertices.get(vertex).and_then(|v| v.position(depth))
    }

    /// Position of a vertex that is known to exist at `depth`
    pub(crate) fn position_at(&self, vertex:VertexId, depth:usize) -> Vec3 {
        match self[vertex].position(depth) {
            Some(position) => position,
            None => panic!("Vertex {:?} has no position at depth {}.", vertex, depth),
        }
    }

    /// Plain average of the face vertices
    pub fn centroid(&self, face:FaceId, depth:usize) -> Vec3 {
        let face = &self[face];
        let sum = face.vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + self.position_at(v, depth));
        sum / face.vertex_count() as f32
    }

    /// Flat vertex and face arrays for one level. Vertices are numbered in order of first use.
    /// Returns `None` if the level doesn't exist or wasn't fully computed.
    pub fn extract(&self, depth:usize) -> Option<LevelMesh> {
        let faces = self.levels.get(depth)?;
        let mut indices:SecondaryMap<VertexId, usize> = SecondaryMap::new();
        let mut result = LevelMesh::default();
        for &face in faces {
            let face = &self[face];
            result.face_vertex_counts.push(face.vertex_count());
            for &vertex in face.vertices.iter() {
                let index = match indices.get(vertex) {
                    Some(&index) => index,
                    None => {
                        let index = result.positions.len();
                        result.positions.push(self[vertex].position(depth)?);
                        indices.insert(vertex, index);
                        index
                    }
                };
                result.face_indices.push(index);
            }
        }
        Some(result)
    }
}

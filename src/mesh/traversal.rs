
use glam::Vec3;
use smallvec::SmallVec;
use thiserror::Error;

use super::{face_ops, EdgeTag, FaceId, MeshPosition, Neighbor, Sector, SubdivisionMesh, VertexId, VertexTag};

pub type TraversalResult<T> = Result<T, TraversalError>;

/// Rings up to this size live on the stack
const RING_INLINE_SIZE:usize = 8;

pub type RingVec<T> = SmallVec<[T;RING_INLINE_SIZE]>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalErrorKind{
    /// Walking around a vertex visited more faces than allowed
    RingOverflow,
    /// A neighbor link points at a face that doesn't contain the vertex being walked around
    BrokenAdjacency,
    /// A vertex that should be on the ring isn't
    NotFound,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind:?} at {position:?}")]
pub struct TraversalError{
    pub position: MeshPosition,
    pub kind: TraversalErrorKind,
}

impl TraversalError {
    pub fn new(pos: impl Into<MeshPosition>, kind:TraversalErrorKind) -> Self {
        Self{position:pos.into(), kind}
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A face around the pivot and the pivot's corner index in it
pub struct RingFace {
    pub face: FaceId,
    pub corner: usize,
}

#[derive(Clone, Debug)]
/// Faces around one vertex, in counter-clockwise order.
///
/// Edge neighbor `e_i` is the vertex after the pivot in face `f_i`. Open rings have one more edge
/// neighbor `e_k`, the vertex before the pivot in the last face.
pub struct Ring {
    pivot: VertexId,
    faces: RingVec<RingFace>,
    closed: bool,
    /// Position of the face the walk started from
    start: usize,
    /// Face across the edge to `e_0` when the walk stopped at a crease
    before: Option<Neighbor>,
    /// Face across the edge to `e_k` when the walk stopped at a crease
    after: Option<Neighbor>,
}

#[derive(Clone, Debug, Default)]
/// Positions of a ring at one depth. Face entries of non-quads are replaced with a point that
/// gives the face centroid the same weight a quad's opposite vertex would have.
pub struct RingSample {
    pub center: Vec3,
    pub edges: RingVec<Vec3>,
    pub faces: RingVec<Vec3>,
}

impl Ring {
    /// Walk around the vertex at `corner` of `face`, stopping only at boundaries
    pub fn build(mesh:&SubdivisionMesh, face:FaceId, corner:usize, limit:usize) -> TraversalResult<Self> {
        Self::walk(mesh, face, corner, limit, false)
    }

    /// Walk around the vertex at `corner` of `face`, stopping at boundaries and crease edges
    pub fn build_sector(mesh:&SubdivisionMesh, face:FaceId, corner:usize, limit:usize) -> TraversalResult<Self> {
        Self::walk(mesh, face, corner, limit, true)
    }

    /// Smooth vertices use the whole ring, crease and corner vertices only their sector
    pub fn for_corner(mesh:&SubdivisionMesh, face:FaceId, corner:usize, limit:usize) -> TraversalResult<Self> {
        match mesh[mesh[face].vertex(corner)].tag() {
            VertexTag::Smooth => Self::build(mesh, face, corner, limit),
            VertexTag::Crease | VertexTag::Corner => Self::build_sector(mesh, face, corner, limit),
        }
    }

    fn walk(mesh:&SubdivisionMesh, face:FaceId, corner:usize, limit:usize, stop_at_creases:bool) -> TraversalResult<Self> {
        let pivot = mesh[face].vertex(corner);
        let stops = |f:&super::Face, edge:usize| stop_at_creases && f.edge_tag(edge) != EdgeTag::Untagged;

        let mut forward:RingVec<RingFace> = RingVec::new();
        forward.push(RingFace { face, corner });
        let mut current = RingFace { face, corner };
        let mut after = None;
        // Counter-clockwise, across the edge coming into the pivot
        let closed = loop {
            let f = &mesh[current.face];
            let edge = f.prev(current.corner);
            let Some(neighbor) = f.neighbor(edge) else { break false };
            if stops(f, edge) {
                after = Some(neighbor);
                break false;
            }
            if neighbor.face == face && neighbor.edge == corner {
                break true;
            }
            let next = RingFace { face: neighbor.face, corner: neighbor.edge };
            if mesh[next.face].vertex(next.corner) != pivot {
                return Err(TraversalError::new(MeshPosition::Edge(current.face, edge), TraversalErrorKind::BrokenAdjacency));
            }
            if forward.len() >= limit {
                return Err(TraversalError::new(pivot, TraversalErrorKind::RingOverflow));
            }
            forward.push(next);
            current = next;
        };

        let mut backward:RingVec<RingFace> = RingVec::new();
        let mut before = None;
        if !closed {
            // Clockwise from the first face until the other boundary or crease
            let mut current = RingFace { face, corner };
            loop {
                let f = &mesh[current.face];
                let edge = current.corner;
                let Some(neighbor) = f.neighbor(edge) else { break };
                if stops(f, edge) {
                    before = Some(neighbor);
                    break;
                }
                let other = &mesh[neighbor.face];
                let next = RingFace { face: neighbor.face, corner: other.next(neighbor.edge) };
                if other.vertex(next.corner) != pivot {
                    return Err(TraversalError::new(MeshPosition::Edge(current.face, edge), TraversalErrorKind::BrokenAdjacency));
                }
                if forward.len() + backward.len() >= limit {
                    return Err(TraversalError::new(pivot, TraversalErrorKind::RingOverflow));
                }
                backward.push(next);
                current = next;
            }
        }

        let start = backward.len();
        let faces = backward.into_iter().rev().chain(forward).collect();
        Ok(Self { pivot, faces, closed, start, before, after })
    }

    pub fn pivot(&self) -> VertexId {
        self.pivot
    }

    pub fn faces(&self) -> &[RingFace] {
        &self.faces
    }

    /// Number of faces in the ring, the valence used to pick a rule
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of edge neighbors
    pub fn vertex_count(&self) -> usize {
        if self.closed { self.faces.len() } else { self.faces.len() + 1 }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tagged and boundary edges at the pivot that lie inside or on the border of this ring
    pub fn tagged_edge_count(&self, mesh:&SubdivisionMesh) -> usize {
        let incoming = self.faces.iter()
            .filter(|rf| mesh[rf.face].is_tagged_edge(mesh[rf.face].prev(rf.corner)))
            .count();
        let first = match self.faces.first() {
            Some(rf) if !self.closed => usize::from(mesh[rf.face].is_tagged_edge(rf.corner)),
            _ => 0,
        };
        incoming + first
    }

    /// Index of the face the ring was built from
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn contains(&self, face:FaceId) -> bool {
        self.faces.iter().any(|rf| rf.face == face)
    }

    /// Index of a face in this ring
    pub fn face_index_of(&self, face:FaceId) -> Option<usize> {
        self.faces.iter().position(|rf| rf.face == face)
    }

    /// Edge neighbor `e_index`
    pub fn edge_vertex(&self, mesh:&SubdivisionMesh, index:usize) -> VertexId {
        if index < self.faces.len() {
            let RingFace { face, corner } = self.faces[index];
            let f = &mesh[face];
            f.vertex(f.next(corner))
        } else {
            let RingFace { face, corner } = self.faces[self.faces.len() - 1];
            let f = &mesh[face];
            f.vertex(f.prev(corner))
        }
    }

    /// Index of an edge neighbor
    pub fn edge_index_of(&self, mesh:&SubdivisionMesh, vertex:VertexId) -> TraversalResult<usize> {
        (0..self.vertex_count())
            .find(|&index| self.edge_vertex(mesh, index) == vertex)
            .ok_or(TraversalError::new(vertex, TraversalErrorKind::NotFound))
    }

    /// First sector declared on any face of the ring
    pub fn sector<'m>(&self, mesh:&'m SubdivisionMesh) -> Option<&'m Sector> {
        self.faces.iter().find_map(|rf| mesh[rf.face].sector(rf.corner))
    }

    /// Target normal of the sector on the other side of the crease this ring stopped at
    pub fn neighbor_sector_normal(&self, mesh:&SubdivisionMesh, limit:usize) -> TraversalResult<Option<Vec3>> {
        let across = [
            self.before.map(|n| (n.face, mesh[n.face].next(n.edge))),
            self.after.map(|n| (n.face, n.edge)),
        ];
        for (face, corner) in across.into_iter().flatten() {
            let ring = Self::build_sector(mesh, face, corner, limit)?;
            if let Some(normal) = ring.sector(mesh).and_then(|sector| sector.normal_target()).map(|(normal, _)| normal) {
                return Ok(Some(normal));
            }
        }
        Ok(None)
    }

    /// Positions of the pivot and its neighbors at `depth`
    pub fn sample(&self, mesh:&SubdivisionMesh, depth:usize) -> RingSample {
        RingSample {
            center: mesh.position_at(self.pivot, depth),
            edges: (0..self.vertex_count()).map(|index| mesh.position_at(self.edge_vertex(mesh, index), depth)).collect(),
            faces: self.faces.iter().map(|rf| face_ops::diagonal_point(mesh, rf.face, rf.corner, depth)).collect(),
        }
    }
}

use slotmap::SecondaryMap;
use tracing::{debug, trace};

use crate::{error::SubdivisionResult, params::SubdivisionParams, rules::RuleCache};

use super::{edge_ops, face_ops, sector::SectorError, vertex_ops, FaceId, Ring, SectorTag, SubdivisionMesh, VertexId, VertexTag};

/// Piecewise smooth Catmull-Clark subdivision, after Biermann, Levin and Zorin,
/// "Piecewise Smooth Subdivision Surfaces with Normal Control".
///
/// The driver owns the rule cache, so rules built for one pass are reused by the next as long as
/// the requested level count stays the same.
#[derive(Debug, Default)]
pub struct Subdivider {
    params: SubdivisionParams,
    rules: RuleCache,
    levels: Option<usize>,
}

impl Subdivider {
    pub fn new(params:SubdivisionParams) -> Self {
        Self { params, rules: RuleCache::new(), levels: None }
    }

    pub fn params(&self) -> &SubdivisionParams {
        &self.params
    }

    pub fn rules(&self) -> &RuleCache {
        &self.rules
    }

    /// Subdivide to the level count in the parameters
    pub fn run(&mut self, mesh:&mut SubdivisionMesh) -> SubdivisionResult<()> {
        self.subdivide(mesh, self.params.levels)
    }

    /// Refine `mesh` until it has `levels` levels below the control mesh. Levels computed by an
    /// earlier call are kept, only the missing ones are computed.
    pub fn subdivide(&mut self, mesh:&mut SubdivisionMesh, levels:usize) -> SubdivisionResult<()> {
        if self.levels != Some(levels) {
            if self.levels.is_some() {
                debug!(levels, "level count changed, resetting rule cache");
            }
            self.rules.reset();
            self.levels = Some(levels);
        }
        if mesh.depth() == 0 {
            validate_sectors(mesh, &self.params)?;
        }
        let start = mesh.depth();
        for depth in start..levels {
            self.subdivide_level(mesh, depth)?;
        }
        if self.params.compute_limit_normals {
            evaluate_limit(mesh, &mut self.rules, &self.params)?;
        }
        debug!(depth = mesh.depth(), faces = mesh.faces_at_depth(mesh.depth()).len(), rules = self.rules.len(), "subdivision done");
        Ok(())
    }

    /// Compute level `depth + 1` from level `depth`
    fn subdivide_level(&mut self, mesh:&mut SubdivisionMesh, depth:usize) -> SubdivisionResult<()> {
        let faces = mesh.faces_at_depth(depth).to_vec();
        let next = depth + 1;
        let Self { params, rules, .. } = self;

        // Allocate everything first so neighbors and shared vertices are linked before any ring walk
        for &face in &faces {
            face_ops::make_children(mesh, face);
        }

        for &face in &faces {
            let point = face_ops::face_point(mesh, rules, params, face, depth)?;
            if let Some(center) = mesh[face].center() {
                mesh[center].set_position(next, point);
            }
        }

        for &face in &faces {
            for corner in 0..mesh[face].vertex_count() {
                let vertex = mesh[face].vertex(corner);
                if mesh[vertex].has_position(next) {
                    continue;
                }
                let point = vertex_ops::vertex_point(mesh, rules, params, face, corner, depth)?;
                mesh[vertex].set_position(next, point);
            }
        }

        for &face in &faces {
            for edge in 0..mesh[face].vertex_count() {
                let Some(mid) = face_ops::mid_vertex(mesh, face, edge) else { continue };
                if mesh[mid].has_position(next) {
                    continue;
                }
                let point = edge_ops::edge_point(mesh, rules, params, face, edge, depth)?;
                mesh[mid].set_position(next, point);
            }
        }
        mesh.computed = next;
        trace!(depth = next, faces = mesh.faces_at_depth(next).len(), "computed level");
        Ok(())
    }
}

/// Subdivide with default parameters
pub fn subdivide(mesh:&mut SubdivisionMesh, levels:usize) -> SubdivisionResult<()> {
    Subdivider::default().subdivide(mesh, levels)
}

/// Crease and corner vertices need tagged edges around them, no more than two for creases.
/// Corners also need a sector that gives their angle.
fn validate_sectors(mesh:&SubdivisionMesh, params:&SubdivisionParams) -> SubdivisionResult<()> {
    for (index, &face) in mesh.faces_at_depth(0).iter().enumerate() {
        for corner in 0..mesh[face].vertex_count() {
            let tag = mesh[mesh[face].vertex(corner)].tag();
            if tag == VertexTag::Smooth {
                continue;
            }
            let ring = Ring::build_sector(mesh, face, corner, params.max_ring_size)?;
            if ring.is_closed() {
                return Err(SectorError::ClosedSectorRing { face: index, vertex: corner, tag }.into());
            }
            if tag == VertexTag::Crease {
                // more than two sectors would each pull the vertex along a different crease
                let edges = Ring::build(mesh, face, corner, params.max_ring_size)?.tagged_edge_count(mesh);
                if edges > 2 {
                    return Err(SectorError::CreaseJunction { face: index, vertex: corner, edges }.into());
                }
            }
            if tag == VertexTag::Corner && !ring.sector(mesh).is_some_and(|sector| sector.tag != SectorTag::Untagged) {
                return Err(SectorError::MissingCornerSector { face: index, vertex: corner }.into());
            }
        }
    }
    Ok(())
}

/// Limit positions and normals of every vertex of the finest level. Crease and corner vertices
/// also get the normal of a second sector if they have one.
fn evaluate_limit(mesh:&mut SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams) -> SubdivisionResult<()> {
    let depth = mesh.depth();
    let faces = mesh.faces_at_depth(depth).to_vec();
    let mut first_sector:SecondaryMap<VertexId, FaceId> = SecondaryMap::new();
    let mut has_secondary:SecondaryMap<VertexId, ()> = SecondaryMap::new();
    for &face in &faces {
        for corner in 0..mesh[face].vertex_count() {
            let vertex = mesh[face].vertex(corner);
            match first_sector.get(vertex) {
                None => {
                    let (limit, normal) = vertex_ops::limit_point(mesh, rules, params, face, corner, depth)?;
                    first_sector.insert(vertex, face);
                    let v = &mut mesh[vertex];
                    v.limit = Some(limit);
                    v.normal = normal;
                    v.secondary_normal = None;
                }
                Some(&first) => {
                    if mesh[vertex].tag() == VertexTag::Smooth || has_secondary.contains_key(vertex) {
                        continue;
                    }
                    if Ring::build_sector(mesh, face, corner, params.max_ring_size)?.contains(first) {
                        continue;
                    }
                    let (_, normal) = vertex_ops::limit_point(mesh, rules, params, face, corner, depth)?;
                    has_secondary.insert(vertex, ());
                    mesh[vertex].secondary_normal = normal;
                }
            }
        }
    }
    Ok(())
}

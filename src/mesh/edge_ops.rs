use glam::Vec3;

use crate::{error::SubdivisionResult, params::SubdivisionParams, rules::RuleCache};

use super::{face_ops::diagonal_point, vertex_ops::SectorContext, FaceId, Neighbor, Ring, Sector, SubdivisionMesh, VertexTag};

/// New vertex on `edge` of `face`.
///
/// Edges between two ordinary vertices use the regular Catmull-Clark mask, which needs the new
/// face centers of both sides at `depth + 1`. Everything else is computed from the sector of
/// whichever endpoint governs the edge, or the average of both when both do.
pub fn edge_point(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, edge:usize, depth:usize) -> SubdivisionResult<Vec3> {
    let f = &mesh[face];
    let head = f.next(edge);
    let (tail_vertex, head_vertex) = (f.vertex(edge), f.vertex(head));
    if !f.is_tagged_edge(edge) && !mesh[tail_vertex].is_special() && !mesh[head_vertex].is_special() {
        if let Some(Neighbor { face:other, .. }) = f.neighbor(edge) {
            let sum = mesh.position_at(tail_vertex, depth)
                + mesh.position_at(head_vertex, depth)
                + center_point(mesh, face, depth)
                + center_point(mesh, other, depth);
            return Ok(0.25 * sum);
        }
    }

    let tail_relevant = is_relevant(mesh, params, face, edge, edge)?;
    let head_relevant = is_relevant(mesh, params, face, head, edge)?;
    match (tail_relevant, head_relevant) {
        (_, false) => ring_edge_point(mesh, rules, params, face, edge, head, depth),
        (false, true) => ring_edge_point(mesh, rules, params, face, head, edge, depth),
        (true, true) => {
            let from_tail = ring_edge_point(mesh, rules, params, face, edge, head, depth)?;
            let from_head = ring_edge_point(mesh, rules, params, face, head, edge, depth)?;
            Ok(0.5 * (from_tail + from_head))
        }
    }
}

/// New center of a face, falling back to its centroid if it wasn't computed yet
fn center_point(mesh:&SubdivisionMesh, face:FaceId, depth:usize) -> Vec3 {
    mesh[face].center()
        .and_then(|center| mesh[center].position(depth + 1))
        .unwrap_or_else(|| mesh.centroid(face, depth))
}

/// Whether the vertex at `corner` of `face` should shape the new point on `edge`
fn is_relevant(mesh:&SubdivisionMesh, params:&SubdivisionParams, face:FaceId, corner:usize, edge:usize) -> SubdivisionResult<bool> {
    let vertex = mesh[face].vertex(corner);
    if !mesh[vertex].is_special() {
        return Ok(false);
    }
    let ring = Ring::for_corner(mesh, face, corner, params.max_ring_size)?;
    if ring.sector(mesh).is_some_and(Sector::is_active) {
        return Ok(true);
    }
    let tagged = mesh[face].is_tagged_edge(edge);
    Ok(match mesh[vertex].tag() {
        VertexTag::Smooth => false,
        VertexTag::Crease => !tagged,
        VertexTag::Corner => true,
    })
}

/// Edge point seen from the pivot's sector
fn ring_edge_point(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, pivot:usize, far:usize, depth:usize) -> SubdivisionResult<Vec3> {
    let context = SectorContext::new(mesh, rules, params, face, pivot, depth)?;
    let f = &mesh[face];
    let shared_edge = if far == f.next(pivot) { pivot } else { far };
    let mask = if f.is_tagged_edge(shared_edge) { &context.rule.crease_sub } else { &context.rule.edge_sub };
    let point = edge_stencil(mesh, face, pivot, far, depth).iter()
        .zip(mask)
        .fold(Vec3::ZERO, |acc, (p, w)| acc + *w * *p);
    if !context.sector.is_some_and(|sector| sector.is_active()) {
        return Ok(point);
    }
    let index = context.ring.edge_index_of(mesh, f.vertex(far))?;
    context.reshape(mesh, params, point, context.rule.x1.edge[index], context.rule.x2.edge[index])
}

/// The six points an edge mask weighs, for the edge from the vertex at `pivot` to the one at `far`:
/// pivot, its other neighbor in this face, the point diagonal from the pivot in this face, the far
/// end, then the point diagonal from the pivot and the pivot's other neighbor in the face across.
/// Boundary edges have no face across and leave those at zero.
pub fn edge_stencil(mesh:&SubdivisionMesh, face:FaceId, pivot:usize, far:usize, depth:usize) -> [Vec3;6] {
    let f = &mesh[face];
    let forward = far == f.next(pivot);
    let shared_edge = if forward { pivot } else { far };
    let beside = if forward { f.prev(pivot) } else { f.next(pivot) };
    let (pivot_vertex, far_vertex) = (f.vertex(pivot), f.vertex(far));

    let mut stencil = [Vec3::ZERO;6];
    stencil[0] = mesh.position_at(pivot_vertex, depth);
    stencil[1] = mesh.position_at(f.vertex(beside), depth);
    stencil[2] = diagonal_point(mesh, face, pivot, depth);
    stencil[3] = mesh.position_at(far_vertex, depth);
    if let Some(Neighbor { face:other, .. }) = f.neighbor(shared_edge) {
        let o = &mesh[other];
        if let Some(corner) = o.corner_of(pivot_vertex) {
            let beside = if o.vertex(o.next(corner)) == far_vertex { o.prev(corner) } else { o.next(corner) };
            stencil[4] = diagonal_point(mesh, other, corner, depth);
            stencil[5] = mesh.position_at(o.vertex(beside), depth);
        }
    }
    stencil
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{mesh::tests::{sample_mesh, single_quad, v_fold}, SubdivisionParams};

    use super::*;

    #[test]
    fn test_edge_stencil() {
        let mesh = sample_mesh();
        let face0 = mesh.control_face(0).unwrap();
        // from vertex 4 (corner 2) to vertex 3 (corner 3)
        let stencil = edge_stencil(&mesh, face0, 2, 3, 0);
        let expected = [[0.0, 0.0], [0.0, -1.0], [-1.0, -1.0], [-1.0, 0.0], [-1.0, 1.0], [0.0, 1.0]];
        for (point, expected) in stencil.iter().zip(expected) {
            assert_eq!(point.truncate().to_array(), expected);
        }
        // the same edge seen from the other end
        let stencil = edge_stencil(&mesh, face0, 3, 2, 0);
        assert_eq!(stencil[0].truncate().to_array(), [-1.0, 0.0]);
        assert_eq!(stencil[1].truncate().to_array(), [-1.0, -1.0]);
        assert_eq!(stencil[3].truncate().to_array(), [0.0, 0.0]);
        assert_eq!(stencil[5].truncate().to_array(), [-1.0, 1.0]);
    }

    #[test]
    fn test_boundary_edges_are_midpoints() {
        let mesh = single_quad();
        let face = mesh.control_face(0).unwrap();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();
        for edge in 0..4 {
            let point = edge_point(&mesh, &mut rules, &params, face, edge, 0).unwrap();
            let f = &mesh[face];
            let expected = 0.5 * (mesh.position_at(f.vertex(edge), 0) + mesh.position_at(f.vertex(f.next(edge)), 0));
            assert_relative_eq!(point.x, expected.x, epsilon = 1e-6);
            assert_relative_eq!(point.y, expected.y, epsilon = 1e-6);
            assert_relative_eq!(point.z, 0.0);
        }
    }

    #[test]
    fn test_crease_is_symmetric() {
        let mesh = v_fold();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();

        // [0,1,4,3] edge 2 goes 4 -> 3, [1,2,5,4] edge 2 goes 5 -> 4
        let left = edge_point(&mesh, &mut rules, &params, mesh.control_face(0).unwrap(), 2, 0).unwrap();
        let right = edge_point(&mesh, &mut rules, &params, mesh.control_face(1).unwrap(), 2, 0).unwrap();
        assert_relative_eq!(left.x, -right.x, epsilon = 1e-6);
        assert_relative_eq!(left.y, right.y, epsilon = 1e-6);
        assert_relative_eq!(left.z, right.z, epsilon = 1e-6);
        assert!(left.x < 0.0);

        // the crease itself stays in the fold plane
        let on_crease = edge_point(&mesh, &mut rules, &params, mesh.control_face(0).unwrap(), 1, 0).unwrap();
        assert_relative_eq!(on_crease.x, 0.0);
        assert_relative_eq!(on_crease.y, -0.5);
    }
}

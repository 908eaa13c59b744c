use glam::Vec3;

use crate::{error::SubdivisionResult, params::SubdivisionParams, rules::RuleCache};

use super::{vertex_ops::SectorContext, Face, FaceId, Neighbor, Ring, Sector, StackVec, SubdivisionMesh, Vertex, VertexId, VertexTag};

/// Split a face into one quad per corner, the first time it is asked to.
/// Child `i` is `[v_i, mid_i, center, mid_(i-1)]`, where `mid_i` is the new vertex on edge `i`.
/// Mid vertices are shared with neighbors that were split before, and children are linked
/// with the children of those neighbors.
pub fn make_children(mesh:&mut SubdivisionMesh, face:FaceId) -> StackVec<FaceId> {
    if let Some(children) = &mesh[face].children {
        return children.clone();
    }
    let parent = mesh[face].clone();
    let count = parent.vertex_count();
    let depth = parent.depth + 1;

    let center = mesh.new_vertex(Vertex::new(depth, VertexTag::Smooth, count != 4));
    let mut mids:StackVec<VertexId> = StackVec::with_capacity(count);
    for edge in 0..count {
        let shared = parent.neighbors[edge].and_then(|Neighbor { face:other, edge:other_edge }| mid_vertex(mesh, other, other_edge));
        let mid = match shared {
            Some(mid) => mid,
            None => {
                let tagged = parent.is_tagged_edge(edge);
                let tag = if tagged { VertexTag::Crease } else { VertexTag::Smooth };
                mesh.new_vertex(Vertex::new(depth, tag, tagged))
            }
        };
        mids.push(mid);
    }

    let children:StackVec<FaceId> = (0..count).map(|corner| {
        let previous = parent.prev(corner);
        let mut child = Face::new(StackVec::from_slice(&[parent.vertices[corner], mids[corner], center, mids[previous]]), depth);
        child.edge_tags[0] = parent.edge_tags[corner];
        child.edge_tags[3] = parent.edge_tags[previous];
        child.sectors[0] = parent.sectors[corner];
        mesh.new_face(child)
    }).collect();

    for corner in 0..count {
        let next = parent.next(corner);
        link(mesh, children[corner], 1, children[next], 2);
    }

    for edge in 0..count {
        let Some(Neighbor { face:other, edge:other_edge }) = parent.neighbors[edge] else { continue };
        let Some(other_children) = mesh[other].children.clone() else { continue };
        let other_next = (other_edge + 1) % other_children.len();
        // v_e -> mid on this side runs against mid -> v_e on the other
        link(mesh, children[edge], 0, other_children[other_next], 3);
        link(mesh, children[parent.next(edge)], 3, other_children[other_edge], 0);
    }

    mesh[face].children = Some(children.clone());
    mesh[face].center = Some(center);
    children
}

fn link(mesh:&mut SubdivisionMesh, face:FaceId, edge:usize, other:FaceId, other_edge:usize) {
    mesh[face].neighbors[edge] = Some(Neighbor { face: other, edge: other_edge });
    mesh[other].neighbors[other_edge] = Some(Neighbor { face, edge });
}

/// Vertex created on `edge` of a face that already has children
pub fn mid_vertex(mesh:&SubdivisionMesh, face:FaceId, edge:usize) -> Option<VertexId> {
    mesh[face].children.as_ref().map(|children| mesh[children[edge]].vertex(1))
}

/// Point diagonally across from `corner`. For quads this is the opposite vertex, for other polygons
/// the point that makes the four corners average to the face centroid.
pub fn diagonal_point(mesh:&SubdivisionMesh, face:FaceId, corner:usize, depth:usize) -> Vec3 {
    let f = &mesh[face];
    if f.vertex_count() == 4 {
        return mesh.position_at(f.vertex((corner + 2) % 4), depth);
    }
    4.0 * mesh.centroid(face, depth)
        - mesh.position_at(f.vertex(corner), depth)
        - mesh.position_at(f.vertex(f.next(corner)), depth)
        - mesh.position_at(f.vertex(f.prev(corner)), depth)
}

/// New center vertex of a face: the centroid, moved by every sector of the face's corners
/// that has flatness or a target normal. Moves from several sectors are averaged.
pub fn face_point(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, depth:usize) -> SubdivisionResult<Vec3> {
    let average = mesh.centroid(face, depth);
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for corner in 0..mesh[face].vertex_count() {
        if !mesh[mesh[face].vertex(corner)].is_special() {
            continue;
        }
        let ring = Ring::for_corner(mesh, face, corner, params.max_ring_size)?;
        if !ring.sector(mesh).is_some_and(Sector::is_active) {
            continue;
        }
        let context = SectorContext::from_ring(mesh, rules, ring, depth)?;
        let index = context.ring.start();
        sum += context.reshape(mesh, params, average, context.rule.x1.face[index], context.rule.x2.face[index])?;
        count += 1;
    }
    Ok(if count == 0 { average } else { sum / count as f32 })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use crate::{mesh::{tests::{cube, sample_mesh}, EdgeTag, Sector, SectorTag}, mesh_builders::ControlMesh, rules::RuleCache, SubdivisionParams};

    use super::*;

    #[test]
    fn test_make_children() {
        let mut mesh = sample_mesh();
        let face0 = mesh.control_face(0).unwrap();
        let children = make_children(&mut mesh, face0);
        assert_eq!(children.len(), 4);
        assert_eq!(mesh.faces_at_depth(1).len(), 4);
        let center = mesh[face0].center().unwrap();
        for (corner, &child) in children.iter().enumerate() {
            assert_eq!(mesh[child].depth(), 1);
            assert_eq!(mesh[child].vertex(0), mesh[face0].vertex(corner));
            assert_eq!(mesh[child].vertex(2), center);
            // internal edges are linked, outer ones wait for the neighbors
            assert!(mesh[child].neighbor(1).is_some());
            assert!(mesh[child].neighbor(2).is_some());
        }
        // asking again returns the same children
        assert_eq!(make_children(&mut mesh, face0), children);
        assert_eq!(mesh.faces_at_depth(1).len(), 4);
    }

    #[test]
    fn test_children_share_mids_with_neighbors() {
        let mut mesh = cube();
        let faces = mesh.faces_at_depth(0).to_vec();
        for &face in &faces {
            make_children(&mut mesh, face);
        }
        // 8 corners, 12 edge mids, 6 centers
        assert_eq!(mesh.vertex_count(), 26);
        for &face in mesh.faces_at_depth(1) {
            for edge in 0..4 {
                let neighbor = mesh[face].neighbor(edge).unwrap();
                assert_eq!(mesh[neighbor.face].neighbor(neighbor.edge).unwrap().face, face);
                let f = &mesh[face];
                let o = &mesh[neighbor.face];
                assert_eq!(f.vertex(edge), o.vertex(o.next(neighbor.edge)));
            }
        }
    }

    #[test]
    fn test_children_inherit_tags() {
        let mut mesh = sample_mesh();
        let face0 = mesh.control_face(0).unwrap();
        mesh.tag_edge(1, 4).unwrap();
        mesh.add_sector(0, 0, Sector::new(SectorTag::Untagged).with_flatness(0.5)).unwrap();
        let children = make_children(&mut mesh, face0);
        // [0,1,4,3]: edge 1 goes 1 -> 4
        assert_eq!(mesh[children[1]].edge_tag(0), EdgeTag::Crease);
        assert_eq!(mesh[children[2]].edge_tag(3), EdgeTag::Crease);
        assert_eq!(mesh[children[0]].edge_tag(0), EdgeTag::Untagged);
        assert!(mesh[children[0]].sector(0).is_some());
        assert!(mesh[children[1]].sector(0).is_none());

        let mid = mid_vertex(&mesh, face0, 1).unwrap();
        assert_eq!(mesh[mid].tag(), VertexTag::Crease);
        let boundary_mid = mid_vertex(&mesh, face0, 0).unwrap();
        assert_eq!(mesh[boundary_mid].tag(), VertexTag::Crease);
        let inner_mid = mid_vertex(&mesh, face0, 2).unwrap();
        assert_eq!(mesh[inner_mid].tag(), VertexTag::Smooth);
        assert!(!mesh[inner_mid].is_special());
    }

    #[test]
    fn test_triangle_children() {
        let coordinates = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut mesh:SubdivisionMesh = ControlMesh::new(&coordinates, &[0, 1, 2], &[3]).try_into().unwrap();
        let face = mesh.control_face(0).unwrap();
        let children = make_children(&mut mesh, face);
        assert_eq!(children.len(), 3);
        let center = mesh[face].center().unwrap();
        assert!(mesh[center].is_special());
        assert!(children.iter().all(|&child| mesh[child].vertex_count() == 4 && mesh[child].vertex(2) == center));
    }

    #[test]
    fn test_diagonal_point() {
        let mesh = sample_mesh();
        let face0 = mesh.control_face(0).unwrap();
        assert_eq!(diagonal_point(&mesh, face0, 0, 0), Vec3::new(0.0, 0.0, 0.0));

        let coordinates = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 1.0, 0.0], [1.0, 2.0, 0.0], [-1.0, 1.0, 0.0]];
        let mesh:SubdivisionMesh = ControlMesh::new(&coordinates, &[0, 1, 2, 3, 4], &[5]).try_into().unwrap();
        let face = mesh.control_face(0).unwrap();
        let proxy = diagonal_point(&mesh, face, 0, 0);
        let corners = [0, 1, 4].iter().map(|&i| Vec3::from_array(coordinates[i])).sum::<Vec3>();
        let average = (corners + proxy) / 4.0;
        let centroid = mesh.centroid(face, 0);
        assert_relative_eq!(average.x, centroid.x, epsilon = 1e-6);
        assert_relative_eq!(average.y, centroid.y, epsilon = 1e-6);
    }

    #[test]
    fn test_face_point_without_sectors_is_centroid() {
        let mesh = cube();
        let mut rules = RuleCache::new();
        let params = SubdivisionParams::default();
        for &face in mesh.faces_at_depth(0) {
            let point = face_point(&mesh, &mut rules, &params, face, 0).unwrap();
            assert_eq!(point, mesh.centroid(face, 0));
        }
        assert!(rules.is_empty());
    }
}

use std::rc::Rc;

use glam::Vec3;

use crate::{error::SubdivisionResult, params::SubdivisionParams, rules::{QuadRule, RuleCache, RuleKind}};

use super::{sector::SectorFrame, traversal::RingSample, FaceId, Ring, Sector, SubdivisionMesh};

/// Ring, sector and rule of one corner at a given depth
pub(crate) struct SectorContext {
    pub ring: Ring,
    pub sector: Option<Sector>,
    pub rule: Rc<QuadRule>,
    pub sample: RingSample,
}

impl SectorContext {
    pub fn new(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, corner:usize, depth:usize) -> SubdivisionResult<Self> {
        let ring = Ring::for_corner(mesh, face, corner, params.max_ring_size)?;
        Self::from_ring(mesh, rules, ring, depth)
    }

    pub fn from_ring(mesh:&SubdivisionMesh, rules:&mut RuleCache, ring:Ring, depth:usize) -> SubdivisionResult<Self> {
        let sector = ring.sector(mesh).copied();
        let rule = rules.rule_for(mesh[ring.pivot()].tag(), sector.as_ref(), ring.face_count())?;
        let sample = ring.sample(mesh, depth);
        Ok(Self { ring, sector, rule, sample })
    }

    /// Apply the sector's flatness and normal to a new point with eigenvector entries `x1`, `x2`
    pub fn reshape(&self, mesh:&SubdivisionMesh, params:&SubdivisionParams, point:Vec3, x1:f32, x2:f32) -> SubdivisionResult<Vec3> {
        let Some(sector) = self.sector.filter(Sector::is_active) else {
            return Ok(point);
        };
        let open = !self.ring.is_closed();
        let neighbor_normal = if open && self.rule.kind == RuleKind::Crease {
            self.ring.neighbor_sector_normal(mesh, params.max_ring_size)?
        } else {
            None
        };
        let frame = SectorFrame::new(&self.rule, &self.sample, open, neighbor_normal);
        Ok(sector.reshape(point, &frame, x1, x2))
    }
}

/// New position of the vertex at `corner` of `face`. Ordinary vertices take the regular
/// Catmull-Clark mask, everything else the rule of its sector.
pub fn vertex_point(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, corner:usize, depth:usize) -> SubdivisionResult<Vec3> {
    let vertex = mesh[face].vertex(corner);
    if !mesh[vertex].is_special() {
        let ring = Ring::build(mesh, face, corner, params.max_ring_size)?;
        let sample = ring.sample(mesh, depth);
        let k = ring.vertex_count() as f32;
        let beta = 1.5 / k;
        let gamma = 0.25 / k;
        let edges:Vec3 = sample.edges.iter().sum();
        let faces:Vec3 = sample.faces.iter().sum();
        return Ok((1.0 - beta - gamma) * sample.center + beta / k * edges + gamma / k * faces);
    }
    let context = SectorContext::new(mesh, rules, params, face, corner, depth)?;
    let point = context.rule.sub.apply(&context.sample);
    context.reshape(mesh, params, point, context.rule.x1.center, context.rule.x2.center)
}

/// Limit position and normal of the vertex at `corner` of `face`, evaluated from its sector at `depth`.
/// The normal is `None` where the tangents are degenerate.
pub fn limit_point(mesh:&SubdivisionMesh, rules:&mut RuleCache, params:&SubdivisionParams, face:FaceId, corner:usize, depth:usize) -> SubdivisionResult<(Vec3, Option<Vec3>)> {
    let context = SectorContext::new(mesh, rules, params, face, corner, depth)?;
    let position = context.rule.l0.apply(&context.sample);
    let tangent1 = context.rule.l1.apply(&context.sample);
    let tangent2 = context.rule.l2.apply(&context.sample);
    Ok((position, tangent2.cross(tangent1).try_normalize()))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{mesh::tests::{cube, sample_mesh, single_quad}, rules::RuleCache, SubdivisionParams};

    use super::*;

    #[test]
    fn test_ordinary_vertex_point() {
        let mesh = sample_mesh();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();
        let face0 = mesh.control_face(0).unwrap();
        // flat symmetric neighborhood keeps the center in place
        let point = vertex_point(&mesh, &mut rules, &params, face0, 2, 0).unwrap();
        assert_relative_eq!(point.length(), 0.0, epsilon = 1e-6);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_boundary_corner_vertex_point() {
        let mesh = single_quad();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();
        let face = mesh.control_face(0).unwrap();
        let point = vertex_point(&mesh, &mut rules, &params, face, 0, 0).unwrap();
        // 3/4 of itself and 1/8 of each boundary neighbor
        assert_relative_eq!(point.x, 0.125);
        assert_relative_eq!(point.y, 0.125);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_cube_limit_normals_point_outwards() {
        let mesh = cube();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();
        for &face in mesh.faces_at_depth(0) {
            for corner in 0..4 {
                let (position, normal) = limit_point(&mesh, &mut rules, &params, face, corner, 0).unwrap();
                let normal = normal.unwrap();
                let direction = position.normalize();
                assert!(normal.dot(direction) > 0.999, "normal {normal} at {position}");
            }
        }
    }

    #[test]
    fn test_flat_limit_normal() {
        let mesh = single_quad();
        let params = SubdivisionParams::default();
        let mut rules = RuleCache::new();
        let face = mesh.control_face(0).unwrap();
        for corner in 0..4 {
            let (position, normal) = limit_point(&mesh, &mut rules, &params, face, corner, 0).unwrap();
            assert_relative_eq!(position.z, 0.0);
            let normal = normal.unwrap();
            assert_relative_eq!(normal.z, 1.0, epsilon = 1e-6);
        }
    }
}

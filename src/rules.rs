//! Coefficient tables for the extraordinary vertex rules and a cache that memoizes them per valence.
//!
//! Every rule describes one sector of the ring around a tagged vertex: the pivot (`center`),
//! the ring's edge neighbors `e_0..` and its face neighbors `f_0..`. Closed rings have `k`
//! edge neighbors, open rings (crease and corner sectors) have `k+1`.
use std::{collections::BTreeMap, f32::consts::PI, rc::Rc};

use glam::Vec3;
use thiserror::Error;
use tracing::trace;

use crate::{error::SubdivisionResult, mesh::{sector::{Sector, SectorError}, traversal::RingSample, VertexTag}};

mod interior;
mod crease;
mod corner;

/// Catmull-Clark weights for an untagged edge: pivot, pivot's face-A neighbor, face-A far neighbor, far end, face-B far neighbor, face-B neighbor
pub const EDGE_MASK:[f32;6] = [0.375, 0.0625, 0.0625, 0.375, 0.0625, 0.0625];

/// Crease edges ignore the faces on either side
pub const CREASE_MASK:[f32;6] = [0.5, 0.0, 0.0, 0.5, 0.0, 0.0];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    Interior,
    Crease,
    ConvexCorner,
    ConcaveCorner,
}

impl RuleKind {
    /// Which rule a sector follows given its pivot's tag and the sector's tag
    pub fn select(vertex:VertexTag, sector:crate::mesh::SectorTag) -> Option<Self> {
        use crate::mesh::SectorTag;
        match (vertex, sector) {
            (VertexTag::Smooth, SectorTag::Untagged) => Some(Self::Interior),
            (VertexTag::Crease, SectorTag::Untagged) => Some(Self::Crease),
            (VertexTag::Corner, SectorTag::Convex) => Some(Self::ConvexCorner),
            (VertexTag::Corner, SectorTag::Concave) => Some(Self::ConcaveCorner),
            _ => None,
        }
    }

    #[inline]
    pub fn is_corner(self) -> bool {
        matches!(self, Self::ConvexCorner | Self::ConcaveCorner)
    }

    /// Interior and crease rules ignore theta
    pub fn accepts_theta(self, theta:f32) -> bool {
        match self {
            Self::Interior | Self::Crease => true,
            Self::ConvexCorner => theta > 0.0 && theta < PI,
            Self::ConcaveCorner => theta > PI && theta < 2.0 * PI,
        }
    }

    /// Smallest ring this rule is defined for
    pub fn min_valence(self) -> usize {
        match self {
            Self::Interior => 3,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum RuleError {
    #[error("{kind:?} rule needs a ring of at least {min} faces, got {k}")]
    DegenerateValence{ kind:RuleKind, k:usize, min:usize },
    #[error("theta {theta} is outside the valid range of a {kind:?} rule")]
    ThetaOutOfRange{ kind:RuleKind, theta:f32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Weights over one sector ring
pub struct Coefficients {
    pub center: f32,
    pub edge: Vec<f32>,
    pub face: Vec<f32>,
}

impl Coefficients {
    pub(crate) fn zeroed(edges:usize, faces:usize) -> Self {
        Self { center: 0.0, edge: vec![0.0; edges], face: vec![0.0; faces] }
    }

    pub fn sum(&self) -> f32 {
        self.center + self.edge.iter().sum::<f32>() + self.face.iter().sum::<f32>()
    }

    /// Pairs a left eigenvector with a right eigenvector
    pub fn dot(&self, other:&Self) -> f32 {
        self.center * other.center
            + self.edge.iter().zip(&other.edge).map(|(a, b)| a * b).sum::<f32>()
            + self.face.iter().zip(&other.face).map(|(a, b)| a * b).sum::<f32>()
    }

    /// Weighted sum of the ring positions
    pub fn apply(&self, ring:&RingSample) -> Vec3 {
        let edges = self.edge.iter().zip(&ring.edges).fold(Vec3::ZERO, |acc, (w, p)| acc + *w * *p);
        let faces = self.face.iter().zip(&ring.faces).fold(Vec3::ZERO, |acc, (w, p)| acc + *w * *p);
        self.center * ring.center + edges + faces
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Subdivision matrix row for the pivot, the dominant left eigenvectors (`l0` limit position,
/// `l1` and `l2` tangents), their right eigenvectors `x1`/`x2` and eigenvalues, plus the edge masks.
pub struct QuadRule {
    pub kind: RuleKind,
    pub k: usize,
    pub theta: f32,
    pub sub: Coefficients,
    pub l0: Coefficients,
    pub l1: Coefficients,
    pub l2: Coefficients,
    pub x1: Coefficients,
    pub x2: Coefficients,
    pub lambda1: f32,
    pub lambda2: f32,
    pub edge_sub: [f32;6],
    pub crease_sub: [f32;6],
}

impl QuadRule {
    pub fn new(kind:RuleKind, k:usize, theta:f32) -> Result<Self, RuleError> {
        if k < kind.min_valence() {
            return Err(RuleError::DegenerateValence { kind, k, min: kind.min_valence() });
        }
        if !kind.accepts_theta(theta) {
            return Err(RuleError::ThetaOutOfRange { kind, theta });
        }
        Ok(match kind {
            RuleKind::Interior => interior::build(k),
            RuleKind::Crease => crease::build(k),
            RuleKind::ConvexCorner | RuleKind::ConcaveCorner => corner::build(kind, k, theta),
        })
    }

    /// Ring has a crease on both sides
    #[inline]
    pub fn is_open(&self) -> bool {
        self.kind != RuleKind::Interior
    }

    /// Empty tables sized for this kind of ring
    pub(crate) fn empty(kind:RuleKind, k:usize, theta:f32) -> Self {
        let edges = if kind == RuleKind::Interior { k } else { k + 1 };
        let table = Coefficients::zeroed(edges, k);
        Self {
            kind, k, theta,
            sub: table.clone(),
            l0: table.clone(),
            l1: table.clone(),
            l2: table.clone(),
            x1: table.clone(),
            x2: table,
            lambda1: 0.5,
            lambda2: 0.5,
            edge_sub: EDGE_MASK,
            crease_sub: CREASE_MASK,
        }
    }
}

/// Edge mask for a sector with angle `theta_k` per face. The far end weight keeps the
/// edge neighbors in the 1/2 eigenspace of the sector.
pub(crate) fn sector_edge_mask(theta_k:f64) -> [f32;6] {
    let far = 0.375 - 0.25 * theta_k.cos();
    [(0.75 - far) as f32, 0.0625, 0.0625, far as f32, 0.0625, 0.0625]
}

#[derive(Debug, Default)]
/// Rules are created on first use and shared afterwards. Interior and crease rules depend only on
/// the ring size, corner rules are rebuilt if the cached sector angle differs.
pub struct RuleCache {
    interior: BTreeMap<usize, Rc<QuadRule>>,
    crease: BTreeMap<usize, Rc<QuadRule>>,
    convex: BTreeMap<usize, Rc<QuadRule>>,
    concave: BTreeMap<usize, Rc<QuadRule>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&mut self, kind:RuleKind, k:usize, theta:f32) -> Result<Rc<QuadRule>, RuleError> {
        let table = match kind {
            RuleKind::Interior => &mut self.interior,
            RuleKind::Crease => &mut self.crease,
            RuleKind::ConvexCorner => &mut self.convex,
            RuleKind::ConcaveCorner => &mut self.concave,
        };
        if let Some(rule) = table.get(&k) {
            if !kind.is_corner() || rule.theta == theta {
                return Ok(rule.clone());
            }
        }
        let rule = Rc::new(QuadRule::new(kind, k, theta)?);
        trace!(?kind, k, theta, "built subdivision rule");
        table.insert(k, rule.clone());
        Ok(rule)
    }

    /// Rule for a pivot with a given tag, taking the sector's tag and angle if there is one
    pub fn rule_for(&mut self, vertex:VertexTag, sector:Option<&Sector>, k:usize) -> SubdivisionResult<Rc<QuadRule>> {
        let tag = sector.map(|s| s.tag).unwrap_or_default();
        let Some(kind) = RuleKind::select(vertex, tag) else {
            return Err(SectorError::TagMismatch { vertex, sector: tag }.into());
        };
        let theta = sector.map_or(tag.default_theta(), |s| s.theta);
        Ok(self.rule(kind, k, theta)?)
    }

    pub fn len(&self) -> usize {
        self.interior.len() + self.crease.len() + self.convex.len() + self.concave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.interior.clear();
        self.crease.clear();
        self.convex.clear();
        self.concave.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use crate::mesh::SectorTag;

    use super::*;

    fn all_rules() -> Vec<QuadRule> {
        let mut rules = Vec::new();
        for k in 3..=16 {
            rules.push(QuadRule::new(RuleKind::Interior, k, PI).unwrap());
        }
        for k in 1..=12 {
            rules.push(QuadRule::new(RuleKind::Crease, k, PI).unwrap());
        }
        for k in 1..=8 {
            for theta in [0.3, 1.0, FRAC_PI_2, 2.5] {
                rules.push(QuadRule::new(RuleKind::ConvexCorner, k, theta).unwrap());
            }
            for theta in [3.5, 1.5 * PI, 5.9] {
                rules.push(QuadRule::new(RuleKind::ConcaveCorner, k, theta).unwrap());
            }
        }
        rules
    }

    #[test]
    fn test_partition_of_unity() {
        for rule in all_rules() {
            let context = format!("{:?} k={} theta={}", rule.kind, rule.k, rule.theta);
            assert_relative_eq!(rule.sub.sum(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(rule.l0.sum(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(rule.edge_sub.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(rule.crease_sub.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
            assert!(rule.l1.sum().abs() < 1e-4, "{context}: l1 sums to {}", rule.l1.sum());
            assert!(rule.l2.sum().abs() < 1e-4, "{context}: l2 sums to {}", rule.l2.sum());
        }
    }

    #[test]
    fn test_eigenvector_duality() {
        for rule in all_rules() {
            let context = format!("{:?} k={} theta={}", rule.kind, rule.k, rule.theta);
            assert!((rule.l1.dot(&rule.x1) - 1.0).abs() < 1e-4, "{context}: l1.x1 = {}", rule.l1.dot(&rule.x1));
            assert!((rule.l2.dot(&rule.x2) - 1.0).abs() < 1e-4, "{context}: l2.x2 = {}", rule.l2.dot(&rule.x2));
            assert!(rule.l1.dot(&rule.x2).abs() < 1e-4, "{context}: l1.x2 = {}", rule.l1.dot(&rule.x2));
            assert!(rule.l2.dot(&rule.x1).abs() < 1e-4, "{context}: l2.x1 = {}", rule.l2.dot(&rule.x1));
        }
    }

    #[test]
    fn test_table_sizes() {
        let interior = QuadRule::new(RuleKind::Interior, 5, PI).unwrap();
        assert_eq!(interior.sub.edge.len(), 5);
        assert_eq!(interior.sub.face.len(), 5);
        assert!(!interior.is_open());
        let crease = QuadRule::new(RuleKind::Crease, 3, PI).unwrap();
        assert_eq!(crease.l1.edge.len(), 4);
        assert_eq!(crease.l1.face.len(), 3);
        assert!(crease.is_open());
    }

    #[test]
    fn test_regular_eigenvalues() {
        let interior = QuadRule::new(RuleKind::Interior, 4, PI).unwrap();
        assert_relative_eq!(interior.lambda1, 0.5, epsilon = 1e-6);
        assert_relative_eq!(interior.edge_sub[0], 0.375);
        let crease = QuadRule::new(RuleKind::Crease, 1, PI).unwrap();
        assert_relative_eq!(crease.lambda1, 0.25);
        assert_relative_eq!(crease.lambda2, 0.5);
        let crease = QuadRule::new(RuleKind::Crease, 2, PI).unwrap();
        // Regular crease keeps the regular edge mask
        assert_relative_eq!(crease.edge_sub[0], 0.375, epsilon = 1e-6);
        assert_relative_eq!(crease.edge_sub[3], 0.375, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_rules() {
        assert_eq!(
            QuadRule::new(RuleKind::Interior, 2, PI),
            Err(RuleError::DegenerateValence { kind: RuleKind::Interior, k: 2, min: 3 })
        );
        assert!(matches!(QuadRule::new(RuleKind::Crease, 0, PI), Err(RuleError::DegenerateValence { .. })));
        assert!(matches!(QuadRule::new(RuleKind::ConvexCorner, 2, 4.0), Err(RuleError::ThetaOutOfRange { .. })));
        assert!(matches!(QuadRule::new(RuleKind::ConcaveCorner, 2, 1.0), Err(RuleError::ThetaOutOfRange { .. })));
    }

    #[test]
    fn test_select() {
        assert_eq!(RuleKind::select(VertexTag::Smooth, SectorTag::Untagged), Some(RuleKind::Interior));
        assert_eq!(RuleKind::select(VertexTag::Crease, SectorTag::Untagged), Some(RuleKind::Crease));
        assert_eq!(RuleKind::select(VertexTag::Corner, SectorTag::Convex), Some(RuleKind::ConvexCorner));
        assert_eq!(RuleKind::select(VertexTag::Corner, SectorTag::Concave), Some(RuleKind::ConcaveCorner));
        assert_eq!(RuleKind::select(VertexTag::Corner, SectorTag::Untagged), None);
        assert_eq!(RuleKind::select(VertexTag::Smooth, SectorTag::Convex), None);
    }

    #[test]
    fn test_cache() {
        let mut cache = RuleCache::new();
        assert!(cache.is_empty());
        let first = cache.rule(RuleKind::Interior, 5, PI).unwrap();
        let second = cache.rule(RuleKind::Interior, 5, 0.0).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let convex = cache.rule(RuleKind::ConvexCorner, 2, FRAC_PI_2).unwrap();
        let same = cache.rule(RuleKind::ConvexCorner, 2, FRAC_PI_2).unwrap();
        assert!(Rc::ptr_eq(&convex, &same));
        let other = cache.rule(RuleKind::ConvexCorner, 2, 1.0).unwrap();
        assert!(!Rc::ptr_eq(&convex, &other));
        assert_eq!(other.theta, 1.0);
        assert_eq!(cache.len(), 2);

        cache.reset();
        assert!(cache.is_empty());
        let rebuilt = cache.rule(RuleKind::Interior, 5, PI).unwrap();
        assert!(!Rc::ptr_eq(&first, &rebuilt));
    }

    #[test]
    fn test_rule_for_sector() {
        let mut cache = RuleCache::new();
        let rule = cache.rule_for(VertexTag::Crease, None, 3).unwrap();
        assert_eq!(rule.kind, RuleKind::Crease);
        let sector = Sector::new(SectorTag::Concave);
        let rule = cache.rule_for(VertexTag::Corner, Some(&sector), 3).unwrap();
        assert_eq!(rule.kind, RuleKind::ConcaveCorner);
        assert_relative_eq!(rule.theta, 1.5 * PI);
        assert!(cache.rule_for(VertexTag::Corner, None, 3).is_err());
    }
}

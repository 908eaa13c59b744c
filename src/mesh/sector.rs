//! Per-corner overrides that control how the surface behaves near a tagged vertex.
use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use thiserror::Error;
use tracing::warn;

use crate::rules::{QuadRule, RuleKind};

use super::{traversal::RingSample, VertexTag};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SectorTag {
    #[default]
    Untagged,
    Convex,
    Concave,
}

impl SectorTag {
    /// Sector angle used when none is given
    pub const fn default_theta(self) -> f32 {
        match self {
            Self::Untagged => PI,
            Self::Convex => FRAC_PI_2,
            Self::Concave => 3.0 * FRAC_PI_2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SectorError {
    #[error("unknown control face {0}")]
    UnknownFace(usize),
    #[error("vertex {vertex} is out of range for control face {face} with {count} vertices")]
    VertexOutOfRange{ face:usize, vertex:usize, count:usize },
    #[error("a {sector:?} sector can't be attached to a {vertex:?} vertex")]
    TagMismatch{ vertex:VertexTag, sector:SectorTag },
    #[error("theta {theta} is out of range for a {tag:?} sector")]
    ThetaOutOfRange{ tag:SectorTag, theta:f32 },
    #[error("{name} {value} is outside [0, 1]")]
    BlendOutOfRange{ name:&'static str, value:f32 },
    #[error("sector normal has zero length")]
    ZeroNormal,
    #[error("corner vertex {vertex} of control face {face} has no convex or concave sector")]
    MissingCornerSector{ face:usize, vertex:usize },
    #[error("{tag:?} vertex {vertex} of control face {face} isn't bounded by tagged edges")]
    ClosedSectorRing{ face:usize, vertex:usize, tag:VertexTag },
    #[error("crease vertex {vertex} of control face {face} joins {edges} tagged edges, it needs the corner flag")]
    CreaseJunction{ face:usize, vertex:usize, edges:usize },
    #[error("no control edge joins vertices {0} and {1}")]
    UnknownEdge(usize, usize),
    #[error("sectors and edge tags can't change once the mesh was subdivided")]
    AlreadySubdivided,
}

#[derive(Copy, Clone, Debug, PartialEq)]
/// Declared on one corner of a control face, and inherited by the child face that keeps that corner.
/// A sector covers every face between the tagged edges around its vertex.
pub struct Sector {
    pub tag: SectorTag,
    /// Blend towards the tangent plane, `None` means unset
    pub flatness: Option<f32>,
    /// Angle of a corner sector
    pub theta: f32,
    pub normal: Option<Vec3>,
    /// Blend towards `normal`. Unset with a normal present means a full blend.
    pub normal_blend: Option<f32>,
}

impl Default for Sector {
    fn default() -> Self {
        Self::new(SectorTag::Untagged)
    }
}

impl Sector {
    pub fn new(tag:SectorTag) -> Self {
        Self { tag, flatness: None, theta: tag.default_theta(), normal: None, normal_blend: None }
    }

    #[must_use]
    pub const fn with_flatness(mut self, flatness:f32) -> Self {
        self.flatness = Some(flatness);
        self
    }

    #[must_use]
    pub const fn with_theta(mut self, theta:f32) -> Self {
        self.theta = theta;
        self
    }

    #[must_use]
    pub const fn with_normal(mut self, normal:Vec3, blend:f32) -> Self {
        self.normal = Some(normal);
        self.normal_blend = Some(blend);
        self
    }

    /// Check the sector against the vertex it is attached to. Returns a copy with a unit normal.
    pub fn validated(&self, vertex:VertexTag) -> Result<Self, SectorError> {
        let Some(kind) = RuleKind::select(vertex, self.tag) else {
            return Err(SectorError::TagMismatch { vertex, sector: self.tag });
        };
        if !kind.accepts_theta(self.theta) {
            return Err(SectorError::ThetaOutOfRange { tag: self.tag, theta: self.theta });
        }
        for (name, value) in [("flatness", self.flatness), ("normal blend", self.normal_blend)] {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(SectorError::BlendOutOfRange { name, value });
                }
            }
        }
        let mut result = *self;
        if let Some(normal) = self.normal {
            let unit = normal.try_normalize().ok_or(SectorError::ZeroNormal)?;
            if (normal.length() - 1.0).abs() > 1e-3 {
                warn!(?normal, "sector normal isn't unit length, normalizing");
            }
            result.normal = Some(unit);
        }
        Ok(result)
    }

    /// Flatness that actually moves points
    pub fn flatness_factor(&self) -> Option<f32> {
        self.flatness.filter(|&flatness| flatness > 0.0)
    }

    /// Normal and blend that actually move points
    pub fn normal_target(&self) -> Option<(Vec3, f32)> {
        let normal = self.normal?;
        let blend = self.normal_blend.unwrap_or(1.0);
        (blend > 0.0).then_some((normal, blend))
    }

    /// Whether this sector changes the surface at all
    pub fn is_active(&self) -> bool {
        self.flatness_factor().is_some() || self.normal_target().is_some()
    }

    /// Move a new point towards the tangent plane and the target normal.
    /// `x1` and `x2` are the point's entries in the right eigenvectors of the sector rule.
    pub(crate) fn reshape(&self, point:Vec3, frame:&SectorFrame, x1:f32, x2:f32) -> Vec3 {
        let mut result = point;
        if let Some(flatness) = self.flatness_factor() {
            let flat = frame.limit + frame.lambda1 * x1 * frame.tangent1 + frame.lambda2 * x2 * frame.tangent2;
            result = (1.0 - flatness) * result + flatness * flat;
        }
        if let Some((normal, blend)) = self.normal_target() {
            let (tangent1, tangent2) = if frame.open {
                frame.open_tangents(normal)
            } else {
                (reject(frame.tangent1, normal), reject(frame.tangent2, normal))
            };
            result += blend * (
                frame.lambda1 * x1 * (tangent1 - frame.tangent1)
                + frame.lambda2 * x2 * (tangent2 - frame.tangent2)
            );
        }
        result
    }
}

/// Component of `v` orthogonal to the unit vector `normal`
#[inline]
fn reject(v:Vec3, normal:Vec3) -> Vec3 {
    v - v.dot(normal) * normal
}

#[derive(Copy, Clone, Debug)]
/// Limit point and tangents of one sector at the current level
pub(crate) struct SectorFrame {
    pub limit: Vec3,
    pub tangent1: Vec3,
    pub tangent2: Vec3,
    pub lambda1: f32,
    pub lambda2: f32,
    pub open: bool,
    /// Target normal of the sector across the crease, if it has one
    pub neighbor_normal: Option<Vec3>,
}

impl SectorFrame {
    pub fn new(rule:&QuadRule, ring:&RingSample, open:bool, neighbor_normal:Option<Vec3>) -> Self {
        Self {
            limit: rule.l0.apply(ring),
            tangent1: rule.l1.apply(ring),
            tangent2: rule.l2.apply(ring),
            lambda1: rule.lambda1,
            lambda2: rule.lambda2,
            open,
            neighbor_normal,
        }
    }

    /// Tangents rotated into the plane orthogonal to `normal`, keeping their lengths.
    /// The crease tangent follows the intersection of both sector planes when the sector
    /// across the crease has its own normal.
    fn open_tangents(&self, normal:Vec3) -> (Vec3, Vec3) {
        let rotate = |tangent:Vec3| {
            let projected = reject(tangent, normal);
            projected.try_normalize().map_or(projected, |direction| direction * tangent.length())
        };
        let crease = self.neighbor_normal
            .map(|other| other.cross(normal))
            .filter(|direction| direction.abs().element_sum() > 1e-3)
            .map(|direction| {
                let direction = direction.normalize();
                let direction = if direction.dot(self.tangent2) < 0.0 { -direction } else { direction };
                direction * self.tangent2.length()
            });
        (rotate(self.tangent1), crease.unwrap_or_else(|| rotate(self.tangent2)))
    }
}

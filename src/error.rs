//! Umbrella error for a subdivision pass.

use thiserror::Error;

use crate::{mesh::{sector::SectorError, traversal::TraversalError, MeshConstructionError}, rules::RuleError};

/// Anything that can stop [`crate::Subdivider::subdivide`].
///
/// A failed pass leaves the mesh at whatever depth it reached. Callers that need
/// atomicity should subdivide a clone.
#[derive(Debug, Error)]
pub enum SubdivisionError {
    #[error(transparent)]
    Construction(#[from] MeshConstructionError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error(transparent)]
    Sector(#[from] SectorError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

pub type SubdivisionResult<T> = Result<T, SubdivisionError>;

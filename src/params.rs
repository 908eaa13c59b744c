//! Subdivision parameters.

/// We really don't expect more than this many faces around a single vertex
pub const RING_LOOP_LIMIT:usize = 32;

/// Parameters for a [`crate::Subdivider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdivisionParams {
    /// Number of refinement levels [`crate::Subdivider::run`] computes.
    pub levels: usize,

    /// Maximum number of faces a ring walk may visit before the mesh is
    /// considered malformed.
    pub max_ring_size: usize,

    /// Evaluate limit positions and normals for the finest level after a pass.
    pub compute_limit_normals: bool,
}

impl Default for SubdivisionParams {
    fn default() -> Self {
        Self {
            levels: 1,
            max_ring_size: RING_LOOP_LIMIT,
            compute_limit_normals: true,
        }
    }
}

impl SubdivisionParams {
    /// Create new parameters with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of refinement levels.
    #[must_use]
    pub const fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Set the ring walk probe limit.
    #[must_use]
    pub const fn with_max_ring_size(mut self, max_ring_size: usize) -> Self {
        self.max_ring_size = max_ring_size;
        self
    }

    /// Set whether limit positions and normals are evaluated after a pass.
    #[must_use]
    pub const fn with_limit_normals(mut self, compute: bool) -> Self {
        self.compute_limit_normals = compute;
        self
    }
}

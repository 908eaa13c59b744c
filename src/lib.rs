pub mod error;
pub mod mesh;
pub mod mesh_builders;
pub mod params;
pub mod rules;

pub(crate) const OPTIMIZE_FOR_NGONS_UNDER_SIZE:usize = 4; // optimize for quads (reduces used stack space)

pub use error::{SubdivisionError, SubdivisionResult};
pub use mesh::{mesh_ops::{subdivide, Subdivider}, Sector, SectorTag, SubdivisionMesh, VertexTag};
pub use mesh_builders::{build_control_mesh, ControlMesh};
pub use params::SubdivisionParams;

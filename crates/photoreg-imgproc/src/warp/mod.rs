mod perspective;
pub use perspective::{transform_point, warp_perspective};

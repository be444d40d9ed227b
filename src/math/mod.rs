pub mod polygon_2d;
pub mod polygon_3d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Rigid transform (rotation + translation).
pub type Isometry3 = nalgebra::Isometry3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Distance within which a point is considered to lie on a plane (native length units).
pub const PLANE_TOLERANCE: f64 = 1e-7;

/// Smallest area treated as a real polygon (native area units).
pub const AREA_EPSILON: f64 = 1e-9;

/// Smallest volume kept by cell splitting; thinner fragments are slivers.
pub const SLIVER_VOLUME: f64 = 1e-10;

/// Smallest volume treated as a real solid (native volume units).
pub const VOLUME_EPSILON: f64 = 1e-6;

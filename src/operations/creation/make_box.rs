use crate::error::Result;
use crate::math::Point3;
use crate::topology::{ConvexCell, Solid};

/// Creates an axis-aligned box solid from two corner points.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation. The corners may come in any order.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the box has zero extent along any axis.
    pub fn execute(&self) -> Result<Solid> {
        let a = self.min_corner;
        let b = self.max_corner;
        let min = Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        Ok(Solid::from_cells(vec![ConvexCell::cuboid(&min, &max)?]))
    }
}

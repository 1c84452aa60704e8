use geo::{coord, Coord, LineString, Polygon, Rect};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the format (x1, y1, x2, y2)
///
/// The constructor normalizes the corners, so `x1 <= x2` and `y1 <= y2` always hold.
///
#[derive(Clone, Default, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self { x1, y1, x2, y2 }
    }

    /// Constructor from the (left, top, width, height) format used by most detectors
    ///
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Center of the box
    ///
    pub fn center(&self) -> Point2<f32> {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Moves the box by the offset, keeping its size
    ///
    pub fn shift(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// All the coordinates are finite numbers
    ///
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

/// Manhattan (L1) distance between two points
///
pub fn manhattan(a: &Point2<f32>, b: &Point2<f32>) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

impl From<&BoundingBox> for Rect<f64> {
    fn from(b: &BoundingBox) -> Self {
        Rect::new(
            coord! { x: b.x1 as f64, y: b.y1 as f64 },
            coord! { x: b.x2 as f64, y: b.y2 as f64 },
        )
    }
}

impl From<&BoundingBox> for Polygon<f64> {
    fn from(b: &BoundingBox) -> Self {
        let (x1, y1, x2, y2) = (b.x1 as f64, b.y1 as f64, b.x2 as f64, b.y2 as f64);
        Polygon::new(
            LineString(vec![
                Coord { x: x1, y: y1 },
                Coord { x: x2, y: y1 },
                Coord { x: x2, y: y2 },
                Coord { x: x1, y: y2 },
            ]),
            vec![],
        )
    }
}

impl From<(f32, f32, f32, f32)> for BoundingBox {
    fn from((x1, y1, x2, y2): (f32, f32, f32, f32)) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{manhattan, BoundingBox};
    use crate::EPS;
    use geo::{Area, Polygon};

    #[test]
    fn normalized_corners() {
        let b = BoundingBox::new(150.0, 150.0, 50.0, 50.0);
        assert_eq!(b, BoundingBox::new(50.0, 50.0, 150.0, 150.0));
        assert!((b.width() - 100.0).abs() < EPS);
        assert!((b.area() - 10000.0).abs() < EPS);
    }

    #[test]
    fn center_and_shift() {
        let b = BoundingBox::ltwh(450.0, 450.0, 100.0, 100.0);
        let c = b.center();
        assert!((c.x - 500.0).abs() < EPS);
        assert!((c.y - 500.0).abs() < EPS);

        let moved = b.shift(4.0, 7.0);
        assert!((manhattan(&c, &moved.center()) - 11.0).abs() < EPS);
    }

    #[test]
    fn polygon_area() {
        let b = BoundingBox::new(0.0, 0.0, 4.0, 2.0);
        let p = Polygon::from(&b);
        assert!((p.unsigned_area() - 8.0).abs() < EPS as f64);
    }

    #[test]
    fn non_finite() {
        assert!(!BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_finite());
    }
}

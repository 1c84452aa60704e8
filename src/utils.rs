/// Bounding boxes
pub mod bbox;

/// Box and polygon intersection, polygon validation
pub mod geometry;

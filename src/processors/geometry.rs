//! Geometric primitives for text detection post-processing.
//!
//! Provides point and bounding box representations together with the
//! algorithms the DB postprocessor needs: shoelace area, perimeter, convex
//! hulls, and minimum area rectangles.

use imageproc::contours::Contour;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A bounding box represented by a collection of points.
///
/// Detection boxes are quadrilaterals (4 points ordered top-left, top-right,
/// bottom-right, bottom-left), but intermediate contours may carry more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    /// The points that define the bounding box.
    pub points: Vec<Point>,
}

impl BoundingBox {
    /// Creates a new bounding box from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned rectangle from corner coordinates.
    ///
    /// # Arguments
    ///
    /// * `x1` - The x-coordinate of the top-left corner.
    /// * `y1` - The y-coordinate of the top-left corner.
    /// * `x2` - The x-coordinate of the bottom-right corner.
    /// * `y2` - The y-coordinate of the bottom-right corner.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let points = vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ];
        Self { points }
    }

    /// Creates a bounding box from an imageproc contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|p| Point::new(p.x as f32, p.y as f32))
            .collect();
        Self { points }
    }

    /// Calculates the area of the bounding box using the shoelace formula.
    ///
    /// Returns 0.0 if the bounding box has fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// Calculates the perimeter of the bounding box.
    pub fn perimeter(&self) -> f32 {
        let mut perimeter = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let dx = self.points[j].x - self.points[i].x;
            let dy = self.points[j].y - self.points[i].y;
            perimeter += (dx * dx + dy * dy).sqrt();
        }
        perimeter
    }

    /// Gets the minimum x-coordinate of all points, or 0.0 if there are none.
    pub fn x_min(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::INFINITY, f32::min)
    }

    /// Gets the minimum y-coordinate of all points, or 0.0 if there are none.
    pub fn y_min(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min)
    }

    /// Gets the maximum x-coordinate of all points, or 0.0 if there are none.
    pub fn x_max(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Gets the maximum y-coordinate of all points, or 0.0 if there are none.
    pub fn y_max(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Width of the axis-aligned extent of all points.
    pub fn width(&self) -> f32 {
        self.x_max() - self.x_min()
    }

    /// Height of the axis-aligned extent of all points.
    pub fn height(&self) -> f32 {
        self.y_max() - self.y_min()
    }

    /// Computes the convex hull of the bounding box using Graham's scan algorithm.
    ///
    /// If the bounding box has fewer than 3 points, returns a clone of the
    /// original bounding box.
    fn convex_hull(&self) -> BoundingBox {
        if self.points.len() < 3 {
            return self.clone();
        }

        let mut points = self.points.clone();

        // Find the point with the lowest y-coordinate (and leftmost if tied)
        let mut start_idx = 0;
        for i in 1..points.len() {
            if points[i].y < points[start_idx].y
                || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
            {
                start_idx = i;
            }
        }
        points.swap(0, start_idx);
        let start_point = points[0];

        // Sort points by polar angle with respect to the start point
        points[1..].sort_by(|a, b| {
            let cross = Self::cross_product(&start_point, a, b);
            if cross == 0.0 {
                // If points are collinear, sort by distance from start point
                let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
                let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
                dist_a
                    .partial_cmp(&dist_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else if cross > 0.0 {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        // Build the convex hull using a stack
        let mut hull = Vec::new();
        for point in points {
            // Remove points that make clockwise turns
            while hull.len() > 1
                && Self::cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
            {
                hull.pop();
            }
            hull.push(point);
        }

        BoundingBox::new(hull)
    }

    /// Computes the cross product of three points.
    ///
    /// Positive means a counter-clockwise turn, negative a clockwise turn,
    /// zero collinearity.
    fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
        (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
    }

    /// Computes the minimum area rectangle that encloses the bounding box.
    ///
    /// This method uses the rotating calipers algorithm on the convex hull of
    /// the bounding box to find the minimum area rectangle.
    ///
    /// # Returns
    ///
    /// A `MinAreaRect` representing the minimum area rectangle. If the
    /// bounding box has fewer than 3 points, returns a rectangle with zero
    /// dimensions.
    pub fn get_min_area_rect(&self) -> MinAreaRect {
        if self.points.len() < 3 {
            return MinAreaRect {
                center: Point::new(0.0, 0.0),
                width: 0.0,
                height: 0.0,
                angle: 0.0,
            };
        }

        // Get the convex hull of the bounding box
        let hull = self.convex_hull();
        let hull_points = &hull.points;

        // Handle degenerate cases
        if hull_points.len() < 3 {
            let (min_x, max_x) = match self.points.iter().map(|p| p.x).minmax().into_option() {
                Some((min, max)) => (min, max),
                None => {
                    return MinAreaRect {
                        center: Point::new(0.0, 0.0),
                        width: 0.0,
                        height: 0.0,
                        angle: 0.0,
                    };
                }
            };

            let (min_y, max_y) = match self.points.iter().map(|p| p.y).minmax().into_option() {
                Some((min, max)) => (min, max),
                None => {
                    return MinAreaRect {
                        center: Point::new(0.0, 0.0),
                        width: 0.0,
                        height: 0.0,
                        angle: 0.0,
                    };
                }
            };

            let center = Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
            let width = max_x - min_x;
            let height = max_y - min_y;

            return MinAreaRect {
                center,
                width,
                height,
                angle: 0.0,
            };
        }

        // Find the minimum area rectangle using rotating calipers
        let mut min_area = f32::MAX;
        let mut min_rect = MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };

        let n = hull_points.len();
        for i in 0..n {
            let j = (i + 1) % n;

            // Calculate the edge vector
            let edge_x = hull_points[j].x - hull_points[i].x;
            let edge_y = hull_points[j].y - hull_points[i].y;
            let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

            // Skip degenerate edges
            if edge_length < f32::EPSILON {
                continue;
            }

            // Normalize the edge vector
            let nx = edge_x / edge_length;
            let ny = edge_y / edge_length;

            // Calculate the perpendicular vector
            let px = -ny;
            let py = nx;

            // Project all points onto the edge and perpendicular vectors
            let mut min_n = f32::MAX;
            let mut max_n = f32::MIN;
            let mut min_p = f32::MAX;
            let mut max_p = f32::MIN;

            for k in 0..n {
                let point = &hull_points[k];

                let proj_n = nx * (point.x - hull_points[i].x) + ny * (point.y - hull_points[i].y);
                min_n = min_n.min(proj_n);
                max_n = max_n.max(proj_n);

                let proj_p = px * (point.x - hull_points[i].x) + py * (point.y - hull_points[i].y);
                min_p = min_p.min(proj_p);
                max_p = max_p.max(proj_p);
            }

            // Calculate the width, height, and area of the rectangle
            let width = max_n - min_n;
            let height = max_p - min_p;
            let area = width * height;

            // Update the minimum area rectangle if this one is smaller
            if area < min_area {
                min_area = area;

                let center_n = (min_n + max_n) / 2.0;
                let center_p = (min_p + max_p) / 2.0;

                let center_x = hull_points[i].x + center_n * nx + center_p * px;
                let center_y = hull_points[i].y + center_n * ny + center_p * py;

                let angle_rad = f32::atan2(ny, nx);
                let angle_deg = angle_rad * 180.0 / PI;

                min_rect = MinAreaRect {
                    center: Point::new(center_x, center_y),
                    width,
                    height,
                    angle: angle_deg,
                };
            }
        }

        min_rect
    }
}

/// A rectangle with minimum area that encloses a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinAreaRect {
    /// The center point of the rectangle.
    pub center: Point,
    /// The width of the rectangle.
    pub width: f32,
    /// The height of the rectangle.
    pub height: f32,
    /// The rotation angle of the rectangle in degrees.
    pub angle: f32,
}

impl MinAreaRect {
    /// Returns a copy of this rectangle grown by `margin` on every side.
    ///
    /// The center and angle are unchanged; width and height each grow by
    /// `2.0 * margin`.
    pub fn expand(&self, margin: f32) -> Self {
        Self {
            center: self.center,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
            angle: self.angle,
        }
    }

    /// Gets the four corner points of the rectangle.
    ///
    /// # Returns
    ///
    /// A vector containing the four corner points of the rectangle ordered as:
    /// top-left, top-right, bottom-right, bottom-left in the final image
    /// coordinate system.
    pub fn get_box_points(&self) -> Vec<Point> {
        let cos_a = (self.angle * PI / 180.0).cos();
        let sin_a = (self.angle * PI / 180.0).sin();

        let w_2 = self.width / 2.0;
        let h_2 = self.height / 2.0;

        let corners = [(-w_2, -h_2), (w_2, -h_2), (w_2, h_2), (-w_2, h_2)];

        let mut points: Vec<Point> = corners
            .iter()
            .map(|(x, y)| {
                let rotated_x = x * cos_a - y * sin_a + self.center.x;
                let rotated_y = x * sin_a + y * cos_a + self.center.y;
                Point::new(rotated_x, rotated_y)
            })
            .collect();

        // Sort points to ensure consistent ordering: top-left, top-right, bottom-right, bottom-left
        Self::sort_box_points(&mut points);
        points
    }

    /// Sorts four points into top-left, top-right, bottom-right, bottom-left
    /// order based on their position relative to the centroid.
    fn sort_box_points(points: &mut [Point]) {
        if points.len() != 4 {
            return;
        }

        let center_x = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let center_y = points.iter().map(|p| p.y).sum::<f32>() / 4.0;

        let mut classified_points = Vec::with_capacity(4);

        for point in points.iter() {
            let is_left = point.x < center_x;
            let is_top = point.y < center_y;

            let corner_type = match (is_left, is_top) {
                (true, true) => 0,   // top-left
                (false, true) => 1,  // top-right
                (false, false) => 2, // bottom-right
                (true, false) => 3,  // bottom-left
            };

            classified_points.push((corner_type, *point));
        }

        classified_points.sort_by_key(|&(corner_type, _)| corner_type);

        // Very thin or strongly rotated rectangles can classify two corners
        // into the same quadrant
        let mut corner_types = HashSet::new();
        for (corner_type, _) in &classified_points {
            corner_types.insert(*corner_type);
        }

        if corner_types.len() < 4 {
            Self::sort_box_points_by_angle(points, center_x, center_y);
        } else {
            for (i, (_, point)) in classified_points.iter().enumerate() {
                points[i] = *point;
            }
        }
    }

    /// Fallback sorting method using polar angles from the centroid.
    fn sort_box_points_by_angle(points: &mut [Point], center_x: f32, center_y: f32) {
        let mut points_with_angles: Vec<(f32, Point)> = points
            .iter()
            .map(|p| {
                let angle = f32::atan2(p.y - center_y, p.x - center_x);
                // Normalize so that the top-left quadrant sorts first
                let normalized_angle = if angle < -PI / 2.0 {
                    angle + 2.0 * PI
                } else {
                    angle
                };
                (normalized_angle, *p)
            })
            .collect();

        points_with_angles
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        // Find the starting point (closest to top-left quadrant)
        let mut start_idx = 0;
        let mut min_top_left_score = f32::MAX;

        for (i, (_, point)) in points_with_angles.iter().enumerate() {
            let top_left_score =
                (point.x - center_x + 100.0).powi(2) + (point.y - center_y + 100.0).powi(2);
            if top_left_score < min_top_left_score {
                min_top_left_score = top_left_score;
                start_idx = i;
            }
        }

        for (i, point) in points.iter_mut().enumerate().take(4) {
            let src_idx = (start_idx + i) % 4;
            *point = points_with_angles[src_idx].1;
        }
    }

    /// Gets the length of the shorter side of the rectangle.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_min_max_coords() {
        let bbox = BoundingBox::from_coords(10.0, 20.0, 100.0, 80.0);
        assert_eq!(bbox.x_min(), 10.0);
        assert_eq!(bbox.y_min(), 20.0);
        assert_eq!(bbox.x_max(), 100.0);
        assert_eq!(bbox.y_max(), 80.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 60.0);
    }

    #[test]
    fn test_shoelace_area_and_perimeter_of_rectangle() {
        let bbox = BoundingBox::from_coords(0.0, 0.0, 10.0, 4.0);
        assert!((bbox.area() - 40.0).abs() < 1e-4);
        assert!((bbox.perimeter() - 28.0).abs() < 1e-4);
    }

    #[test]
    fn test_area_of_degenerate_box_is_zero() {
        let bbox = BoundingBox::new(vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)]);
        assert_eq!(bbox.area(), 0.0);
    }

    #[test]
    fn test_min_area_rect_of_axis_aligned_points() {
        let bbox = BoundingBox::from_coords(2.0, 3.0, 12.0, 7.0);
        let rect = bbox.get_min_area_rect();

        // For an axis-aligned rectangle the minimum area rectangle has the
        // same dimensions, up to the orientation of the reported sides.
        let (short, long) = (rect.min_side(), rect.width.max(rect.height));
        assert!((short - 4.0).abs() < 1e-3, "short side: {short}");
        assert!((long - 10.0).abs() < 1e-3, "long side: {long}");
        assert!((rect.center.x - 7.0).abs() < 1e-3);
        assert!((rect.center.y - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_get_box_points_orders_corners() {
        let rect = MinAreaRect {
            center: Point::new(5.0, 5.0),
            width: 8.0,
            height: 4.0,
            angle: 0.0,
        };
        let points = rect.get_box_points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Point::new(1.0, 3.0)); // top-left
        assert_eq!(points[1], Point::new(9.0, 3.0)); // top-right
        assert_eq!(points[2], Point::new(9.0, 7.0)); // bottom-right
        assert_eq!(points[3], Point::new(1.0, 7.0)); // bottom-left
    }

    #[test]
    fn test_expand_grows_both_sides() {
        let rect = MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 10.0,
            height: 2.0,
            angle: 30.0,
        };
        let grown = rect.expand(1.5);
        assert_eq!(grown.width, 13.0);
        assert_eq!(grown.height, 5.0);
        assert_eq!(grown.angle, rect.angle);
        assert_eq!(grown.center, rect.center);
    }
}

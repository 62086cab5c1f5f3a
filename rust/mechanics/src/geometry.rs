// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar geometry helpers shared by the detector and the snapping engine.

use nalgebra::{Rotation2, Vector2};

use crate::types::{Part, Point2D};

/// Rotates a point given in a local frame by `degrees` and translates it to `origin`.
pub fn rotate_about(local: &Point2D, origin: &Point2D, degrees: f64) -> Point2D {
    let rotation = Rotation2::new(degrees.to_radians());
    let rotated = rotation * Vector2::new(local.x, local.y);
    Point2D::new(origin.x + rotated.x, origin.y + rotated.y)
}

/// `acos` with its argument clamped to [-1, 1].
pub fn clamped_acos(value: f64) -> f64 {
    value.clamp(-1.0, 1.0).acos()
}

/// Unsigned angle between two vectors in radians. Zero-length input yields 0.
pub fn angle_between(a: (f64, f64), b: (f64, f64)) -> f64 {
    let len_a = (a.0 * a.0 + a.1 * a.1).sqrt();
    let len_b = (b.0 * b.0 + b.1 * b.1).sqrt();
    if len_a < 1e-10 || len_b < 1e-10 {
        return 0.0;
    }
    clamped_acos((a.0 * b.0 + a.1 * b.1) / (len_a * len_b))
}

/// Rounds a point to the nearest grid intersection.
pub fn round_to_grid(point: &Point2D, grid: f64) -> Point2D {
    if grid <= 0.0 {
        return *point;
    }
    Point2D::new(
        (point.x / grid).round() * grid,
        (point.y / grid).round() * grid,
    )
}

fn cross(o: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn within_box(p: &Point2D, a: &Point2D, b: &Point2D) -> bool {
    p.x >= a.x.min(b.x) - 1e-9
        && p.x <= a.x.max(b.x) + 1e-9
        && p.y >= a.y.min(b.y) - 1e-9
        && p.y <= a.y.max(b.y) + 1e-9
}

/// Whether segment `p1-p2` intersects segment `p3-p4` (touching counts).
pub fn segments_intersect(p1: &Point2D, p2: &Point2D, p3: &Point2D, p4: &Point2D) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear and touching cases
    (d1.abs() < 1e-9 && within_box(p1, p3, p4))
        || (d2.abs() < 1e-9 && within_box(p2, p3, p4))
        || (d3.abs() < 1e-9 && within_box(p3, p1, p2))
        || (d4.abs() < 1e-9 && within_box(p4, p1, p2))
}

/// Projection of a point onto a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Closest point on the segment
    pub point: Point2D,
    /// Unclamped parameter along the segment (0 at start, 1 at end)
    pub t: f64,
    /// Distance from the query point to `point`
    pub distance: f64,
}

impl Projection {
    /// Whether the perpendicular foot falls within the segment.
    pub fn is_within_span(&self) -> bool {
        (0.0..=1.0).contains(&self.t)
    }
}

/// Projects `point` onto the segment `start-end`.
pub fn project_onto_segment(point: &Point2D, start: &Point2D, end: &Point2D) -> Projection {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-10 {
        return Projection {
            point: *start,
            t: 0.0,
            distance: point.distance_to(start),
        };
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / len_sq;
    let clamped = t.clamp(0.0, 1.0);
    let foot = Point2D::new(start.x + clamped * dx, start.y + clamped * dy);
    Projection {
        point: foot,
        t,
        distance: point.distance_to(&foot),
    }
}

/// End points of a drive shaft, half its length either side of the centre.
///
/// Returns `None` for anything that is not an axle.
pub fn axle_tips(part: &Part) -> Option<[Point2D; 2]> {
    let orientation = match part.kind {
        crate::types::PartKind::Axle { orientation, .. } => orientation,
        _ => return None,
    };
    let half = part.span_length() / 2.0;
    let (ax, ay) = orientation.axis();
    Some([
        part.position.offset(-ax * half, -ay * half),
        part.position.offset(ax * half, ay * half),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxleOrientation;
    use approx::assert_relative_eq;

    #[test]
    fn crossing_segments_intersect() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 10.0);
        let c = Point2D::new(0.0, 10.0);
        let d = Point2D::new(10.0, 0.0);
        assert!(segments_intersect(&a, &b, &c, &d));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 0.0);
        let c = Point2D::new(0.0, 1.0);
        let d = Point2D::new(10.0, 1.0);
        assert!(!segments_intersect(&a, &b, &c, &d));
    }

    #[test]
    fn touching_endpoint_counts() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(5.0, 0.0);
        let c = Point2D::new(5.0, -5.0);
        let d = Point2D::new(5.0, 5.0);
        assert!(segments_intersect(&a, &b, &c, &d));
    }

    #[test]
    fn projection_reports_span() {
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(100.0, 0.0);
        let inside = project_onto_segment(&Point2D::new(40.0, 12.0), &start, &end);
        assert!(inside.is_within_span());
        assert_relative_eq!(inside.distance, 12.0);
        assert_relative_eq!(inside.point.x, 40.0);

        let outside = project_onto_segment(&Point2D::new(130.0, 0.0), &start, &end);
        assert!(!outside.is_within_span());
        assert_relative_eq!(outside.distance, 30.0);
    }

    #[test]
    fn degenerate_segment_projects_to_start() {
        let p = Point2D::new(3.0, 4.0);
        let origin = Point2D::new(0.0, 0.0);
        let proj = project_onto_segment(&p, &origin, &origin);
        assert_relative_eq!(proj.distance, 5.0);
    }

    #[test]
    fn angle_between_is_clamped() {
        assert_relative_eq!(angle_between((1.0, 0.0), (2.0, 0.0)), 0.0);
        assert_relative_eq!(
            angle_between((1.0, 0.0), (0.0, 3.0)),
            std::f64::consts::FRAC_PI_2
        );
        assert_eq!(angle_between((0.0, 0.0), (1.0, 0.0)), 0.0);
        assert!(clamped_acos(1.0000001).is_finite());
    }

    #[test]
    fn vertical_axle_tips() {
        let axle = Part::axle(1, 4, AxleOrientation::Vertical, 100.0, 100.0);
        let [top, bottom] = axle_tips(&axle).unwrap();
        assert_relative_eq!(top.y, 60.0);
        assert_relative_eq!(bottom.y, 140.0);
        assert_relative_eq!(top.x, 100.0);
        assert!(axle_tips(&Part::spur(2, 10, 0.0, 0.0)).is_none());
    }

    #[test]
    fn grid_rounding() {
        let p = round_to_grid(&Point2D::new(29.0, -11.0), 20.0);
        assert_relative_eq!(p.x, 20.0);
        assert_relative_eq!(p.y, -20.0);
    }
}

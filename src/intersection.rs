// src/intersection.rs

use crate::geometry::{Point2, Segment};

/// Determinants smaller than this are treated as parallel/collinear.
pub const DETERMINANT_EPSILON: f32 = 1e-9;

/// World distance past a segment end that still counts as a hit for a ray
/// aimed exactly at a corner, so it registers against an edge meeting there.
pub const CORNER_SLACK: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub point: Point2,
    /// Parameter along the first segment / ray.
    pub t: f32,
    /// Parameter along the second segment, in `[0, 1]`.
    pub u: f32,
}

/// Solves `p + t * r == q + u * s` for `(t, u)`.
#[inline(always)]
fn solve(p: &Point2, r: &Point2, q: &Point2, s: &Point2) -> Option<(f32, f32)> {
    let denominator = r.cross(s);
    if denominator.abs() < DETERMINANT_EPSILON {
        return None;
    }
    let qp = *q - *p;
    let t = qp.cross(s) / denominator;
    let u = qp.cross(r) / denominator;
    if !t.is_finite() || !u.is_finite() {
        return None;
    }
    Some((t, u))
}

/// Intersection of segments `a1-a2` and `b1-b2`; both parameters must lie in `[0, 1]`.
pub fn segment_intersection(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> Option<Intersection> {
    let r = *a2 - *a1;
    let s = *b2 - *b1;
    let (t, u) = solve(a1, &r, b1, &s)?;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(Intersection { point: *a1 + r * t, t, u })
}

/// Nearest-hit query of a ray against one segment.
///
/// `direction` need not be normalized; `t` is expressed in multiples of it.
/// `end_slack` is a world distance the segment is extended by at both ends.
pub fn ray_segment_intersection(
    origin: &Point2,
    direction: &Point2,
    segment: &Segment,
    end_slack: f32,
) -> Option<Intersection> {
    let s = segment.b - segment.a;
    let (t, u) = solve(origin, direction, &segment.a, &s)?;
    let u_slack = end_slack / s.length();
    if t < 0.0 || u < -u_slack || u > 1.0 + u_slack {
        return None;
    }
    Some(Intersection {
        point: *origin + *direction * t,
        t,
        u: u.clamp(0.0, 1.0),
    })
}

/// Closest segment hit along a ray, ignoring hits beyond `max_t`.
pub fn nearest_ray_hit(
    origin: &Point2,
    direction: &Point2,
    segments: &[Segment],
    max_t: f32,
    end_slack: f32,
) -> Option<Intersection> {
    let mut best: Option<Intersection> = None;
    for segment in segments {
        let Some(hit) = ray_segment_intersection(origin, direction, segment, end_slack) else { continue };
        if hit.t > max_t {
            continue;
        }
        match best {
            Some(current) if current.t <= hit.t => {}
            _ => best = Some(hit),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f32, y: f32) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn crossing_diagonals_meet_in_the_middle() {
        let hit = segment_intersection(&p(0.0, 0.0), &p(10.0, 10.0), &p(0.0, 10.0), &p(10.0, 0.0))
            .expect("diagonals cross");
        assert_relative_eq!(hit.point.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.point.y, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.t, 0.5, epsilon = 1e-6);
        assert_relative_eq!(hit.u, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(segment_intersection(&p(0.0, 0.0), &p(10.0, 0.0), &p(0.0, 1.0), &p(10.0, 1.0)).is_none());
    }

    #[test]
    fn collinear_segments_do_not_intersect() {
        assert!(segment_intersection(&p(0.0, 0.0), &p(10.0, 0.0), &p(5.0, 0.0), &p(15.0, 0.0)).is_none());
    }

    #[test]
    fn disjoint_segments_do_not_intersect() {
        assert!(segment_intersection(&p(0.0, 0.0), &p(1.0, 1.0), &p(5.0, 0.0), &p(5.0, 10.0)).is_none());
    }

    #[test]
    fn ray_behind_origin_is_rejected() {
        let wall = Segment::new(p(-5.0, -1.0), p(-5.0, 1.0));
        assert!(ray_segment_intersection(&p(0.0, 0.0), &p(1.0, 0.0), &wall, 0.0).is_none());
        let hit = ray_segment_intersection(&p(0.0, 0.0), &p(-1.0, 0.0), &wall, 0.0).expect("wall ahead");
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn ray_through_endpoint_hits() {
        let wall = Segment::new(p(3.0, 3.0), p(3.0, 6.0));
        let hit = ray_segment_intersection(&p(0.0, 0.0), &p(1.0, 1.0), &wall, CORNER_SLACK).expect("grazes corner");
        assert_relative_eq!(hit.point.x, 3.0, epsilon = 1e-4);
        assert_relative_eq!(hit.point.y, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn end_slack_is_a_world_distance() {
        // Passes 2e-4 below the end of the wall, whatever the wall's length.
        let direction = p(1.0, -2e-4);
        for length in [1.0, 32.0, 1000.0] {
            let wall = Segment::new(p(1.0, 0.0), p(1.0, length));
            assert!(ray_segment_intersection(&p(0.0, 0.0), &direction, &wall, 0.0).is_none());
            assert!(ray_segment_intersection(&p(0.0, 0.0), &direction, &wall, 1e-4).is_none());
            assert!(ray_segment_intersection(&p(0.0, 0.0), &direction, &wall, CORNER_SLACK).is_some());
        }
    }

    #[test]
    fn nearest_hit_prefers_closest_segment() {
        let walls = [
            Segment::new(p(10.0, -1.0), p(10.0, 1.0)),
            Segment::new(p(4.0, -1.0), p(4.0, 1.0)),
            Segment::new(p(7.0, -1.0), p(7.0, 1.0)),
        ];
        let hit = nearest_ray_hit(&p(0.0, 0.0), &p(1.0, 0.0), &walls, f32::MAX, 0.0).expect("hit");
        assert_relative_eq!(hit.point.x, 4.0, epsilon = 1e-5);
        assert!(nearest_ray_hit(&p(0.0, 0.0), &p(1.0, 0.0), &walls, 3.0, 0.0).is_none());
    }
}

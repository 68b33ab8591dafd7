// src/engine_lib/visibility.rs

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geometry::{point_in_polygon, polygon_area, Edge, Point2, Rect, Triangle, POINT_EPSILON};
use crate::intersection::{nearest_ray_hit, CORNER_SLACK};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Rays that hit nothing stop at this distance from the origin.
    pub max_range: f32,
    /// Angular offset (radians) of the two companion rays around each candidate point.
    pub angle_epsilon: f32,
    /// Tolerance for merging candidate points.
    pub point_epsilon: f32,
    /// Extra evenly spaced rays, so an open field still yields a closed polygon.
    pub boundary_rays: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            max_range: 1000.0,
            angle_epsilon: 1e-4,
            point_epsilon: POINT_EPSILON,
            boundary_rays: 0,
        }
    }
}

/// Hit points sorted counter-clockwise around `origin`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibilityPolygon {
    origin: Point2,
    points: Vec<Point2>,
}

impl VisibilityPolygon {
    pub fn origin(&self) -> Point2 {
        self.origin
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.points)
    }

    pub fn contains(&self, p: Point2) -> bool {
        point_in_polygon(p, &self.points)
    }

    /// True when the rect's centre or any corner is visible.
    pub fn overlaps_rect(&self, rect: &Rect) -> bool {
        self.contains(rect.center()) || rect.corners().iter().any(|c| self.contains(*c))
    }

    /// Closed triangle fan from the origin, one triangle per boundary edge.
    pub fn triangles(&self) -> Vec<Triangle> {
        let count = self.points.len();
        if count < 2 {
            return Vec::new();
        }
        (0..count)
            .map(|i| Triangle::new(self.origin, self.points[i], self.points[(i + 1) % count]))
            .collect()
    }
}

/// Ray directions paired with the end slack each ray may use. Only the ray
/// aimed straight at a candidate gets slack; its companions must be able to
/// slip past the corner.
fn ray_directions(origin: Point2, candidates: &[Point2], config: &VisibilityConfig) -> Vec<(Point2, f32)> {
    let mut directions = Vec::with_capacity(candidates.len() * 3 + config.boundary_rays as usize);
    for candidate in candidates {
        let Some(direction) = (*candidate - origin).normalized() else {
            // Candidate sits on the origin; there is no direction to cast along.
            continue;
        };
        directions.push((direction, CORNER_SLACK));
        directions.push((direction.rotated(-config.angle_epsilon), 0.0));
        directions.push((direction.rotated(config.angle_epsilon), 0.0));
    }
    let step = std::f32::consts::TAU / config.boundary_rays.max(1) as f32;
    for i in 0..config.boundary_rays {
        directions.push((Point2::new(1.0, 0.0).rotated(i as f32 * step), 0.0));
    }
    directions
}

/// Casts one ray through every candidate point plus two companions rotated by
/// `±angle_epsilon`, keeps the nearest edge hit per ray (or the range limit),
/// and sorts the hits by angle then distance.
pub fn compute_visibility(
    edges: &[Edge],
    candidates: &[Point2],
    origin: Point2,
    config: &VisibilityConfig,
) -> VisibilityPolygon {
    if !origin.is_finite() {
        log::warn!("visibility requested from non-finite origin {:?}", origin);
        return VisibilityPolygon { origin, points: Vec::new() };
    }

    let directions = ray_directions(origin, candidates, config);
    let mut hits: Vec<(f32, f32, Point2)> = Vec::with_capacity(directions.len());

    for (direction, end_slack) in &directions {
        let point = match nearest_ray_hit(&origin, direction, edges, config.max_range, *end_slack) {
            Some(hit) => hit.point,
            None => origin + *direction * config.max_range,
        };
        let relative = point - origin;
        hits.push((relative.angle(), relative.length(), point));
    }

    hits.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.total_cmp(&b.1),
        ordering => ordering,
    });

    log::trace!(
        "visibility from ({:.2}, {:.2}): {} rays against {} edges",
        origin.x,
        origin.y,
        directions.len(),
        edges.len()
    );

    VisibilityPolygon {
        origin,
        points: hits.into_iter().map(|(_, _, point)| point).collect(),
    }
}

/// Extrudes each edge away from `origin` out to `extent`, two triangles per
/// edge. The union covers everything the edges hide from `origin`.
pub fn shadow_triangles(edges: &[Edge], origin: Point2, extent: f32) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(edges.len() * 2);
    for edge in edges {
        let (Some(dir_a), Some(dir_b)) = ((edge.a - origin).normalized(), (edge.b - origin).normalized()) else {
            continue;
        };
        // Edge lies on a line through the origin; it casts no area.
        if dir_a.cross(&dir_b).abs() < 1e-6 {
            continue;
        }
        let far_a = origin + dir_a * extent;
        let far_b = origin + dir_b * extent;
        triangles.push(Triangle::new(edge.a, edge.b, far_b));
        triangles.push(Triangle::new(edge.a, far_b, far_a));
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::edges::edge_points;
    use crate::intersection::segment_intersection;
    use approx::assert_relative_eq;

    fn box_edges(rect: &Rect) -> Vec<Edge> {
        let c = rect.corners();
        (0..4).map(|i| Edge::new(c[i], c[(i + 1) % 4])).collect()
    }

    fn config(max_range: f32, boundary_rays: u32) -> VisibilityConfig {
        VisibilityConfig { max_range, boundary_rays, ..VisibilityConfig::default() }
    }

    #[test]
    fn open_field_is_a_regular_polygon_at_full_range() {
        let polygon = compute_visibility(&[], &[], Point2::new(3.0, -2.0), &config(50.0, 16));
        assert_eq!(polygon.len(), 16);
        for p in polygon.points() {
            assert_relative_eq!(p.distance(&Point2::new(3.0, -2.0)), 50.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn no_candidates_and_no_boundary_rays_is_empty() {
        let polygon = compute_visibility(&[], &[], Point2::ZERO, &config(10.0, 0));
        assert!(polygon.is_empty());
        assert!(polygon.triangles().is_empty());
    }

    #[test]
    fn every_ray_produces_a_point() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let candidates = edge_points(&edges, POINT_EPSILON);
        let polygon = compute_visibility(&edges, &candidates, Point2::new(1.3, 4.7), &config(20.0, 8));
        assert_eq!(polygon.len(), candidates.len() * 3 + 8);
    }

    #[test]
    fn candidate_at_origin_is_skipped() {
        let origin = Point2::new(1.0, 1.0);
        let polygon = compute_visibility(&[], &[origin, Point2::new(5.0, 1.0)], origin, &config(10.0, 0));
        assert_eq!(polygon.len(), 3);
    }

    #[test]
    fn points_are_sorted_by_angle() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let candidates = edge_points(&edges, POINT_EPSILON);
        let origin = Point2::new(1.3, 4.7);
        let polygon = compute_visibility(&edges, &candidates, origin, &config(20.0, 12));
        let angles: Vec<f32> = polygon.points().iter().map(|p| (*p - origin).angle()).collect();
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn hidden_corner_ray_stops_at_front_face() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let origin = Point2::new(1.3, 4.7);
        // (6, 4) is behind the box as seen from the origin.
        let polygon = compute_visibility(&edges, &[Point2::new(6.0, 4.0)], origin, &config(20.0, 0));
        for p in polygon.points() {
            assert_relative_eq!(p.x, 4.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn companion_ray_escapes_past_a_near_silhouette_corner() {
        let tile = Rect::new(0.0, 0.0, 32.0, 32.0);
        let edges = box_edges(&tile);
        let origin = Point2::new(-0.1, 1.0);
        let polygon = compute_visibility(&edges, &[Point2::ZERO], origin, &config(100.0, 0));

        assert_eq!(polygon.len(), 3);
        let distances: Vec<f32> = polygon.points().iter().map(|p| p.distance(&origin)).collect();
        assert!(distances.iter().any(|d| (d - 100.0).abs() < 1e-2), "no ray escaped: {:?}", distances);
        assert!(distances.iter().any(|d| *d < 1.1), "no ray reached the corner: {:?}", distances);
    }

    #[test]
    fn box_boundary_never_enters_the_box() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let candidates = edge_points(&edges, POINT_EPSILON);
        let origin = Point2::new(1.3, 4.7);
        let polygon = compute_visibility(&edges, &candidates, origin, &config(20.0, 16));
        let inner = Rect::new(4.05, 4.05, 1.9, 1.9);

        let points = polygon.points();
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            for step in 0..=32 {
                let s = a + (b - a) * (step as f32 / 32.0);
                assert!(!inner.contains(s), "boundary sample {:?} lies inside the occluder", s);
            }
        }
    }

    #[test]
    fn box_polygon_is_simple() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let candidates = edge_points(&edges, POINT_EPSILON);
        let origin = Point2::new(1.3, 4.7);
        let polygon = compute_visibility(&edges, &candidates, origin, &config(20.0, 16));
        let points = polygon.points();
        let n = points.len();
        for i in 0..n {
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let hit = segment_intersection(&points[i], &points[(i + 1) % n], &points[j], &points[(j + 1) % n]);
                if let Some(hit) = hit {
                    let interior = hit.t > 1e-3 && hit.t < 1.0 - 1e-3 && hit.u > 1e-3 && hit.u < 1.0 - 1e-3;
                    assert!(!interior, "edges {} and {} cross at {:?}", i, j, hit.point);
                }
            }
        }
    }

    #[test]
    fn visible_area_excludes_shadowed_region() {
        let rect = Rect::new(4.0, 4.0, 2.0, 2.0);
        let edges = box_edges(&rect);
        let candidates = edge_points(&edges, POINT_EPSILON);
        let origin = Point2::new(1.3, 4.7);
        let polygon = compute_visibility(&edges, &candidates, origin, &config(20.0, 32));
        assert!(polygon.contains(Point2::new(2.0, 5.0)));
        assert!(!polygon.contains(Point2::new(9.0, 5.0)));
        assert!(polygon.overlaps_rect(&Rect::new(1.5, 4.5, 0.5, 0.5)));
        assert!(!polygon.overlaps_rect(&Rect::new(8.0, 4.5, 1.0, 1.0)));
    }

    #[test]
    fn shadow_triangles_cover_region_behind_edge() {
        let wall = Edge::new(Point2::new(5.0, -1.0), Point2::new(5.0, 1.0));
        let triangles = shadow_triangles(&[wall], Point2::ZERO, 100.0);
        assert_eq!(triangles.len(), 2);
        let behind = Point2::new(20.0, 0.0);
        assert!(triangles.iter().any(|t| point_in_polygon(behind, &t.points)));
        let in_front = Point2::new(2.0, 0.0);
        assert!(!triangles.iter().any(|t| point_in_polygon(in_front, &t.points)));
    }

    #[test]
    fn edge_through_origin_casts_no_shadow() {
        let wall = Edge::new(Point2::new(1.0, 0.0), Point2::new(3.0, 0.0));
        assert!(shadow_triangles(&[wall], Point2::ZERO, 100.0).is_empty());
    }
}

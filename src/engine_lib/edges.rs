// src/engine_lib/edges.rs

use std::collections::{HashMap, HashSet};

use crate::geometry::{Edge, Point2, POINT_EPSILON};

/// One solid map cell, in tile units. Row 0 is the top row of the map file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub col: i32,
    pub row: i32,
}

impl TileCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// World-space dimensions used to turn tile coordinates into occluder geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapMetrics {
    /// Map height in tiles; rows are flipped so world +Y points up.
    pub map_height: i32,
    pub unit_width: f32,
    pub unit_height: f32,
}

impl MapMetrics {
    pub const fn new(map_height: i32, unit_width: f32, unit_height: f32) -> Self {
        Self { map_height, unit_width, unit_height }
    }

    /// Lower-left world corner of a tile.
    pub fn tile_origin(&self, tile: TileCoord) -> Point2 {
        Point2::new(
            tile.col as f32 * self.unit_width,
            (self.map_height - 1 - tile.row) as f32 * self.unit_height,
        )
    }

    pub fn tile_rect(&self, tile: TileCoord) -> crate::geometry::Rect {
        let origin = self.tile_origin(tile);
        crate::geometry::Rect::new(origin.x, origin.y, self.unit_width, self.unit_height)
    }

    /// Tile containing a world point. Points off the map give coordinates outside it.
    pub fn world_to_tile(&self, p: Point2) -> TileCoord {
        let col = (p.x / self.unit_width).floor() as i32;
        let flipped_row = (p.y / self.unit_height).floor() as i32;
        TileCoord::new(col, self.map_height - 1 - flipped_row)
    }
}

/// Static occluder geometry: boundary edges plus their deduplicated endpoints.
#[derive(Clone, Debug, Default)]
pub struct EdgeSet {
    pub edges: Vec<Edge>,
    pub points: Vec<Point2>,
}

impl EdgeSet {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Builds occluder edges from solid tiles.
///
/// A tile side is emitted only when the neighbouring cell on that side is open;
/// walls shared by two solid tiles can never be seen and are skipped.
pub fn build_edges(occluders: &[TileCoord], metrics: &MapMetrics) -> EdgeSet {
    let solid: HashSet<TileCoord> = occluders.iter().copied().collect();
    let mut edges = Vec::with_capacity(occluders.len() * 2);
    let mut visited = HashSet::with_capacity(solid.len());

    for &tile in occluders {
        if !visited.insert(tile) {
            continue;
        }
        let min = metrics.tile_origin(tile);
        let max = Point2::new(min.x + metrics.unit_width, min.y + metrics.unit_height);

        // Row above in the file is the cell above in world space.
        let above = TileCoord::new(tile.col, tile.row - 1);
        let below = TileCoord::new(tile.col, tile.row + 1);
        let left = TileCoord::new(tile.col - 1, tile.row);
        let right = TileCoord::new(tile.col + 1, tile.row);

        if !solid.contains(&above) {
            edges.push(Edge::new(Point2::new(min.x, max.y), max));
        }
        if !solid.contains(&below) {
            edges.push(Edge::new(min, Point2::new(max.x, min.y)));
        }
        if !solid.contains(&left) {
            edges.push(Edge::new(min, Point2::new(min.x, max.y)));
        }
        if !solid.contains(&right) {
            edges.push(Edge::new(Point2::new(max.x, min.y), max));
        }
    }

    let points = edge_points(&edges, POINT_EPSILON);
    log::debug!(
        "built {} occluder edges with {} candidate points from {} tiles",
        edges.len(),
        points.len(),
        solid.len()
    );
    EdgeSet { edges, points }
}

/// Deduplicated endpoints of `edges`; points closer than `epsilon` collapse
/// onto the first one seen.
pub fn edge_points(edges: &[Edge], epsilon: f32) -> Vec<Point2> {
    let epsilon = epsilon.max(f32::MIN_POSITIVE);
    let mut points: Vec<Point2> = Vec::with_capacity(edges.len());
    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::with_capacity(edges.len());

    let cell_of = |p: &Point2| ((p.x / epsilon).floor() as i64, (p.y / epsilon).floor() as i64);

    for edge in edges {
        for candidate in [edge.a, edge.b] {
            let (cx, cy) = cell_of(&candidate);
            let mut duplicate = false;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    if let Some(indices) = buckets.get(&(cx + dx, cy + dy)) {
                        if indices.iter().any(|&i| points[i].approx_eq(&candidate, epsilon)) {
                            duplicate = true;
                            break 'search;
                        }
                    }
                }
            }
            if !duplicate {
                buckets.entry((cx, cy)).or_default().push(points.len());
                points.push(candidate);
            }
        }
    }
    points
}

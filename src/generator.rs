// src/generator.rs

use std::collections::HashSet;

use rand::Rng;

use crate::engine_lib::edges::TileCoord;

/// Random solid tiles on a `width` x `height` grid, each cell solid with
/// probability `density`. The outer ring is always solid so the map is closed.
pub fn random_tiles<R: Rng + ?Sized>(width: i32, height: i32, density: f32, rng: &mut R) -> Vec<TileCoord> {
    if width <= 0 || height <= 0 {
        return Vec::new();
    }
    let density = density.clamp(0.0, 1.0) as f64;
    let mut tiles = Vec::new();
    for row in 0..height {
        for col in 0..width {
            let border = row == 0 || col == 0 || row == height - 1 || col == width - 1;
            if border || rng.gen_bool(density) {
                tiles.push(TileCoord::new(col, row));
            }
        }
    }
    tiles
}

/// Clears a square of `radius` tiles around `center`, e.g. to keep a spawn point open.
pub fn carve_clearing(tiles: &mut Vec<TileCoord>, center: TileCoord, radius: i32) {
    tiles.retain(|t| (t.col - center.col).abs() > radius || (t.row - center.row).abs() > radius);
}

/// Picks `count` distinct open cells, away from the border.
pub fn open_cells<R: Rng + ?Sized>(tiles: &[TileCoord], width: i32, height: i32, count: usize, rng: &mut R) -> Vec<TileCoord> {
    let solid: HashSet<TileCoord> = tiles.iter().copied().collect();
    let mut open: Vec<TileCoord> = (1..height - 1)
        .flat_map(|row| (1..width - 1).map(move |col| TileCoord::new(col, row)))
        .filter(|t| !solid.contains(t))
        .collect();
    let mut picked = Vec::with_capacity(count.min(open.len()));
    while picked.len() < count && !open.is_empty() {
        let i = rng.gen_range(0..open.len());
        picked.push(open.swap_remove(i));
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn border_is_always_solid() {
        let mut rng = StdRng::seed_from_u64(1);
        let tiles = random_tiles(6, 4, 0.0, &mut rng);
        assert_eq!(tiles.len(), 6 * 2 + 2 * 2);
        assert!(tiles.contains(&TileCoord::new(0, 0)));
        assert!(!tiles.contains(&TileCoord::new(2, 2)));
    }

    #[test]
    fn full_density_fills_grid() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(random_tiles(5, 5, 1.0, &mut rng).len(), 25);
        assert!(random_tiles(0, 5, 0.5, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_map() {
        let a = random_tiles(20, 20, 0.3, &mut StdRng::seed_from_u64(9));
        let b = random_tiles(20, 20, 0.3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn clearing_and_open_cells() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut tiles = random_tiles(10, 10, 1.0, &mut rng);
        carve_clearing(&mut tiles, TileCoord::new(5, 5), 1);
        let open = open_cells(&tiles, 10, 10, 20, &mut rng);
        assert_eq!(open.len(), 9);
        assert!(open.iter().all(|t| (t.col - 5).abs() <= 1 && (t.row - 5).abs() <= 1));
    }
}

use ndarray::Array1;

use crate::{
    error::Result,
    mdp::{Action, State},
};

use super::Feature;

/// Tile coding of a scalar projection of the state-action pair
///
/// `conv` maps `(s, a)` to a real number `x`. Each of `num_tilings` tilings covers the line
/// with `tiling_size + 1` tiles of width `tile_width`; tiling `k` is shifted right by
/// `k · tiling_offset` and starts one tile left of zero. A component is `1` when `x` falls in
/// its tile's half-open interval.
#[derive(Debug, Clone)]
pub struct SimpleTileCoding {
    num_tilings: usize,
    tiles: usize,
    tile_width: f64,
    tiling_offset: f64,
    conv: fn(&State, &Action) -> f64,
}

impl SimpleTileCoding {
    pub fn new(
        num_tilings: usize,
        tiling_size: usize,
        tile_width: f64,
        tiling_offset: f64,
        conv: fn(&State, &Action) -> f64,
    ) -> Self {
        Self {
            num_tilings,
            tiles: tiling_size + 1,
            tile_width,
            tiling_offset,
            conv,
        }
    }

    /// `[start, end)` of component `i`
    fn tile(&self, i: usize) -> (f64, f64) {
        let tiling = (i / self.tiles) as f64;
        let tile = (i % self.tiles) as f64;
        let start = -self.tile_width + tiling * self.tiling_offset + tile * self.tile_width;
        (start, start + self.tile_width)
    }
}

impl Feature for SimpleTileCoding {
    fn len(&self) -> usize {
        self.num_tilings * self.tiles
    }

    fn features(&self, state: &State, action: &Action) -> Result<Array1<f64>> {
        let x = (self.conv)(state, action);
        Ok(Array1::from_shape_fn(self.len(), |i| {
            let (start, end) = self.tile(i);
            if start <= x && x < end {
                1.0
            } else {
                0.0
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(s: &State, _a: &Action) -> f64 {
        s.index()[0] as f64
    }

    #[test]
    fn one_tile_per_tiling() {
        let coding = SimpleTileCoding::new(4, 5, 2.0, 0.5, position);
        assert_eq!(coding.len(), 24);

        for i in 0..10 {
            let s = State::new(vec![i], 1);
            let x = coding.features(&s, &s.action(0).unwrap()).unwrap();
            for tiling in 0..4 {
                let active = x.slice(ndarray::s![tiling * 6..(tiling + 1) * 6]).sum();
                assert_eq!(active, 1.0, "state {i} hits one tile of tiling {tiling}");
            }
        }
    }

    #[test]
    fn nearby_points_share_tiles() {
        let coding = SimpleTileCoding::new(2, 3, 2.0, 1.0, position);
        let encode = |i: usize| {
            let s = State::new(vec![i], 1);
            coding.features(&s, &s.action(0).unwrap()).unwrap()
        };
        // tiling 0 starts at -2, tiling 1 at -1
        assert_eq!(encode(0).to_vec(), [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(encode(1).to_vec(), [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(encode(1).dot(&encode(2)), 1.0, "one shared tile");
    }
}

//! Random layouts for experimenting with the solver.
//!
//! Corridors come from randomized Prim over a lattice of odd cells, then dead ends are
//! braided open so the maze has loops. Entities go on distinct floor cells afterwards.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::maze::{Action, Tile};

const MIN_SIDE: usize = 5;
const BRAID_CHANCE: f32 = 0.45;
const EXTRA_OPENINGS: f32 = 0.08;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    pub width: usize,
    pub height: usize,
    pub food: usize,
    pub pies: usize,
    pub ghosts: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            width: 15,
            height: 11,
            food: 4,
            pies: 1,
            ghosts: 0,
        }
    }
}

/// Lattice of carvable cells; cell (cx, cy) sits at grid (2cx+1, 2cy+1).
struct Carver {
    grid: Vec<Vec<Tile>>,
    cells_w: usize,
    cells_h: usize,
}

impl Carver {
    fn new(width: usize, height: usize) -> Self {
        Carver {
            grid: vec![vec![Tile::Wall; width]; height],
            cells_w: (width - 1) / 2,
            cells_h: (height - 1) / 2,
        }
    }

    fn neighbour(&self, cx: usize, cy: usize, dir: Action) -> Option<(usize, usize)> {
        let (dx, dy) = dir.delta();
        let nx = cx.checked_add_signed(dx as isize)?;
        let ny = cy.checked_add_signed(dy as isize)?;
        (nx < self.cells_w && ny < self.cells_h).then_some((nx, ny))
    }

    fn carve_cell(&mut self, cx: usize, cy: usize) {
        self.grid[cy * 2 + 1][cx * 2 + 1] = Tile::Empty;
    }

    /// Opens the wall between two adjacent cells.
    fn carve_between(&mut self, (cx, cy): (usize, usize), (nx, ny): (usize, usize)) {
        self.grid[cy + ny + 1][cx + nx + 1] = Tile::Empty;
    }

    fn is_open_between(&self, (cx, cy): (usize, usize), (nx, ny): (usize, usize)) -> bool {
        self.grid[cy + ny + 1][cx + nx + 1] != Tile::Wall
    }

    fn prim<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut in_maze = vec![vec![false; self.cells_w]; self.cells_h];
        let mut frontier: Vec<(usize, usize)> = Vec::new();

        let start = (rng.gen_range(0..self.cells_w), rng.gen_range(0..self.cells_h));
        in_maze[start.1][start.0] = true;
        self.carve_cell(start.0, start.1);
        self.add_frontier(start, &in_maze, &mut frontier);

        while !frontier.is_empty() {
            let idx = rng.gen_range(0..frontier.len());
            let (cx, cy) = frontier.swap_remove(idx);
            if in_maze[cy][cx] {
                continue;
            }
            let joined: Vec<(usize, usize)> = Action::MOVES
                .into_iter()
                .filter_map(|dir| self.neighbour(cx, cy, dir))
                .filter(|&(nx, ny)| in_maze[ny][nx])
                .collect();
            let Some(&link) = joined.choose(rng) else {
                continue;
            };
            in_maze[cy][cx] = true;
            self.carve_between((cx, cy), link);
            self.carve_cell(cx, cy);
            self.add_frontier((cx, cy), &in_maze, &mut frontier);
        }
    }

    fn add_frontier(
        &self,
        (cx, cy): (usize, usize),
        in_maze: &[Vec<bool>],
        frontier: &mut Vec<(usize, usize)>,
    ) {
        for dir in Action::MOVES {
            if let Some((nx, ny)) = self.neighbour(cx, cy, dir) {
                if !in_maze[ny][nx] {
                    frontier.push((nx, ny));
                }
            }
        }
    }

    /// Knocks out walls around dead ends, plus a few random extra openings.
    fn braid<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for cy in 0..self.cells_h {
            for cx in 0..self.cells_w {
                let here = (cx, cy);
                let (open, closed): (Vec<_>, Vec<_>) = Action::MOVES
                    .into_iter()
                    .filter_map(|dir| self.neighbour(cx, cy, dir))
                    .partition(|&n| self.is_open_between(here, n));
                let dead_end = open.len() == 1;
                let chance = if dead_end { BRAID_CHANCE } else { EXTRA_OPENINGS };
                if closed.is_empty() || rng.gen::<f32>() >= chance {
                    continue;
                }
                if let Some(&n) = closed.choose(rng) {
                    self.carve_between(here, n);
                }
            }
        }
    }

    fn floor(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for (y, row) in self.grid.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if *tile == Tile::Empty {
                    cells.push((x, y));
                }
            }
        }
        cells
    }
}

/// Builds a layout string that [`crate::maze::Maze::parse`] accepts.
///
/// Even sizes are rounded up to the next odd number and sizes below 5 are raised to 5.
/// Counts that do not fit on the available floor are reduced.
pub fn generate_layout<R: Rng + ?Sized>(options: &GenerateOptions, rng: &mut R) -> String {
    let width = options.width.max(MIN_SIDE) | 1;
    let height = options.height.max(MIN_SIDE) | 1;

    let mut carver = Carver::new(width, height);
    carver.prim(rng);
    carver.braid(rng);

    let mut floor = carver.floor();
    floor.shuffle(rng);
    let mut spots = floor.into_iter();

    // Floor always has at least one cell, so the start is always placed.
    if let Some((x, y)) = spots.next() {
        carver.grid[y][x] = Tile::Start;
    }
    for (tile, wanted) in [
        (Tile::Food, options.food),
        (Tile::Pie, options.pies),
        (Tile::GhostSpawn, options.ghosts),
    ] {
        let mut placed = 0;
        for (x, y) in spots.by_ref().take(wanted) {
            carver.grid[y][x] = tile;
            placed += 1;
        }
        if placed < wanted {
            warn!(
                "only room for {} of {} '{}' tiles",
                placed,
                wanted,
                tile.symbol()
            );
        }
    }

    debug!("generated {}x{} layout", width, height);
    let mut out = String::with_capacity((width + 1) * height);
    for row in &carver.grid {
        out.extend(row.iter().map(|t| t.symbol()));
        out.push('\n');
    }
    out
}

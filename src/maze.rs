use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::error::LayoutError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Empty,
    Start,
    Food,
    Pie,
    GhostSpawn,
    FruitSpawn,
    TeleportPad,
    MovingWall,
    SlowPill,
    SpeedBoost,
}

impl Tile {
    pub fn from_symbol(symbol: char) -> Option<Tile> {
        let tile = match symbol {
            '%' => Tile::Wall,
            ' ' => Tile::Empty,
            'P' => Tile::Start,
            '.' => Tile::Food,
            'O' => Tile::Pie,
            'G' => Tile::GhostSpawn,
            'F' => Tile::FruitSpawn,
            'T' => Tile::TeleportPad,
            'M' => Tile::MovingWall,
            'S' => Tile::SlowPill,
            'B' => Tile::SpeedBoost,
            _ => return None,
        };
        Some(tile)
    }

    pub fn symbol(self) -> char {
        match self {
            Tile::Wall => '%',
            Tile::Empty => ' ',
            Tile::Start => 'P',
            Tile::Food => '.',
            Tile::Pie => 'O',
            Tile::GhostSpawn => 'G',
            Tile::FruitSpawn => 'F',
            Tile::TeleportPad => 'T',
            Tile::MovingWall => 'M',
            Tile::SlowPill => 'S',
            Tile::SpeedBoost => 'B',
        }
    }

    /// Tiles that only exist in the extended variant.
    fn is_extended(self) -> bool {
        matches!(
            self,
            Tile::GhostSpawn
                | Tile::FruitSpawn
                | Tile::TeleportPad
                | Tile::MovingWall
                | Tile::SlowPill
                | Tile::SpeedBoost
        )
    }
}

/// Grid coordinate. Signed so that neighbours of border cells can be formed and rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    pub fn step(self, action: Action) -> Pos {
        let (dx, dy) = action.delta();
        Pos {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    North,
    East,
    South,
    West,
    Stop,
}

impl Action {
    /// The four cardinal moves in enumeration order.
    pub const MOVES: [Action; 4] = [Action::North, Action::East, Action::South, Action::West];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Action::North => (0, -1),
            Action::East => (1, 0),
            Action::South => (0, 1),
            Action::West => (-1, 0),
            Action::Stop => (0, 0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::North => "North",
            Action::East => "East",
            Action::South => "South",
            Action::West => "West",
            Action::Stop => "Stop",
        }
    }

    pub fn cost(self) -> u32 {
        if self == Action::Stop {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const BOTTOM_RIGHT: usize = 3;

/// Static maze geometry. Built once from a layout and only queried afterwards.
#[derive(Clone, Debug)]
pub struct Maze {
    width: usize,
    height: usize,
    grid: Vec<Vec<Tile>>,
    start: Pos,
    food: BTreeSet<Pos>,
    pies: BTreeSet<Pos>,
    ghost_starts: Vec<Pos>,
    fruit_spawns: Vec<Pos>,
    slow_pills: BTreeSet<Pos>,
    boosts: BTreeSet<Pos>,
    // [top-left, bottom-left, top-right, bottom-right]; opposite of slot i is slot 3 - i.
    corners: [Option<Pos>; 4],
    pads: FxHashMap<Pos, Pos>,
    moving_walls: bool,
    extended: bool,
}

impl Maze {
    pub fn parse(text: &str) -> Result<Maze, LayoutError> {
        let rows: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .collect();
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }

        let width = rows[0].chars().count();
        let height = rows.len();
        let mut grid = Vec::with_capacity(height);
        let mut start: Option<Pos> = None;
        let mut food = BTreeSet::new();
        let mut pies = BTreeSet::new();
        let mut ghost_starts = Vec::new();
        let mut fruit_spawns = Vec::new();
        let mut slow_pills = BTreeSet::new();
        let mut boosts = BTreeSet::new();
        let mut pad_order = Vec::new();
        let mut moving_walls = false;
        let mut extended = false;

        for (y, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::Ragged {
                    row: y,
                    expected: width,
                    found,
                });
            }
            let mut row = Vec::with_capacity(width);
            for (x, symbol) in line.chars().enumerate() {
                let tile = Tile::from_symbol(symbol)
                    .ok_or(LayoutError::UnknownSymbol { symbol, x, y })?;
                let pos = Pos::new(x as i32, y as i32);
                extended |= tile.is_extended();
                match tile {
                    Tile::Start => {
                        if let Some(first) = start {
                            return Err(LayoutError::MultipleStarts { first, second: pos });
                        }
                        start = Some(pos);
                    }
                    Tile::Food => {
                        food.insert(pos);
                    }
                    Tile::Pie => {
                        pies.insert(pos);
                    }
                    Tile::GhostSpawn => ghost_starts.push(pos),
                    Tile::FruitSpawn => fruit_spawns.push(pos),
                    Tile::TeleportPad => pad_order.push(pos),
                    Tile::SlowPill => {
                        slow_pills.insert(pos);
                    }
                    Tile::SpeedBoost => {
                        boosts.insert(pos);
                    }
                    Tile::MovingWall => moving_walls = true,
                    Tile::Wall | Tile::Empty => {}
                }
                row.push(tile);
            }
            grid.push(row);
        }

        let start = start.ok_or(LayoutError::MissingStart)?;

        let mut pads = FxHashMap::default();
        for pair in pad_order.chunks(2) {
            match *pair {
                [a, b] => {
                    pads.insert(a, b);
                    pads.insert(b, a);
                }
                [lone] => warn!("teleport pad at {} has no partner and stays inert", lone),
                _ => {}
            }
        }

        let mut maze = Maze {
            width,
            height,
            grid,
            start,
            food,
            pies,
            ghost_starts,
            fruit_spawns,
            slow_pills,
            boosts,
            corners: [None; 4],
            pads,
            moving_walls,
            extended,
        };
        maze.corners = maze.find_corners();

        debug!(
            "parsed {}x{} layout: start {}, {} food, {} pies, {} teleport corners",
            maze.width,
            maze.height,
            maze.start,
            maze.food.len(),
            maze.pies.len(),
            maze.corners().len()
        );
        Ok(maze)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Maze, LayoutError> {
        let path = path.as_ref();
        info!("loading maze from {}", path.display());
        let text = fs::read_to_string(path)?;
        let maze = Maze::parse(&text)?;
        info!(
            "maze loaded, dimensions {}x{}, {} food, {} pies",
            maze.width,
            maze.height,
            maze.food.len(),
            maze.pies.len()
        );
        Ok(maze)
    }

    fn find_corners(&self) -> [Option<Pos>; 4] {
        let mut open = self.cells().filter(|&pos| !self.is_wall(pos));
        let first = match open.next() {
            Some(pos) => pos,
            None => return [None; 4],
        };
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for pos in open {
            min_x = min_x.min(pos.x);
            max_x = max_x.max(pos.x);
            min_y = min_y.min(pos.y);
            max_y = max_y.max(pos.y);
        }
        [
            Pos::new(min_x, min_y),
            Pos::new(min_x, max_y),
            Pos::new(max_x, min_y),
            Pos::new(max_x, max_y),
        ]
        .map(|pos| if self.is_wall(pos) { None } else { Some(pos) })
    }

    fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| Pos::new(x as i32, y as i32)))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn food(&self) -> &BTreeSet<Pos> {
        &self.food
    }

    pub fn pies(&self) -> &BTreeSet<Pos> {
        &self.pies
    }

    pub fn ghost_starts(&self) -> &[Pos] {
        &self.ghost_starts
    }

    pub fn fruit_spawns(&self) -> &[Pos] {
        &self.fruit_spawns
    }

    pub fn slow_pills(&self) -> &BTreeSet<Pos> {
        &self.slow_pills
    }

    pub fn boosts(&self) -> &BTreeSet<Pos> {
        &self.boosts
    }

    /// True when the layout uses any ghost, fruit, pad, moving-wall or modifier tile.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn has_moving_walls(&self) -> bool {
        self.moving_walls
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    pub fn tile(&self, pos: Pos) -> Option<Tile> {
        if self.in_bounds(pos) {
            Some(self.grid[pos.y as usize][pos.x as usize])
        } else {
            None
        }
    }

    /// Out of bounds counts as wall.
    pub fn is_wall(&self, pos: Pos) -> bool {
        matches!(self.tile(pos), None | Some(Tile::Wall))
    }

    pub fn is_moving_wall(&self, pos: Pos) -> bool {
        self.tile(pos) == Some(Tile::MovingWall)
    }

    /// Static walls plus moving walls while they are raised.
    pub fn is_blocked(&self, pos: Pos, moving_walls_active: bool) -> bool {
        self.is_wall(pos) || (moving_walls_active && self.is_moving_wall(pos))
    }

    pub fn legal_moves(&self, pos: Pos, walls_passable: bool) -> Vec<(Action, Pos)> {
        self.legal_moves_with(pos, walls_passable, false)
    }

    /// Every in-bounds cardinal move that is open (or any move when walls are passable),
    /// followed by `Stop`.
    pub fn legal_moves_with(
        &self,
        pos: Pos,
        walls_passable: bool,
        moving_walls_active: bool,
    ) -> Vec<(Action, Pos)> {
        let mut moves = Vec::with_capacity(5);
        for action in Action::MOVES {
            let next = pos.step(action);
            if !self.in_bounds(next) {
                continue;
            }
            if walls_passable || !self.is_blocked(next, moving_walls_active) {
                moves.push((action, next));
            }
        }
        moves.push((Action::Stop, pos));
        moves
    }

    pub fn is_corner(&self, pos: Pos) -> bool {
        self.opposite_corner(pos).is_some()
    }

    /// Diagonally opposite corner, or `None` when `pos` is no corner or the pairing is degenerate.
    pub fn opposite_corner(&self, pos: Pos) -> Option<Pos> {
        let idx = self.corners.iter().position(|c| *c == Some(pos))?;
        let opposite = self.corners[BOTTOM_RIGHT - idx]?;
        if opposite == pos {
            None
        } else {
            Some(opposite)
        }
    }

    /// Corners that actually teleport, in slot order without duplicates.
    pub fn corners(&self) -> Vec<Pos> {
        let mut out: Vec<Pos> = Vec::with_capacity(4);
        for pos in self.corners.iter().flatten() {
            if self.opposite_corner(*pos).is_some() && !out.contains(pos) {
                out.push(*pos);
            }
        }
        out
    }

    pub fn teleport_pad(&self, pos: Pos) -> Option<Pos> {
        self.pads.get(&pos).copied()
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.grid.iter().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for tile in row {
                write!(f, "{}", tile.symbol())?;
            }
        }
        Ok(())
    }
}

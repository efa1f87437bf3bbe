//! Ghost movement, collisions and fruit spawning for the extended variant.
//!
//! Everything random here draws from the injected generator, so a search run is
//! reproducible for a given seed. Ghost movement is still stochastic from the
//! search's point of view, which voids the optimality argument of A*.

use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::maze::{Action, Maze, Pos};
use crate::state::Arena;

/// Chance that a ghost takes the distance-optimising move instead of a random one.
pub const GHOST_GREEDY_CHANCE: f64 = 0.75;
pub const GHOST_SCORE: u32 = 200;
pub const FRUIT_SPAWN_CHANCE: f64 = 0.1;

/// Runs the adversary half of a turn after Pacman has moved to `pacman`.
/// Returns the score earned by eating scared ghosts.
pub(crate) fn resolve_turn<R: Rng + ?Sized>(
    maze: &Maze,
    pacman: Pos,
    arena: &mut Arena,
    rng: &mut R,
) -> u32 {
    let mut score = handle_collisions(pacman, arena);

    if !arena.defeated && !arena.ghosts.is_empty() && ghosts_move_this_turn(arena) {
        let scared = arena.scared_steps > 0;
        let walls_up = arena.moving_walls_active;
        let mut moved: Vec<Pos> = arena
            .ghosts
            .iter()
            .map(|&ghost| match ghost_next_dir(maze, ghost, pacman, scared, walls_up, rng) {
                Some(dir) => ghost.step(dir),
                None => ghost,
            })
            .collect();
        moved.sort_unstable();
        arena.ghosts = Rc::new(moved);
        score += handle_collisions(pacman, arena);
    }

    if !arena.defeated {
        spawn_fruit(maze, pacman, arena, rng);
    }
    score
}

/// Slowed ghosts only move every other turn.
fn ghosts_move_this_turn(arena: &Arena) -> bool {
    arena.slow_steps == 0 || arena.slow_steps % 2 == 0
}

fn can_move_ghost(maze: &Maze, pos: Pos, dir: Action, walls_up: bool) -> bool {
    !maze.is_blocked(pos.step(dir), walls_up)
}

/// Chasing ghosts close in on Pacman, scared ones flee; ties and the random
/// fallback pick uniformly among the open directions.
pub fn ghost_next_dir<R: Rng + ?Sized>(
    maze: &Maze,
    ghost: Pos,
    pacman: Pos,
    scared: bool,
    walls_up: bool,
    rng: &mut R,
) -> Option<Action> {
    let open: Vec<Action> = Action::MOVES
        .into_iter()
        .filter(|&dir| can_move_ghost(maze, ghost, dir, walls_up))
        .collect();
    if open.is_empty() {
        return None;
    }
    if !rng.gen_bool(GHOST_GREEDY_CHANCE) {
        return open.choose(rng).copied();
    }

    let mut options = Vec::new();
    let mut best: Option<u32> = None;
    for &dir in &open {
        let d = ghost.step(dir).manhattan(pacman);
        let better = match best {
            None => true,
            Some(b) if scared => d > b,
            Some(b) => d < b,
        };
        if better {
            best = Some(d);
            options.clear();
            options.push(dir);
        } else if best == Some(d) {
            options.push(dir);
        }
    }
    options.choose(rng).copied()
}

/// Scared ghosts sharing Pacman's cell are eaten; any other contact defeats Pacman.
fn handle_collisions(pacman: Pos, arena: &mut Arena) -> u32 {
    let hits = arena.ghosts.iter().filter(|&&g| g == pacman).count();
    if hits == 0 {
        return 0;
    }
    if arena.scared_steps > 0 {
        Rc::make_mut(&mut arena.ghosts).retain(|&g| g != pacman);
        GHOST_SCORE * hits as u32
    } else {
        arena.defeated = true;
        0
    }
}

fn spawn_fruit<R: Rng + ?Sized>(maze: &Maze, pacman: Pos, arena: &mut Arena, rng: &mut R) {
    if maze.fruit_spawns().is_empty() || !rng.gen_bool(FRUIT_SPAWN_CHANCE) {
        return;
    }
    let candidates: Vec<Pos> = maze
        .fruit_spawns()
        .iter()
        .copied()
        .filter(|p| *p != pacman && !arena.fruit.contains(p))
        .collect();
    if let Some(&pos) = candidates.choose(rng) {
        Rc::make_mut(&mut arena.fruit).insert(pos);
    }
}

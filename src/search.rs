use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{self, Write};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::heuristic::Heuristic;
use crate::maze::{Action, Maze};
use crate::state::{Frame, PacmanState};

const PROGRESS_EVERY: usize = 1000;

/// Settings for one search run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchOptions {
    pub heuristic: Heuristic,
    /// Seeds the generator behind ghost moves and fruit spawns.
    pub seed: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States popped and expanded; stale duplicates are not counted.
    pub nodes_expanded: usize,
    pub nodes_generated: usize,
    pub max_frontier: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub actions: Vec<Action>,
    pub cost: u32,
    pub frames: Vec<Frame>,
}

impl Solution {
    /// Writes the plain-text report: total cost, then one action per line.
    pub fn write_report<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "Total cost: {}", self.cost)?;
        writeln!(out, "Actions:")?;
        for action in &self.actions {
            writeln!(out, "{}", action)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// `None` when the frontier ran dry before any goal was popped.
    pub solution: Option<Solution>,
    pub stats: SearchStats,
}

struct FrontierEntry {
    f: u32,
    seq: u64,
    state: PacmanState,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    // Reversed so the max-heap pops the lowest f first, older entries before newer.
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs A* with the configured heuristic and a generator seeded from `options.seed`.
pub fn astar(maze: &Maze, options: &SearchOptions) -> SearchOutcome {
    info!(
        "starting A* with {} heuristic (seed {})",
        options.heuristic, options.seed
    );
    let heuristic = options.heuristic;
    let mut rng = StdRng::seed_from_u64(options.seed);
    astar_with(maze, |s| heuristic.estimate(s), &mut rng)
}

/// A* over [`PacmanState`] with a caller-supplied estimate.
///
/// The estimate must never overestimate for the returned cost to be optimal; this is not
/// checked. Closed states are reopened only when reached strictly cheaper.
pub fn astar_with<H, R>(maze: &Maze, h: H, rng: &mut R) -> SearchOutcome
where
    H: Fn(&PacmanState) -> u32,
    R: Rng + ?Sized,
{
    let start = PacmanState::initial(maze);
    let mut stats = SearchStats::default();
    let mut frontier = BinaryHeap::new();
    let mut closed: FxHashSet<PacmanState> = FxHashSet::default();
    let mut best_cost: FxHashMap<PacmanState, u32> = FxHashMap::default();
    let mut seq: u64 = 0;

    best_cost.insert(start.clone(), 0);
    frontier.push(FrontierEntry {
        f: h(&start),
        seq,
        state: start,
    });
    stats.max_frontier = 1;

    while let Some(FrontierEntry { state, .. }) = frontier.pop() {
        let g = state.path_cost();
        if best_cost.get(&state).is_some_and(|&best| g > best) {
            continue;
        }

        if state.is_goal() {
            info!(
                "solution found: cost {}, {} actions, {} nodes expanded",
                g,
                state.trail().len(),
                stats.nodes_expanded
            );
            return SearchOutcome {
                solution: Some(Solution {
                    actions: state.actions(),
                    cost: g,
                    frames: state.trail().frames(),
                }),
                stats,
            };
        }

        stats.nodes_expanded += 1;
        if stats.nodes_expanded % PROGRESS_EVERY == 0 {
            debug!(
                "expanded {} states, at {} with {} food left, frontier {}",
                stats.nodes_expanded,
                state.position(),
                state.remaining_food().len(),
                frontier.len()
            );
        }

        for succ in state.successors(maze, rng) {
            let g2 = succ.path_cost();
            let known = best_cost.get(&succ).copied();
            if closed.contains(&succ) && known.is_some_and(|best| g2 >= best) {
                continue;
            }
            if known.map_or(true, |best| g2 < best) {
                seq += 1;
                stats.nodes_generated += 1;
                let f = g2 + h(&succ);
                best_cost.insert(succ.clone(), g2);
                frontier.push(FrontierEntry {
                    f,
                    seq,
                    state: succ,
                });
            }
        }
        closed.insert(state);
        stats.max_frontier = stats.max_frontier.max(frontier.len());
    }

    warn!(
        "no solution: frontier exhausted after {} expansions",
        stats.nodes_expanded
    );
    SearchOutcome {
        solution: None,
        stats,
    }
}

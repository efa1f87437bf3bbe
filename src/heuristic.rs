//! Remaining-cost estimates over Pacman's position and the food still on the board.
//!
//! Both non-trivial estimates use Manhattan distance, which undercounts any walk on
//! the grid. Teleporting corners and pads are shortcuts Manhattan distance does not
//! know about, so on mazes that have them neither estimate is guaranteed admissible.

use std::fmt;

use clap::ValueEnum;

use crate::maze::Pos;
use crate::state::PacmanState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Heuristic {
    /// Always 0; A* degrades to uniform-cost search.
    #[value(alias = "null")]
    Zero,
    #[default]
    #[value(name = "nearest", alias = "manhattan", alias = "mfd")]
    NearestFood,
    Mst,
}

impl Heuristic {
    pub fn estimate(self, state: &PacmanState) -> u32 {
        match self {
            Heuristic::Zero => 0,
            Heuristic::NearestFood => {
                nearest_food_distance(state.position(), state.remaining_food())
            }
            Heuristic::Mst => mst_weight(state.position(), state.remaining_food()),
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heuristic::Zero => "zero",
            Heuristic::NearestFood => "nearest",
            Heuristic::Mst => "mst",
        };
        f.write_str(name)
    }
}

/// Manhattan distance to the closest food, 0 when none is left.
pub fn nearest_food_distance<'a, I>(from: Pos, food: I) -> u32
where
    I: IntoIterator<Item = &'a Pos>,
{
    food.into_iter()
        .map(|f| from.manhattan(*f))
        .min()
        .unwrap_or(0)
}

/// Weight of a minimum spanning tree over `from` and every food cell, grown with Prim's
/// algorithm from `from`. Equal edges resolve to the earliest food in iteration order.
pub fn mst_weight<'a, I>(from: Pos, food: I) -> u32
where
    I: IntoIterator<Item = &'a Pos>,
{
    let nodes: Vec<Pos> = food.into_iter().copied().collect();
    if nodes.is_empty() {
        return 0;
    }

    // dist[i]: cheapest edge from the tree to nodes[i]; None once nodes[i] joined the tree.
    let mut dist: Vec<Option<u32>> = nodes.iter().map(|n| Some(from.manhattan(*n))).collect();
    let mut total = 0;
    for _ in 0..nodes.len() {
        let mut pick: Option<(usize, u32)> = None;
        for (i, d) in dist.iter().enumerate() {
            if let Some(d) = *d {
                if pick.map_or(true, |(_, best)| d < best) {
                    pick = Some((i, d));
                }
            }
        }
        let Some((next, weight)) = pick else { break };
        total += weight;
        dist[next] = None;
        let joined = nodes[next];
        for (i, d) in dist.iter_mut().enumerate() {
            if let Some(d) = d {
                *d = (*d).min(joined.manhattan(nodes[i]));
            }
        }
    }
    total
}

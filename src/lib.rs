//! State-space search for Pacman: collect every food pellet in as few moves as possible.
//!
//! A layout is parsed into a [`Maze`], the search walks [`PacmanState`]s with A* and a
//! chosen [`Heuristic`], and a found [`Solution`] can be written out or replayed.

pub mod config;
pub mod error;
pub mod generate;
pub mod ghost;
pub mod heuristic;
pub mod maze;
pub mod render;
pub mod search;
pub mod state;

pub use error::LayoutError;
pub use heuristic::Heuristic;
pub use maze::{Action, Maze, Pos, Tile};
pub use search::{astar, astar_with, SearchOptions, SearchOutcome, SearchStats, Solution};
pub use state::PacmanState;

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use log::trace;
use rand::Rng;

use crate::ghost;
use crate::maze::{Action, Maze, Pos};

/// Wall-passing steps granted by a pie.
pub const PIE_STEPS: u32 = 5;
/// Ghost-scare duration granted by a pie (extended variant).
pub const SCARED_STEPS: u32 = 15;
pub const SLOW_STEPS: u32 = 10;
pub const BOOST_STEPS: u32 = 8;
/// Moving walls flip between raised and lowered every this many moves.
pub const MOVING_WALL_PERIOD: u8 = 3;

const FOOD_SCORE: u32 = 10;
const PIE_SCORE: u32 = 50;
const FRUIT_SCORE: u32 = 100;
const FRUIT_SCARE_BONUS: u32 = 5;

pub type PosSet = Rc<BTreeSet<Pos>>;

#[derive(Debug)]
struct Step {
    action: Action,
    position: Pos,
    dash: Option<Pos>,
    ghosts: Rc<Vec<Pos>>,
    prev: Option<Rc<Step>>,
}

/// Snapshot of one executed action, used to replay a solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub action: Action,
    pub position: Pos,
    /// Cell crossed by a speed-boost dash on the way to `position`.
    pub dash: Option<Pos>,
    pub ghosts: Vec<Pos>,
}

/// Actions taken so far. Successors extend their parent's trail without copying it.
#[derive(Clone, Debug, Default)]
pub struct Trail {
    head: Option<Rc<Step>>,
    len: usize,
}

impl Trail {
    fn push(
        &self,
        action: Action,
        position: Pos,
        dash: Option<Pos>,
        ghosts: Rc<Vec<Pos>>,
    ) -> Trail {
        Trail {
            head: Some(Rc::new(Step {
                action,
                position,
                dash,
                ghosts,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn steps(&self) -> Vec<&Step> {
        let mut steps = Vec::with_capacity(self.len);
        let mut cur = self.head.as_deref();
        while let Some(step) = cur {
            steps.push(step);
            cur = step.prev.as_deref();
        }
        steps.reverse();
        steps
    }

    pub fn actions(&self) -> Vec<Action> {
        self.steps().into_iter().map(|s| s.action).collect()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.steps()
            .into_iter()
            .map(|s| Frame {
                action: s.action,
                position: s.position,
                dash: s.dash,
                ghosts: s.ghosts.as_ref().clone(),
            })
            .collect()
    }
}

/// Ghosts, timers and pickups of the extended variant. Stays at its default for plain mazes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct Arena {
    /// Kept sorted; ghosts are interchangeable.
    pub(crate) ghosts: Rc<Vec<Pos>>,
    pub(crate) scared_steps: u32,
    pub(crate) slow_steps: u32,
    pub(crate) boost_steps: u32,
    pub(crate) moving_walls_active: bool,
    pub(crate) wall_clock: u8,
    pub(crate) fruit: PosSet,
    pub(crate) slow_pills: PosSet,
    pub(crate) boosts: PosSet,
    pub(crate) defeated: bool,
}

/// A node of the search space.
///
/// Equality and hashing cover the logical configuration only: position, the remaining
/// collectibles, the ability countdown and the extended fields. The trail, cost and score
/// are not part of identity, so two paths reaching the same configuration collapse.
#[derive(Clone, Debug)]
pub struct PacmanState {
    position: Pos,
    remaining_food: PosSet,
    remaining_pies: PosSet,
    ability_steps: u32,
    arena: Arena,
    trail: Trail,
    path_cost: u32,
    score: u32,
}

impl PartialEq for PacmanState {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.ability_steps == other.ability_steps
            && self.remaining_food == other.remaining_food
            && self.remaining_pies == other.remaining_pies
            && self.arena == other.arena
    }
}

impl Eq for PacmanState {}

impl Hash for PacmanState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
        self.ability_steps.hash(state);
        self.remaining_food.hash(state);
        self.remaining_pies.hash(state);
        self.arena.hash(state);
    }
}

impl PacmanState {
    /// Start configuration: every collectible in place, no ability.
    pub fn initial(maze: &Maze) -> Self {
        let mut ghosts = maze.ghost_starts().to_vec();
        ghosts.sort_unstable();
        PacmanState {
            position: maze.start(),
            remaining_food: Rc::new(maze.food().clone()),
            remaining_pies: Rc::new(maze.pies().clone()),
            ability_steps: 0,
            arena: Arena {
                ghosts: Rc::new(ghosts),
                moving_walls_active: maze.has_moving_walls(),
                slow_pills: Rc::new(maze.slow_pills().clone()),
                boosts: Rc::new(maze.boosts().clone()),
                ..Arena::default()
            },
            trail: Trail::default(),
            path_cost: 0,
            score: 0,
        }
    }

    /// Builds a bare state, mostly for probing heuristics and identity.
    pub fn new(
        position: Pos,
        remaining_food: BTreeSet<Pos>,
        remaining_pies: BTreeSet<Pos>,
        ability_steps: u32,
    ) -> Self {
        PacmanState {
            position,
            remaining_food: Rc::new(remaining_food),
            remaining_pies: Rc::new(remaining_pies),
            ability_steps,
            arena: Arena::default(),
            trail: Trail::default(),
            path_cost: 0,
            score: 0,
        }
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn remaining_food(&self) -> &BTreeSet<Pos> {
        &self.remaining_food
    }

    pub fn remaining_pies(&self) -> &BTreeSet<Pos> {
        &self.remaining_pies
    }

    pub fn ability_steps(&self) -> u32 {
        self.ability_steps
    }

    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn actions(&self) -> Vec<Action> {
        self.trail.actions()
    }

    pub fn ghosts(&self) -> &[Pos] {
        &self.arena.ghosts
    }

    pub fn scared_steps(&self) -> u32 {
        self.arena.scared_steps
    }

    pub fn slow_steps(&self) -> u32 {
        self.arena.slow_steps
    }

    pub fn boost_steps(&self) -> u32 {
        self.arena.boost_steps
    }

    pub fn moving_walls_active(&self) -> bool {
        self.arena.moving_walls_active
    }

    pub fn remaining_fruit(&self) -> &BTreeSet<Pos> {
        &self.arena.fruit
    }

    pub fn is_defeated(&self) -> bool {
        self.arena.defeated
    }

    pub fn walls_passable(&self) -> bool {
        self.ability_steps > 0
    }

    pub fn is_goal(&self) -> bool {
        self.remaining_food.is_empty() && !self.arena.defeated
    }

    /// Every state reachable with one action. Defeated states have none.
    pub fn successors<R: Rng + ?Sized>(&self, maze: &Maze, rng: &mut R) -> Vec<PacmanState> {
        if self.arena.defeated {
            return Vec::new();
        }
        maze.legal_moves_with(
            self.position,
            self.walls_passable(),
            self.arena.moving_walls_active,
        )
        .into_iter()
        .filter_map(|(action, next)| self.transition(maze, action, next, &mut *rng))
        .collect()
    }

    /// The successor for one specific action, if that action is legal here.
    pub fn successor<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        action: Action,
        rng: &mut R,
    ) -> Option<PacmanState> {
        if self.arena.defeated {
            return None;
        }
        let (action, next) = maze
            .legal_moves_with(
                self.position,
                self.walls_passable(),
                self.arena.moving_walls_active,
            )
            .into_iter()
            .find(|(a, _)| *a == action)?;
        self.transition(maze, action, next, rng)
    }

    fn transition<R: Rng + ?Sized>(
        &self,
        maze: &Maze,
        action: Action,
        next: Pos,
        rng: &mut R,
    ) -> Option<PacmanState> {
        let walls_up = self.arena.moving_walls_active;
        if maze.is_blocked(next, walls_up) && !self.walls_passable() {
            return None;
        }

        let mut succ = self.clone();
        if action == Action::Stop {
            // Free and timeless, but standing on a corner still teleports.
            if let Some(dest) = maze.opposite_corner(self.position) {
                succ.position = dest;
                succ.collect(maze, dest);
            }
            succ.trail = self
                .trail
                .push(action, succ.position, None, self.arena.ghosts.clone());
            return Some(succ);
        }

        succ.path_cost += action.cost();
        succ.ability_steps = self.ability_steps.saturating_sub(1);
        succ.arena.scared_steps = self.arena.scared_steps.saturating_sub(1);
        succ.arena.slow_steps = self.arena.slow_steps.saturating_sub(1);
        succ.arena.boost_steps = self.arena.boost_steps.saturating_sub(1);

        let mut pos = next;
        let mut dash = None;
        if self.arena.boost_steps > 0 && self.can_dash_through(maze, next) {
            let beyond = next.step(action);
            if maze.in_bounds(beyond) && !maze.is_blocked(beyond, walls_up) {
                succ.collect(maze, next);
                dash = Some(next);
                pos = beyond;
            }
        }

        if let Some(dest) = maze.opposite_corner(pos) {
            pos = dest;
        }
        if let Some(dest) = maze.teleport_pad(pos) {
            pos = dest;
        }
        succ.position = pos;
        succ.collect(maze, pos);

        if maze.has_moving_walls() {
            succ.arena.wall_clock = (self.arena.wall_clock + 1) % MOVING_WALL_PERIOD;
            if succ.arena.wall_clock == 0 {
                succ.arena.moving_walls_active = !walls_up;
            }
        }

        if succ.ability_steps == 0 && maze.is_blocked(pos, succ.arena.moving_walls_active) {
            trace!("pruned {} into {}: would be stuck inside a wall", action, pos);
            return None;
        }

        if maze.is_extended() {
            succ.score += ghost::resolve_turn(maze, pos, &mut succ.arena, rng);
        }

        succ.trail = self
            .trail
            .push(action, pos, dash, succ.arena.ghosts.clone());
        Some(succ)
    }

    fn can_dash_through(&self, maze: &Maze, pos: Pos) -> bool {
        !maze.is_blocked(pos, self.arena.moving_walls_active)
            && !maze.is_corner(pos)
            && maze.teleport_pad(pos).is_none()
    }

    /// Picks up whatever sits on `pos`. Sets are cloned only when something is removed.
    fn collect(&mut self, maze: &Maze, pos: Pos) {
        if self.remaining_food.contains(&pos) {
            Rc::make_mut(&mut self.remaining_food).remove(&pos);
            self.score += FOOD_SCORE;
        }
        if self.remaining_pies.contains(&pos) {
            Rc::make_mut(&mut self.remaining_pies).remove(&pos);
            self.ability_steps = PIE_STEPS;
            self.score += PIE_SCORE;
            if maze.is_extended() {
                self.arena.scared_steps = SCARED_STEPS;
            }
        }
        if !maze.is_extended() {
            return;
        }
        let arena = &mut self.arena;
        if arena.fruit.contains(&pos) {
            Rc::make_mut(&mut arena.fruit).remove(&pos);
            arena.scared_steps += FRUIT_SCARE_BONUS;
            self.score += FRUIT_SCORE;
        }
        if arena.slow_pills.contains(&pos) {
            Rc::make_mut(&mut arena.slow_pills).remove(&pos);
            arena.slow_steps = SLOW_STEPS;
        }
        if arena.boosts.contains(&pos) {
            Rc::make_mut(&mut arena.boosts).remove(&pos);
            arena.boost_steps = BOOST_STEPS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::hash_map::DefaultHasher;

    fn maze(rows: &[&str]) -> Maze {
        Maze::parse(&rows.join("\n")).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn hash_of(state: &PacmanState) -> u64 {
        let mut h = DefaultHasher::new();
        state.hash(&mut h);
        h.finish()
    }

    fn find(succs: &[PacmanState], action: Action) -> Option<&PacmanState> {
        succs.iter().find(|s| s.actions().last() == Some(&action))
    }

    // Corners of the open area are walls, so nothing teleports.
    const CROSS: [&str; 5] = ["%%%%%%%", "%%% %%%", "% P O %", "%%% %%%", "%%%%%%%"];

    #[test]
    fn test_stop_costs_nothing_and_keeps_ability() {
        let m = maze(&CROSS);
        let state = PacmanState::new(Pos::new(2, 2), BTreeSet::new(), BTreeSet::new(), 3);
        let succs = state.successors(&m, &mut rng());
        let stay = find(&succs, Action::Stop).unwrap();
        assert_eq!(stay.path_cost(), 0);
        assert_eq!(stay.ability_steps(), 3);
        assert_eq!(stay, &state);
    }

    #[test]
    fn test_move_costs_one_and_ticks_ability() {
        let m = maze(&CROSS);
        let state = PacmanState::new(Pos::new(2, 2), BTreeSet::new(), BTreeSet::new(), 3);
        let succs = state.successors(&m, &mut rng());
        let east = find(&succs, Action::East).unwrap();
        assert_eq!(east.position(), Pos::new(3, 2));
        assert_eq!(east.path_cost(), 1);
        assert_eq!(east.ability_steps(), 2);
    }

    #[test]
    fn test_pie_refreshes_ability() {
        let m = maze(&CROSS);
        let start = PacmanState::initial(&m);
        let mut r = rng();
        let s1 = start.successor(&m, Action::East, &mut r).unwrap();
        let s2 = s1.successor(&m, Action::East, &mut r).unwrap();
        assert_eq!(s2.position(), Pos::new(4, 2));
        assert!(s2.remaining_pies().is_empty());
        assert_eq!(s2.ability_steps(), PIE_STEPS);
    }

    #[test]
    fn test_walls_block_without_ability() {
        let m = maze(&CROSS);
        let start = PacmanState::initial(&m);
        let succs = start.successors(&m, &mut rng());
        let actions: Vec<Action> = succs.iter().map(|s| s.actions()[0]).collect();
        assert_eq!(actions, vec![Action::East, Action::West, Action::Stop]);
    }

    #[test]
    fn test_trap_avoidance_prunes_last_ability_step_into_wall() {
        let m = maze(&CROSS);
        let one_left = PacmanState::new(Pos::new(2, 2), BTreeSet::new(), BTreeSet::new(), 1);
        let succs = one_left.successors(&m, &mut rng());
        assert!(find(&succs, Action::North).is_none());
        assert!(find(&succs, Action::South).is_none());
        assert!(find(&succs, Action::East).is_some());

        let two_left = PacmanState::new(Pos::new(2, 2), BTreeSet::new(), BTreeSet::new(), 2);
        let succs = two_left.successors(&m, &mut rng());
        let north = find(&succs, Action::North).unwrap();
        assert_eq!(north.position(), Pos::new(2, 1));
        assert_eq!(north.ability_steps(), 1);
        assert!(m.is_wall(north.position()));
    }

    #[test]
    fn test_food_collected_and_unchanged_sets_are_shared() {
        let m = maze(&["%%%%%%%", "%%% %%%", "% P.O %", "%%% %%%", "%%%%%%%"]);
        let start = PacmanState::initial(&m);
        let succs = start.successors(&m, &mut rng());
        let east = find(&succs, Action::East).unwrap();
        assert!(east.remaining_food().is_empty());
        assert_eq!(east.score(), FOOD_SCORE);
        assert!(Rc::ptr_eq(&east.remaining_pies, &start.remaining_pies));

        let west = find(&succs, Action::West).unwrap();
        assert!(Rc::ptr_eq(&west.remaining_food, &start.remaining_food));
    }

    #[test]
    fn test_corner_teleport_relocates_and_collects() {
        let m = maze(&["%%%%%", "% P %", "%   %", "%  .%", "%%%%%"]);
        let start = PacmanState::initial(&m);
        let west = start.successor(&m, Action::West, &mut rng()).unwrap();
        assert_eq!(west.position(), Pos::new(3, 3));
        assert_eq!(west.path_cost(), 1);
        assert!(west.is_goal());
    }

    #[test]
    fn test_identity_ignores_path_and_cost() {
        let m = maze(&CROSS);
        let start = PacmanState::initial(&m);
        let mut r = rng();
        let there_and_back = start
            .successor(&m, Action::East, &mut r)
            .and_then(|s| s.successor(&m, Action::West, &mut r))
            .unwrap();
        let stayed = start.successor(&m, Action::Stop, &mut r).unwrap();
        assert_eq!(there_and_back, stayed);
        assert_eq!(hash_of(&there_and_back), hash_of(&stayed));
        assert_ne!(there_and_back.path_cost(), stayed.path_cost());
        assert_ne!(there_and_back.actions(), stayed.actions());
    }

    #[test]
    fn test_food_order_does_not_matter_for_identity() {
        let a: BTreeSet<Pos> = [Pos::new(1, 1), Pos::new(2, 2)].into_iter().collect();
        let b: BTreeSet<Pos> = [Pos::new(2, 2), Pos::new(1, 1)].into_iter().collect();
        let s1 = PacmanState::new(Pos::new(0, 0), a, BTreeSet::new(), 0);
        let s2 = PacmanState::new(Pos::new(0, 0), b, BTreeSet::new(), 0);
        assert_eq!(s1, s2);
        assert_eq!(hash_of(&s1), hash_of(&s2));

        let s3 = PacmanState::new(Pos::new(0, 0), BTreeSet::new(), BTreeSet::new(), 1);
        let s4 = PacmanState::new(Pos::new(0, 0), BTreeSet::new(), BTreeSet::new(), 0);
        assert_ne!(s3, s4);
    }

    #[test]
    fn test_trail_records_frames() {
        let m = maze(&CROSS);
        let mut r = rng();
        let s = PacmanState::initial(&m)
            .successor(&m, Action::East, &mut r)
            .and_then(|s| s.successor(&m, Action::Stop, &mut r))
            .unwrap();
        let frames = s.trail().frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].position, Pos::new(3, 2));
        assert_eq!(frames[1].action, Action::Stop);
        assert_eq!(frames[1].position, Pos::new(3, 2));
    }

    #[test]
    fn test_moving_wall_flips_and_traps_are_pruned() {
        // Raised for the first three moves, lowered for the next three.
        let m = maze(&["%%%%%%%", "%%% %%%", "% P M.%", "%%% %%%", "%%%%%%%"]);
        let mut r = rng();
        let s0 = PacmanState::initial(&m);
        assert!(s0.moving_walls_active());
        let s1 = s0.successor(&m, Action::East, &mut r).unwrap();
        assert!(s1.successor(&m, Action::East, &mut r).is_none());
        let s2 = s1.successor(&m, Action::West, &mut r).unwrap();
        let s3 = s2.successor(&m, Action::East, &mut r).unwrap();
        assert!(!s3.moving_walls_active());

        let s4 = s3.successor(&m, Action::East, &mut r).unwrap();
        assert_eq!(s4.position(), Pos::new(4, 2));
        let s5 = s4.successor(&m, Action::East, &mut r).unwrap();
        assert!(s5.is_goal());

        // Stepping onto the wall on the move that raises it would trap Pacman.
        let back = s3
            .successor(&m, Action::West, &mut r)
            .and_then(|s| s.successor(&m, Action::East, &mut r))
            .unwrap();
        assert_eq!(back.position(), Pos::new(3, 2));
        assert!(back.successor(&m, Action::East, &mut r).is_none());
    }

    #[test]
    fn test_speed_boost_dashes_two_cells() {
        let m = maze(&["%%%%%%%%%", "%%%% %%%%", "%PB . . %", "%%%% %%%%", "%%%%%%%%%"]);
        let mut r = rng();
        let s1 = PacmanState::initial(&m)
            .successor(&m, Action::East, &mut r)
            .unwrap();
        assert_eq!(s1.boost_steps(), BOOST_STEPS);
        let s2 = s1.successor(&m, Action::East, &mut r).unwrap();
        assert_eq!(s2.position(), Pos::new(4, 2));
        assert_eq!(s2.path_cost(), 2);
        assert_eq!(s2.remaining_food().len(), 1);

        let frames = s2.trail().frames();
        assert_eq!(frames[0].dash, None);
        assert_eq!(frames[1].dash, Some(Pos::new(3, 2)));
    }

    #[test]
    fn test_stop_on_corner_teleports_for_free() {
        let m = maze(&["%%%%%", "%.P %", "%   %", "%  .%", "%%%%%"]);
        let mut r = rng();
        let west = PacmanState::initial(&m)
            .successor(&m, Action::West, &mut r)
            .unwrap();
        assert_eq!(west.position(), Pos::new(3, 3));
        assert_eq!(west.remaining_food().len(), 1);

        let stay = west.successor(&m, Action::Stop, &mut r).unwrap();
        assert_eq!(stay.position(), Pos::new(1, 1));
        assert_eq!(stay.path_cost(), 1);
        assert!(stay.is_goal());
        assert_ne!(stay, west);
        assert_eq!(stay.trail().frames()[1].position, Pos::new(1, 1));
    }

    #[test]
    fn test_stop_teleport_leaves_counters_alone() {
        let m = maze(&["%%%%%", "% P %", "%   %", "%   %", "%%%%%"]);
        let state = PacmanState::new(Pos::new(3, 3), BTreeSet::new(), BTreeSet::new(), 2);
        let stay = state.successor(&m, Action::Stop, &mut rng()).unwrap();
        assert_eq!(stay.position(), Pos::new(1, 1));
        assert_eq!(stay.ability_steps(), 2);
        assert_eq!(stay.path_cost(), 0);
    }

    #[test]
    fn test_teleport_pad_relocates_to_its_partner() {
        let m = maze(&[
            "%%%%%%%%%",
            "%%%% %%%%",
            "%T P %T.%",
            "%%%% %%%%",
            "%%%%%%%%%",
        ]);
        assert!(m.corners().is_empty());
        let mut r = rng();
        let on_pad = PacmanState::initial(&m)
            .successor(&m, Action::West, &mut r)
            .and_then(|s| s.successor(&m, Action::West, &mut r))
            .unwrap();
        assert_eq!(on_pad.position(), Pos::new(6, 2));
        assert_eq!(on_pad.path_cost(), 2);

        let done = on_pad.successor(&m, Action::East, &mut r).unwrap();
        assert_eq!(done.position(), Pos::new(7, 2));
        assert!(done.is_goal());
        assert_eq!(done.score(), FOOD_SCORE);

        // Walking back onto the partner pad sends Pacman to the first one.
        let back = done.successor(&m, Action::West, &mut r).unwrap();
        assert_eq!(back.position(), Pos::new(1, 2));
    }

    #[test]
    fn test_eating_fruit_scores_and_extends_scare() {
        let m = maze(&["%%%%%%%", "%%% %%%", "% PF  %", "%%% %%%", "%%%%%%%"]);
        let bare = PacmanState::initial(&m);
        let mut with_fruit = bare.clone();
        with_fruit.arena.fruit = Rc::new(BTreeSet::from([Pos::new(3, 2)]));
        with_fruit.arena.scared_steps = 2;
        assert!(!with_fruit.remaining_fruit().is_empty());
        assert_ne!(with_fruit, bare);

        let ate = with_fruit
            .successor(&m, Action::East, &mut rng())
            .unwrap();
        assert_eq!(ate.position(), Pos::new(3, 2));
        assert!(!ate.remaining_fruit().contains(&Pos::new(3, 2)));
        assert_eq!(ate.score(), FRUIT_SCORE);
        assert_eq!(ate.scared_steps(), 1 + FRUIT_SCARE_BONUS);
    }
}

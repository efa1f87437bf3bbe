use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::SeedableRng;

use pacman_search::heuristic::{mst_weight, nearest_food_distance};
use pacman_search::{astar, astar_with, Action, Heuristic, Maze, PacmanState, SearchOptions};

/// Every state reachable from the start, with `(successor index, action cost)` edges.
///
/// Stop edges are left out; on the corner-free fixtures they are zero-cost self loops.
struct StateGraph {
    states: Vec<PacmanState>,
    edges: Vec<Vec<(usize, u32)>>,
}

impl StateGraph {
    fn explore(maze: &Maze) -> Self {
        let mut rng = StdRng::seed_from_u64(0);
        let mut index: HashMap<PacmanState, usize> = HashMap::new();
        let mut states = Vec::new();
        let mut edges = vec![Vec::new()];
        let start = PacmanState::initial(maze);
        index.insert(start.clone(), 0);
        states.push(start);
        let mut queue = VecDeque::from([0]);

        while let Some(i) = queue.pop_front() {
            let mut out = Vec::new();
            for succ in states[i].successors(maze, &mut rng) {
                let Some(&action) = succ.actions().last() else {
                    continue;
                };
                if action == Action::Stop {
                    continue;
                }
                let j = match index.get(&succ) {
                    Some(&j) => j,
                    None => {
                        let j = states.len();
                        index.insert(succ.clone(), j);
                        states.push(succ);
                        edges.push(Vec::new());
                        queue.push_back(j);
                        j
                    }
                };
                out.push((j, action.cost()));
            }
            edges[i] = out;
        }
        StateGraph { states, edges }
    }

    /// True remaining cost for every state, by reverse BFS from all goals.
    fn goal_distances(&self) -> Vec<Option<u32>> {
        let mut reverse = vec![Vec::new(); self.states.len()];
        for (i, outs) in self.edges.iter().enumerate() {
            for &(j, _) in outs {
                reverse[j].push(i);
            }
        }
        let mut dist = vec![None; self.states.len()];
        let mut queue = VecDeque::new();
        for (i, s) in self.states.iter().enumerate() {
            if s.is_goal() {
                dist[i] = Some(0);
                queue.push_back(i);
            }
        }
        while let Some(j) = queue.pop_front() {
            let d = dist[j].unwrap_or(0) + 1;
            for &i in &reverse[j] {
                if dist[i].is_none() {
                    dist[i] = Some(d);
                    queue.push_back(i);
                }
            }
        }
        dist
    }
}

fn maze(rows: &[&str]) -> Maze {
    Maze::parse(&rows.join("\n")).unwrap()
}

// None of these have teleporting corners, so Manhattan estimates stay admissible.
fn small_grids() -> Vec<Maze> {
    vec![
        maze(&["%%%%%%%", "%% . %%", "% P%O %", "%.   .%", "%% %%%%", "%%%%%%%"]),
        maze(&["%% %%", "%P  %", "% % %", "%. .%", "%% %%"]),
        maze(&["%%%%%%%", "%%. %%%", "%P %  %", "%  O% %", "%%% .%%", "%%%%%%%"]),
        maze(&["%%%%%%", "%% .%%", "%P%% %", "%O . %", "%%% %%", "%%%%%%"]),
    ]
}

#[test]
fn fixtures_have_no_teleports() {
    for m in small_grids() {
        assert!(m.corners().is_empty(), "{}", m);
    }
}

#[test]
fn heuristics_are_admissible() {
    for m in small_grids() {
        let graph = StateGraph::explore(&m);
        let dist = graph.goal_distances();
        for (s, d) in graph.states.iter().zip(&dist) {
            let Some(d) = *d else { continue };
            let near = nearest_food_distance(s.position(), s.remaining_food());
            let mst = mst_weight(s.position(), s.remaining_food());
            assert!(near <= d, "nearest {} > {} at {}", near, d, s.position());
            assert!(mst <= d, "mst {} > {} at {}", mst, d, s.position());
        }
    }
}

#[test]
fn heuristics_are_consistent() {
    for m in small_grids() {
        let graph = StateGraph::explore(&m);
        for (i, outs) in graph.edges.iter().enumerate() {
            let s = &graph.states[i];
            for &(j, cost) in outs {
                let t = &graph.states[j];
                for h in [Heuristic::NearestFood, Heuristic::Mst] {
                    assert!(
                        h.estimate(s) <= cost + h.estimate(t),
                        "{} inconsistent from {} to {}",
                        h,
                        s.position(),
                        t.position()
                    );
                }
            }
        }
    }
}

#[test]
fn astar_matches_brute_force_optimum() {
    for m in small_grids() {
        let graph = StateGraph::explore(&m);
        let optimum = graph.goal_distances()[0];
        for h in [Heuristic::Zero, Heuristic::NearestFood, Heuristic::Mst] {
            let out = astar(&m, &SearchOptions { heuristic: h, seed: 0 });
            let cost = out.solution.as_ref().map(|s| s.cost);
            assert_eq!(cost, optimum, "{} on\n{}", h, m);
            if let Some(sol) = out.solution {
                assert_eq!(sol.actions.len() as u32, sol.cost);
            }
        }
    }
}

#[test]
fn no_reachable_state_is_stuck_in_a_wall() {
    for m in small_grids() {
        for s in StateGraph::explore(&m).states {
            assert!(
                !(m.is_wall(s.position()) && s.ability_steps() == 0),
                "trapped at {}",
                s.position()
            );
        }
    }
}

#[test]
fn food_never_reappears() {
    let grids = small_grids();
    let m = &grids[0];
    let graph = StateGraph::explore(m);
    for (i, outs) in graph.edges.iter().enumerate() {
        let before = graph.states[i].remaining_food();
        for &(j, _) in outs {
            assert!(graph.states[j].remaining_food().is_subset(before));
        }
    }
}

#[test]
fn equal_configurations_hash_alike() {
    let m = maze(&["%%%%%%", "%%  %%", "%P   %", "%%  %%", "%%%%%%"]);
    let mut rng = StdRng::seed_from_u64(0);
    let start = PacmanState::initial(&m);
    let walk = |moves: &[Action], rng: &mut StdRng| {
        moves
            .iter()
            .try_fold(start.clone(), |s, &a| s.successor(&m, a, rng))
            .unwrap()
    };
    let a = walk(&[Action::East, Action::North, Action::East], &mut rng);
    let b = walk(&[Action::East, Action::East, Action::North], &mut rng);
    assert_eq!(a.position(), b.position());
    assert_eq!(a, b);
    let hash = |s: &PacmanState| {
        let mut h = DefaultHasher::new();
        s.hash(&mut h);
        h.finish()
    };
    assert_eq!(hash(&a), hash(&b));
}

#[test]
fn custom_estimate_plugs_into_the_driver() {
    let grids = small_grids();
    let m = &grids[1];
    let mut rng = StdRng::seed_from_u64(1);
    let calls = std::cell::Cell::new(0);
    let out = astar_with(
        m,
        |s| {
            calls.set(calls.get() + 1);
            s.remaining_food().len() as u32
        },
        &mut rng,
    );
    assert!(out.solution.is_some());
    assert!(calls.get() > 0);
    assert!(out.stats.nodes_generated >= out.stats.nodes_expanded);
}

#[test]
fn extended_search_is_reproducible_for_a_seed() {
    let m = maze(&[
        "%%%%%%%%%",
        "%%.% %G%%",
        "% P     %",
        "%%.% %.%%",
        "%%%%%%%%%",
    ]);
    assert!(m.is_extended());
    let opts = SearchOptions {
        heuristic: Heuristic::Mst,
        seed: 17,
    };
    let first = astar(&m, &opts);
    let second = astar(&m, &opts);
    assert_eq!(first.solution, second.solution);
    assert_eq!(first.stats, second.stats);
}

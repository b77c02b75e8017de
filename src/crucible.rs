use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap},
};

use log::{debug, trace};

use crate::{Direction, Error, HeatMap, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrucibleRule {
    min_run: usize,
    max_run: usize,
}

impl CrucibleRule {
    pub fn new(min_run: usize, max_run: usize) -> Result<Self, Error> {
        if min_run == 0 || min_run > max_run {
            return Err(Error::InvalidRunBounds(min_run, max_run));
        }

        Ok(Self { min_run, max_run })
    }

    pub fn normal() -> Self {
        Self {
            min_run: 1,
            max_run: 3,
        }
    }

    pub fn ultra() -> Self {
        Self {
            min_run: 4,
            max_run: 10,
        }
    }

    pub fn min_run(&self) -> usize {
        self.min_run
    }

    pub fn max_run(&self) -> usize {
        self.max_run
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchLimit {
    max_steps: Option<usize>,
}

impl SearchLimit {
    pub fn unlimited() -> Self {
        Self { max_steps: None }
    }

    pub fn steps(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }

    fn is_reached(&self, step_n: usize) -> bool {
        self.max_steps.is_some_and(|max_steps| step_n >= max_steps)
    }
}

impl From<Option<usize>> for SearchLimit {
    fn from(max_steps: Option<usize>) -> Self {
        Self { max_steps }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Action {
    Forward,
    TurnClockwise,
    TurnCounterclockwise,
}

impl Action {
    pub fn all_actions() -> &'static [Action] {
        static ALL_ACTIONS: [Action; 3] = [
            Action::Forward,
            Action::TurnClockwise,
            Action::TurnCounterclockwise,
        ];

        &ALL_ACTIONS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Crucible {
    pos: Position,
    dir: Direction,
    // Blocks moved in `dir` so far, counting the one entering `pos`.
    streak: usize,
}

impl Crucible {
    fn new(pos: Position, dir: Direction, streak: usize) -> Self {
        Self { pos, dir, streak }
    }

    fn clone_and_do(&self, action: Action, map: &HeatMap, rule: &CrucibleRule) -> Option<Self> {
        let (dir, streak) = match action {
            Action::Forward if self.streak < rule.max_run => (self.dir, self.streak + 1),
            Action::TurnClockwise if self.streak >= rule.min_run => {
                (self.dir.turn_clockwise(), 1)
            }
            Action::TurnCounterclockwise if self.streak >= rule.min_run => {
                (self.dir.turn_counterclockwise(), 1)
            }
            _ => return None,
        };

        self.pos
            .neighbor(dir)
            .filter(|pos| map.is_inside(pos))
            .map(|pos| Self::new(pos, dir, streak))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct State {
    crucible: Crucible,
    loss: u32,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties on loss are broken by direction, then streak, then position.
        (
            self.loss,
            self.crucible.dir,
            self.crucible.streak,
            self.crucible.pos,
        )
            .cmp(&(
                other.loss,
                other.crucible.dir,
                other.crucible.streak,
                other.crucible.pos,
            ))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl State {
    pub fn new(crucible: Crucible, loss: u32) -> Self {
        Self { crucible, loss }
    }
}

pub(crate) struct Search<'a> {
    map: &'a HeatMap,
    from: Position,
    to: Position,
    rule: CrucibleRule,
    limit: SearchLimit,
    min_losses: HashMap<Crucible, u32>,
    src_crucibles: HashMap<Crucible, Crucible>,
    possible_states: BinaryHeap<Reverse<State>>,
}

impl<'a> Search<'a> {
    pub fn new(
        map: &'a HeatMap,
        from: &Position,
        to: &Position,
        rule: &CrucibleRule,
        limit: SearchLimit,
    ) -> Result<Self, Error> {
        for pos in [from, to] {
            if !map.is_inside(pos) {
                return Err(Error::OutOfMap(*pos));
            }
        }
        if from == to {
            return Err(Error::SameStartAndEnd(*from));
        }

        Ok(Self {
            map,
            from: *from,
            to: *to,
            rule: *rule,
            limit,
            min_losses: HashMap::new(),
            src_crucibles: HashMap::new(),
            possible_states: BinaryHeap::new(),
        })
    }

    pub fn run(&mut self) -> Result<(u32, Crucible), Error> {
        debug!(
            "Search from {} to {} with run in [{}, {}].",
            self.from, self.to, self.rule.min_run, self.rule.max_run
        );
        for dir in [Direction::East, Direction::South] {
            let init_crucible = Crucible::new(self.from, dir, 1);
            self.min_losses.insert(init_crucible, 0);
            self.possible_states
                .push(Reverse(State::new(init_crucible, 0)));
        }

        let mut step_n = 0;
        while let Some(Reverse(cur_state)) = self.possible_states.pop() {
            if self
                .min_losses
                .get(&cur_state.crucible)
                .is_some_and(|loss| *loss < cur_state.loss)
            {
                continue;
            }

            if self.limit.is_reached(step_n) {
                debug!("Search stopped by step limit after {} step(s).", step_n);
                return Err(Error::StepBudgetExhausted(step_n));
            }
            step_n += 1;

            let cur_crucible = cur_state.crucible;
            if cur_crucible.pos == self.to && cur_crucible.streak >= self.rule.min_run {
                debug!(
                    "Found minimum heat loss {} after {} step(s), {} state(s) recorded.",
                    cur_state.loss,
                    step_n,
                    self.min_losses.len()
                );
                return Ok((cur_state.loss, cur_crucible));
            }

            trace!("Explore {:?} with heat loss {}.", cur_crucible, cur_state.loss);
            for action in Action::all_actions() {
                let Some(next_crucible) = cur_crucible.clone_and_do(*action, self.map, &self.rule)
                else {
                    continue;
                };
                let Some(block_loss) = self.map.heat_loss(&next_crucible.pos) else {
                    continue;
                };

                let next_loss = cur_state.loss + block_loss;
                if self
                    .min_losses
                    .get(&next_crucible)
                    .map(|loss| next_loss < *loss)
                    .unwrap_or(true)
                {
                    self.min_losses.insert(next_crucible, next_loss);
                    self.src_crucibles.insert(next_crucible, cur_crucible);
                    self.possible_states
                        .push(Reverse(State::new(next_crucible, next_loss)));
                }
            }
        }

        debug!("Frontier exhausted after {} step(s).", step_n);
        Err(Error::Unreachable(self.from, self.to))
    }

    pub fn path_to(&self, end_crucible: &Crucible) -> Vec<Position> {
        let mut path = vec![end_crucible.pos];
        let mut cur_crucible = end_crucible;
        while let Some(src_crucible) = self.src_crucibles.get(cur_crucible) {
            path.push(src_crucible.pos);
            cur_crucible = src_crucible;
        }
        path.reverse();

        path
    }
}

#[cfg(test)]
const TEST_MAP: &str = "2413432311323
3215453535623
3255245654254
3446585845452
4546657867536
1438598798454
4457876987766
3637877979653
4654967986887
4564679986453
1224686865563
2546548887735
4322674655533";

#[cfg(test)]
fn test_map() -> HeatMap {
    TEST_MAP.parse().unwrap()
}

#[cfg(test)]
fn min_corner_loss(map: &HeatMap, min_run: usize, max_run: usize) -> Result<u32, Error> {
    let rule = CrucibleRule::new(min_run, max_run)?;
    map.min_heat_loss(&map.top_left(), &map.bottom_right(), &rule)
}

#[cfg(test)]
fn check_path(map: &HeatMap, path: &[Position], rule: &CrucibleRule) -> u32 {
    let mut loss = 0;
    let mut last_dir: Option<Direction> = None;
    let mut streak = 0;
    let mut runs = Vec::new();
    for (last_pos, pos) in path.iter().zip(path.iter().skip(1)) {
        let dir = last_pos.dir_to(pos).expect("blocks on path should be adjacent");
        match last_dir {
            Some(last_dir) if last_dir == dir => streak += 1,
            Some(last_dir) => {
                assert_ne!(dir, last_dir.reverse(), "crucible can't reverse");
                runs.push(streak);
                streak = 1;
            }
            None => streak = 1,
        }
        last_dir = Some(dir);
        loss += map.heat_loss(pos).unwrap();
    }
    runs.push(streak);

    // The first run may start with one block already counted.
    assert!(runs[0] <= rule.max_run());
    assert!(runs[0] + 1 >= rule.min_run());
    for run in &runs[1..] {
        assert!(*run <= rule.max_run());
        assert!(*run >= rule.min_run());
    }

    loss
}

#[test]
fn test_normal_crucible() {
    assert_eq!(min_corner_loss(&test_map(), 1, 3), Ok(102));
}

#[test]
fn test_ultra_crucible() {
    assert_eq!(min_corner_loss(&test_map(), 4, 10), Ok(94));
}

#[test]
fn test_ultra_crucible_long_corridor() {
    let map = "111111111111
999999999991
999999999991
999999999991
999999999991"
        .parse::<HeatMap>()
        .unwrap();
    assert_eq!(min_corner_loss(&map, 4, 10), Ok(71));
}

#[test]
fn test_uniform_loss_is_manhattan() {
    let map = "5555\n5555\n5555\n5555".parse::<HeatMap>().unwrap();
    let (from, to) = (map.top_left(), map.bottom_right());
    assert_eq!(
        map.min_heat_loss(&from, &to, &CrucibleRule::normal()),
        Ok(5 * from.manhattan_dist(&to) as u32)
    );
}

#[test]
fn test_relaxing_rule_never_costs_more() {
    let map = test_map();
    let losses = (3..=10)
        .map(|max_run| min_corner_loss(&map, 1, max_run).unwrap())
        .collect::<Vec<_>>();
    assert!(losses.windows(2).all(|pair| pair[1] <= pair[0]));
    assert_eq!(losses.last(), Some(&82));

    let losses = (1..=4)
        .rev()
        .map(|min_run| min_corner_loss(&map, min_run, 10).unwrap())
        .collect::<Vec<_>>();
    assert!(losses.windows(2).all(|pair| pair[1] <= pair[0]));
    assert_eq!(losses, vec![94, 87, 84, 82]);
}

#[test]
fn test_repeated_search() {
    let map = test_map();
    let first = min_corner_loss(&map, 4, 10);
    let second = min_corner_loss(&map, 4, 10);
    assert_eq!(first, second);
    assert_eq!(map, test_map());
}

#[test]
fn test_same_start_and_end() {
    let map = "7".parse::<HeatMap>().unwrap();
    let pos = Position::new(0, 0);
    assert_eq!(
        map.min_heat_loss(&pos, &pos, &CrucibleRule::normal()),
        Err(Error::SameStartAndEnd(pos))
    );
}

#[test]
fn test_out_of_map() {
    let map = test_map();
    let outside = Position::new(13, 0);
    assert_eq!(
        map.min_heat_loss(&map.top_left(), &outside, &CrucibleRule::normal()),
        Err(Error::OutOfMap(outside))
    );
}

#[test]
fn test_unreachable_with_short_run() {
    let map = "111".parse::<HeatMap>().unwrap();
    let (from, to) = (map.top_left(), map.bottom_right());
    assert_eq!(
        map.min_heat_loss(&from, &to, &CrucibleRule::ultra()),
        Err(Error::Unreachable(from, to))
    );
    assert_eq!(map.min_heat_loss(&from, &to, &CrucibleRule::normal()), Ok(2));
}

#[test]
fn test_step_limit() {
    let map = test_map();
    let (from, to) = (map.top_left(), map.bottom_right());
    assert_eq!(
        map.min_heat_loss_within(&from, &to, &CrucibleRule::normal(), SearchLimit::steps(1)),
        Err(Error::StepBudgetExhausted(1))
    );
    assert_eq!(
        map.min_heat_loss_within(&from, &to, &CrucibleRule::normal(), SearchLimit::default()),
        Ok(102)
    );
}

#[test]
fn test_min_loss_path() {
    let map = test_map();
    for rule in [CrucibleRule::normal(), CrucibleRule::ultra()] {
        let (from, to) = (map.top_left(), map.bottom_right());
        let (loss, path) = map
            .min_heat_loss_path(&from, &to, &rule, SearchLimit::unlimited())
            .unwrap();
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert_eq!(check_path(&map, &path, &rule), loss);
    }
}

#[test]
fn test_crucible_moves() {
    let map = test_map();
    let rule = CrucibleRule::ultra();
    let crucible = Crucible::new(Position::new(0, 0), Direction::East, 1);
    assert_eq!(
        crucible.clone_and_do(Action::Forward, &map, &rule),
        Some(Crucible::new(Position::new(0, 1), Direction::East, 2))
    );
    assert_eq!(crucible.clone_and_do(Action::TurnClockwise, &map, &rule), None);

    let crucible = Crucible::new(Position::new(0, 10), Direction::East, 10);
    assert_eq!(crucible.clone_and_do(Action::Forward, &map, &rule), None);
    assert_eq!(
        crucible.clone_and_do(Action::TurnClockwise, &map, &rule),
        Some(Crucible::new(Position::new(1, 10), Direction::South, 1))
    );
    assert_eq!(
        crucible.clone_and_do(Action::TurnCounterclockwise, &map, &rule),
        None
    );
}

#[cfg(test)]
fn relaxed_min_loss(
    map: &HeatMap,
    from: &Position,
    to: &Position,
    rule: &CrucibleRule,
) -> Option<u32> {
    let mut losses = HashMap::from([
        ((*from, Direction::East, 1), 0),
        ((*from, Direction::South, 1), 0),
    ]);
    let mut changed = true;
    while changed {
        changed = false;
        for ((pos, dir, streak), loss) in losses.clone() {
            for next_dir in Direction::all_dirs().iter().copied() {
                if next_dir == dir.reverse()
                    || (next_dir == dir && streak >= rule.max_run())
                    || (next_dir != dir && streak < rule.min_run())
                {
                    continue;
                }
                let Some(next_pos) = pos.neighbor(next_dir) else {
                    continue;
                };
                let Some(block_loss) = map.heat_loss(&next_pos) else {
                    continue;
                };
                let next_streak = if next_dir == dir { streak + 1 } else { 1 };
                let next_loss = loss + block_loss;
                let known_loss = losses
                    .entry((next_pos, next_dir, next_streak))
                    .or_insert(u32::MAX);
                if next_loss < *known_loss {
                    *known_loss = next_loss;
                    changed = true;
                }
            }
        }
    }

    losses
        .iter()
        .filter(|((pos, _, streak), _)| pos == to && *streak >= rule.min_run())
        .map(|(_, loss)| *loss)
        .min()
}

#[test]
fn test_matches_exhaustive_relaxation() {
    let mut seed: u64 = 17;
    let mut next_n = |bound: u64| {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((seed >> 33) % bound) as usize
    };

    for _ in 0..60 {
        let row_n = 1 + next_n(5);
        let col_n = 2 + next_n(4);
        let text = (0..row_n)
            .map(|_| {
                (0..col_n)
                    .map(|_| char::from(b'0' + next_n(10) as u8))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        let map = text.parse::<HeatMap>().unwrap();
        let min_run = 1 + next_n(4);
        let rule = CrucibleRule::new(min_run, min_run + next_n(4)).unwrap();
        let from = Position::new(next_n(row_n as u64), next_n(col_n as u64));
        let to = Position::new(next_n(row_n as u64), next_n(col_n as u64));
        if from == to {
            continue;
        }

        match map.min_heat_loss_path(&from, &to, &rule, SearchLimit::unlimited()) {
            Ok((loss, path)) => {
                assert_eq!(
                    Some(loss),
                    relaxed_min_loss(&map, &from, &to, &rule),
                    "{}",
                    text
                );
                assert_eq!(path.first(), Some(&from));
                assert_eq!(path.last(), Some(&to));
                let path_loss = path[1..]
                    .iter()
                    .map(|pos| map.heat_loss(pos).unwrap())
                    .sum::<u32>();
                assert_eq!(path_loss, loss);
            }
            Err(err) => {
                assert_eq!(err, Error::Unreachable(from, to));
                assert_eq!(relaxed_min_loss(&map, &from, &to, &rule), None, "{}", text);
            }
        }
    }
}

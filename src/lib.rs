use std::{
    error,
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;

mod crucible;

pub use crucible::{CrucibleRule, SearchLimit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InconsistentRow(usize, usize),
    InvalidCharForMap(char),
    EmptyMap,
    OutOfMap(Position),
    SameStartAndEnd(Position),
    InvalidRunBounds(usize, usize),
    Unreachable(Position, Position),
    StepBudgetExhausted(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InconsistentRow(expect_col_n, this_col_n) => write!(
                f,
                "Expect {} column(s) in each row, given {}.",
                expect_col_n, this_col_n
            ),
            Error::InvalidCharForMap(c) => write!(f, "Invalid character({}) for map.", c),
            Error::EmptyMap => write!(f, "Expect at least one block in map."),
            Error::OutOfMap(pos) => write!(f, "Position{} is outside of map.", pos),
            Error::SameStartAndEnd(pos) => write!(
                f,
                "Expect different start and end positions, given both at {}.",
                pos
            ),
            Error::InvalidRunBounds(min_run, max_run) => write!(
                f,
                "Invalid run bounds(min: {}, max: {}), expect 1 <= min <= max.",
                min_run, max_run
            ),
            Error::Unreachable(from, to) => write!(
                f,
                "There's no legal path from {} to {} for the crucible.",
                from, to
            ),
            Error::StepBudgetExhausted(step_n) => write!(
                f,
                "Search gave up after exploring {} state(s) without reaching the end.",
                step_n
            ),
        }
    }
}

impl error::Error for Error {}

#[derive(Debug, Parser)]
pub struct CLIArgs {
    pub input_path: PathBuf,
    /// Give up after exploring this many search states.
    #[arg(long)]
    pub max_steps: Option<usize>,
    /// Print the map with one route of minimum heat loss drawn on it.
    #[arg(long)]
    pub show_path: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    r: usize,
    c: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.r, self.c)
    }
}

impl Position {
    pub fn new(r: usize, c: usize) -> Self {
        Self { r, c }
    }

    pub fn neighbor(&self, dir: Direction) -> Option<Self> {
        match dir {
            Direction::North if self.r > 0 => Some(Self::new(self.r - 1, self.c)),
            Direction::East => Some(Self::new(self.r, self.c + 1)),
            Direction::South => Some(Self::new(self.r + 1, self.c)),
            Direction::West if self.c > 0 => Some(Self::new(self.r, self.c - 1)),
            _ => None,
        }
    }

    pub fn manhattan_dist(&self, other: &Position) -> usize {
        self.r.abs_diff(other.r) + self.c.abs_diff(other.c)
    }

    fn dir_to(&self, other: &Position) -> Option<Direction> {
        Direction::all_dirs()
            .iter()
            .copied()
            .find(|dir| self.neighbor(*dir).is_some_and(|pos| pos == *other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn all_dirs() -> &'static [Direction] {
        static ALL_DIRECTIONS: [Direction; 4] = [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ];

        &ALL_DIRECTIONS
    }

    pub fn turn_clockwise(&self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn turn_counterclockwise(&self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
        }
    }

    pub fn reverse(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    fn arrow(&self) -> char {
        match self {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatMap {
    heat_losses: Vec<u8>,
    row_n: usize,
    col_n: usize,
}

impl HeatMap {
    pub fn row_n(&self) -> usize {
        self.row_n
    }

    pub fn col_n(&self) -> usize {
        self.col_n
    }

    pub fn top_left(&self) -> Position {
        Position::new(0, 0)
    }

    pub fn bottom_right(&self) -> Position {
        Position::new(self.row_n - 1, self.col_n - 1)
    }

    pub fn heat_loss(&self, pos: &Position) -> Option<u32> {
        self.pos_to_ind(pos)
            .and_then(|ind| self.heat_losses.get(ind))
            .map(|loss| u32::from(*loss))
    }

    pub fn is_inside(&self, pos: &Position) -> bool {
        pos.r < self.row_n && pos.c < self.col_n
    }

    pub fn min_heat_loss(
        &self,
        from: &Position,
        to: &Position,
        rule: &CrucibleRule,
    ) -> Result<u32, Error> {
        self.min_heat_loss_within(from, to, rule, SearchLimit::unlimited())
    }

    pub fn min_heat_loss_within(
        &self,
        from: &Position,
        to: &Position,
        rule: &CrucibleRule,
        limit: SearchLimit,
    ) -> Result<u32, Error> {
        crucible::Search::new(self, from, to, rule, limit)?
            .run()
            .map(|(loss, _)| loss)
    }

    pub fn min_heat_loss_path(
        &self,
        from: &Position,
        to: &Position,
        rule: &CrucibleRule,
        limit: SearchLimit,
    ) -> Result<(u32, Vec<Position>), Error> {
        let mut search = crucible::Search::new(self, from, to, rule, limit)?;
        let (loss, end_crucible) = search.run()?;

        Ok((loss, search.path_to(&end_crucible)))
    }

    pub fn draw_path(&self, path: &[Position]) -> String {
        let mut chars = self
            .heat_losses
            .iter()
            .map(|loss| char::from(b'0' + *loss))
            .collect::<Vec<_>>();
        for (last_pos, pos) in path.iter().zip(path.iter().skip(1)) {
            if let (Some(dir), Some(ind)) = (last_pos.dir_to(pos), self.pos_to_ind(pos)) {
                chars[ind] = dir.arrow();
            }
        }

        chars
            .chunks(self.col_n)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn pos_to_ind(&self, pos: &Position) -> Option<usize> {
        if self.is_inside(pos) {
            Some(pos.r * self.col_n + pos.c)
        } else {
            None
        }
    }
}

impl FromStr for HeatMap {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut builder = HeatMapBuilder::new();
        for line in s.lines() {
            builder.add_row(line)?;
        }

        builder.build()
    }
}

#[derive(Debug)]
struct HeatMapBuilder {
    heat_losses: Vec<u8>,
    row_n: usize,
    col_n: Option<usize>,
}

impl HeatMapBuilder {
    pub fn new() -> Self {
        Self {
            heat_losses: Vec::new(),
            row_n: 0,
            col_n: None,
        }
    }

    pub fn add_row(&mut self, text: &str) -> Result<(), Error> {
        let this_col_n = text.chars().count();
        let expect_col_n = *self.col_n.get_or_insert(this_col_n);
        if expect_col_n != this_col_n {
            return Err(Error::InconsistentRow(expect_col_n, this_col_n));
        }

        for c in text.chars() {
            let loss = c.to_digit(10).ok_or(Error::InvalidCharForMap(c))?;
            self.heat_losses.push(loss as u8);
        }
        self.row_n += 1;

        Ok(())
    }

    pub fn build(self) -> Result<HeatMap, Error> {
        let col_n = self.col_n.unwrap_or(0);
        if self.row_n == 0 || col_n == 0 {
            return Err(Error::EmptyMap);
        }

        Ok(HeatMap {
            heat_losses: self.heat_losses,
            row_n: self.row_n,
            col_n,
        })
    }
}

pub fn read_heat_map<P: AsRef<Path>>(path: P) -> Result<HeatMap> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open given file({}).", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let mut builder = HeatMapBuilder::new();
    for (ind, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!(
                "Failed to read line {} in given file({}).",
                ind + 1,
                path.as_ref().display()
            )
        })?;
        builder
            .add_row(line.as_str())
            .with_context(|| format!("Failed to parse line {} as map row.", ind + 1))?;
    }

    Ok(builder.build()?)
}

pub fn solve(
    map: &HeatMap,
    from: &Position,
    to: &Position,
    min_run: usize,
    max_run: usize,
) -> Result<u32, Error> {
    let rule = CrucibleRule::new(min_run, max_run)?;
    map.min_heat_loss(from, to, &rule)
}

pub fn measure<T, F: FnOnce() -> T>(work: F) -> (T, Duration) {
    let start_time = Instant::now();
    let res = work();

    (res, start_time.elapsed())
}

#[test]
fn test_parse_map() {
    let map = "123\n456".parse::<HeatMap>().unwrap();
    assert_eq!(map.row_n(), 2);
    assert_eq!(map.col_n(), 3);
    assert_eq!(map.heat_loss(&Position::new(1, 2)), Some(6));
    assert_eq!(map.heat_loss(&Position::new(2, 0)), None);
    assert_eq!(map.bottom_right(), Position::new(1, 2));
}

#[test]
fn test_parse_inconsistent_row() {
    assert_eq!(
        "123\n45".parse::<HeatMap>(),
        Err(Error::InconsistentRow(3, 2))
    );
}

#[test]
fn test_parse_invalid_char() {
    assert_eq!(
        "123\n4x6".parse::<HeatMap>(),
        Err(Error::InvalidCharForMap('x'))
    );
}

#[test]
fn test_parse_empty() {
    assert_eq!("".parse::<HeatMap>(), Err(Error::EmptyMap));
}

#[test]
fn test_draw_path() {
    let map = "123\n456".parse::<HeatMap>().unwrap();
    let path = [
        Position::new(0, 0),
        Position::new(0, 1),
        Position::new(1, 1),
        Position::new(1, 2),
    ];
    assert_eq!(map.draw_path(&path), "1>3\n4v>");
}

#[test]
fn test_solve_rejects_bad_bounds() {
    let map = "123\n456".parse::<HeatMap>().unwrap();
    let (from, to) = (map.top_left(), map.bottom_right());
    assert_eq!(
        solve(&map, &from, &to, 0, 3),
        Err(Error::InvalidRunBounds(0, 3))
    );
    assert_eq!(
        solve(&map, &from, &to, 4, 3),
        Err(Error::InvalidRunBounds(4, 3))
    );
    assert_eq!(solve(&map, &from, &to, 1, 3), Ok(11));
}

#[test]
fn test_measure() {
    let (res, _) = measure(|| 6 * 7);
    assert_eq!(res, 42);
}

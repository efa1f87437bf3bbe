//! Terminal replay of a found solution.

use std::collections::BTreeSet;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use unicode_width::UnicodeWidthStr;

use crate::maze::{Action, Maze, Pos, Tile};
use crate::search::Solution;
use crate::state::{Frame, MOVING_WALL_PERIOD, PIE_STEPS};

const CELL_W: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Glyph {
    Pacman,
    Ghost,
    Wall,
    MovingWall,
    LoweredWall,
    Empty,
    Food,
    Pie,
    Pad,
    SlowPill,
    Boost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

/// Board contents after some prefix of a solution has been played.
///
/// Rebuilt from the recorded frames alone; fruit is not recorded, so it is not shown.
#[derive(Clone, Debug)]
pub struct Playback<'a> {
    maze: &'a Maze,
    frames: &'a [Frame],
    step: usize,
    position: Pos,
    ghosts: Vec<Pos>,
    food: BTreeSet<Pos>,
    pies: BTreeSet<Pos>,
    slow_pills: BTreeSet<Pos>,
    boosts: BTreeSet<Pos>,
    cost: u32,
    ability: u32,
    moves: u32,
}

impl<'a> Playback<'a> {
    pub fn new(maze: &'a Maze, frames: &'a [Frame]) -> Self {
        Playback {
            maze,
            frames,
            step: 0,
            position: maze.start(),
            ghosts: maze.ghost_starts().to_vec(),
            food: maze.food().clone(),
            pies: maze.pies().clone(),
            slow_pills: maze.slow_pills().clone(),
            boosts: maze.boosts().clone(),
            cost: 0,
            ability: 0,
            moves: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.frames.len()
    }

    /// Applies the next frame. Returns false once every frame has been played.
    pub fn advance(&mut self) -> bool {
        let Some(frame) = self.frames.get(self.step) else {
            return false;
        };
        self.step += 1;
        self.ghosts.clone_from(&frame.ghosts);
        if frame.action != Action::Stop {
            self.cost += frame.action.cost();
            self.moves += 1;
            self.ability = self.ability.saturating_sub(1);
        }
        if let Some(crossed) = frame.dash {
            self.collect(crossed);
        }
        self.position = frame.position;
        self.collect(frame.position);
        true
    }

    fn collect(&mut self, pos: Pos) {
        self.food.remove(&pos);
        if self.pies.remove(&pos) {
            self.ability = PIE_STEPS;
        }
        self.slow_pills.remove(&pos);
        self.boosts.remove(&pos);
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn food_left(&self) -> usize {
        self.food.len()
    }

    pub fn ability(&self) -> u32 {
        self.ability
    }

    fn walls_raised(&self) -> bool {
        (self.moves / u32::from(MOVING_WALL_PERIOD)) % 2 == 0
    }

    fn hud(&self) -> String {
        format!(
            "Step: {}/{}  Cost: {}  Food: {}  Ability: {}  (q to quit)",
            self.step,
            self.frames.len(),
            self.cost,
            self.food.len(),
            self.ability
        )
    }

    fn cell_at(&self, pos: Pos) -> Cell {
        if pos == self.position {
            let color = if self.ability > 0 { Color::Magenta } else { Color::Yellow };
            return Cell {
                glyph: Glyph::Pacman,
                color,
            };
        }
        if self.ghosts.contains(&pos) {
            return Cell {
                glyph: Glyph::Ghost,
                color: Color::Red,
            };
        }
        let (glyph, color) = if self.food.contains(&pos) {
            (Glyph::Food, Color::White)
        } else if self.pies.contains(&pos) {
            (Glyph::Pie, Color::Magenta)
        } else if self.slow_pills.contains(&pos) {
            (Glyph::SlowPill, Color::Cyan)
        } else if self.boosts.contains(&pos) {
            (Glyph::Boost, Color::Green)
        } else {
            match self.maze.tile(pos) {
                Some(Tile::Wall) | None => (Glyph::Wall, Color::Blue),
                Some(Tile::MovingWall) if self.walls_raised() => {
                    (Glyph::MovingWall, Color::DarkBlue)
                }
                Some(Tile::MovingWall) => (Glyph::LoweredWall, Color::DarkGrey),
                Some(Tile::TeleportPad) => (Glyph::Pad, Color::Cyan),
                Some(_) => (Glyph::Empty, Color::Reset),
            }
        };
        Cell { glyph, color }
    }
}

struct Renderer {
    last: Vec<Option<Cell>>,
    last_hud: String,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    fn new(width: usize, height: usize) -> Self {
        Renderer {
            last: vec![None; width * height],
            last_hud: String::new(),
            origin_x: 0,
            origin_y: 1,
        }
    }

    fn invalidate(&mut self) {
        self.last.iter_mut().for_each(|c| *c = None);
        self.last_hud.clear();
    }

    fn draw(&mut self, stdout: &mut Stdout, playback: &Playback) -> io::Result<()> {
        let maze = playback.maze;
        let needed_w = (maze.width() * CELL_W) as u16;
        let needed_h = (maze.height() + 2) as u16;

        let (term_w, term_h) = terminal::size()?;
        if term_w < needed_w || term_h < needed_h {
            stdout.queue(MoveTo(0, 0))?;
            stdout.queue(Clear(ClearType::All))?;
            stdout.queue(Print(format!(
                "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
                needed_w, needed_h, term_w, term_h
            )))?;
            self.invalidate();
            return stdout.flush();
        }

        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        if (origin_x, origin_y) != (self.origin_x, self.origin_y) {
            stdout.queue(Clear(ClearType::All))?;
            self.origin_x = origin_x;
            self.origin_y = origin_y;
            self.invalidate();
        }

        let hud = playback.hud();
        if hud != self.last_hud {
            stdout.queue(MoveTo(self.origin_x, self.origin_y - 1))?;
            stdout.queue(Clear(ClearType::CurrentLine))?;
            stdout.queue(SetForegroundColor(Color::White))?;
            stdout.queue(Print(&hud))?;
            stdout.queue(ResetColor)?;
            self.last_hud = hud;
        }

        for y in 0..maze.height() {
            for x in 0..maze.width() {
                let cell = playback.cell_at(Pos::new(x as i32, y as i32));
                let idx = y * maze.width() + x;
                if self.last[idx] != Some(cell) {
                    self.last[idx] = Some(cell);
                    self.draw_cell(stdout, x, y, cell)?;
                }
            }
        }
        stdout.flush()
    }

    fn draw_cell(&self, stdout: &mut Stdout, x: usize, y: usize, cell: Cell) -> io::Result<()> {
        let text = match cell.glyph {
            Glyph::Pacman => "ᗧ",
            Glyph::Ghost => "ᗣ",
            Glyph::Wall => "██",
            Glyph::MovingWall => "▓▓",
            Glyph::LoweredWall => "░░",
            Glyph::Empty => "  ",
            Glyph::Food => "· ",
            Glyph::Pie => "● ",
            Glyph::Pad => "◎ ",
            Glyph::SlowPill => "s ",
            Glyph::Boost => "» ",
        };
        stdout.queue(MoveTo(
            self.origin_x + (x * CELL_W) as u16,
            self.origin_y + y as u16,
        ))?;
        stdout.queue(SetForegroundColor(cell.color))?;
        stdout.queue(Print(text))?;
        let w = UnicodeWidthStr::width(text);
        for _ in w..CELL_W {
            stdout.queue(Print(' '))?;
        }
        stdout.queue(ResetColor)?;
        Ok(())
    }

    fn footer(&self, stdout: &mut Stdout, height: usize, text: &str) -> io::Result<()> {
        stdout.queue(MoveTo(self.origin_x, self.origin_y + height as u16))?;
        stdout.queue(Print(text))?;
        stdout.flush()
    }
}

/// Animates `solution` on the alternate screen, one frame per `tick`. Returns when the
/// user presses `q`, either mid-replay or on the final board.
pub fn replay(maze: &Maze, solution: &Solution, tick: Duration) -> io::Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, maze, solution, tick);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(stdout: &mut Stdout, maze: &Maze, solution: &Solution, tick: Duration) -> io::Result<()> {
    let mut playback = Playback::new(maze, &solution.frames);
    let mut renderer = Renderer::new(maze.width(), maze.height());
    renderer.draw(stdout, &playback)?;

    while !playback.is_finished() {
        let deadline = Instant::now() + tick;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            if quit_pressed(left)? {
                return Ok(());
            }
        }
        playback.advance();
        renderer.draw(stdout, &playback)?;
    }

    renderer.footer(
        stdout,
        maze.height(),
        &format!("Done - total cost {} (press q to quit)", solution.cost),
    )?;
    loop {
        if quit_pressed(Duration::from_millis(50))? {
            return Ok(());
        }
    }
}

fn quit_pressed(wait: Duration) -> io::Result<bool> {
    if event::poll(wait)? {
        if let Event::Key(key) = event::read()? {
            return Ok(key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q'));
        }
    }
    Ok(false)
}

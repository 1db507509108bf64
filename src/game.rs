use std::fmt;

use crate::board::{Board, Cell, DIRECTIONS, Disk};
use crate::error::GameError;
use crate::types::{CellView, DiskColor, GameStateView, Player, Position, Status};

pub const DEFAULT_BOARD_SIZE: u8 = 8;
pub const MIN_BOARD_SIZE: u8 = 4;
pub const MAX_BOARD_SIZE: u8 = 16;

/// Something that happened to a game, published after the change is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Started {
        first: Player,
    },
    TurnChanged {
        player: Player,
    },
    MoveMade {
        player: Player,
        position: Position,
        flipped: Vec<Position>,
    },
    TurnSkipped {
        player: Player,
    },
    Finished {
        status: Status,
        winner: Option<Player>,
        black_score: usize,
        white_score: usize,
    },
}

/// Receives every [`GameEvent`] synchronously, in order.
pub trait GameObserver: Send + Sync {
    fn on_event(&self, event: &GameEvent);
}

/// Forwards game events to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    game_id: String,
}

impl LogObserver {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
        }
    }
}

impl GameObserver for LogObserver {
    fn on_event(&self, event: &GameEvent) {
        let id = &self.game_id;
        match event {
            GameEvent::Started { first } => {
                log::info!("[{id}] game started, {} ({}) moves first", first.name, first.color)
            }
            GameEvent::TurnChanged { player } => {
                log::debug!("[{id}] turn: {} ({})", player.name, player.color)
            }
            GameEvent::MoveMade {
                player,
                position,
                flipped,
            } => log::debug!(
                "[{id}] {} placed at {position}, flipped {}",
                player.name,
                flipped.len()
            ),
            GameEvent::TurnSkipped { player } => {
                log::info!("[{id}] {} has no legal move, turn skipped", player.name)
            }
            GameEvent::Finished {
                status,
                winner,
                black_score,
                white_score,
            } => match winner {
                Some(winner) => log::info!(
                    "[{id}] game {status}: {} wins {black_score}-{white_score} (black-white)",
                    winner.name
                ),
                None => log::info!("[{id}] game {status} at {black_score}-{white_score}"),
            },
        }
    }
}

/// One Othello game: board, the two players, whose turn it is and the status.
pub struct Game {
    board: Board,
    players: [Player; 2],
    current: usize,
    status: Status,
    observers: Vec<Box<dyn GameObserver>>,
}

impl Game {
    /// Creates an unstarted game. `players[0]` will move first.
    pub fn new(size: u8, players: [Player; 2]) -> Result<Self, GameError> {
        Self::from_parts(Board::new(size), players, 0, Status::NotStarted)
    }

    /// Standard 8x8 game with `black` moving first.
    pub fn standard(black: impl Into<String>, white: impl Into<String>) -> Result<Self, GameError> {
        Self::new(
            DEFAULT_BOARD_SIZE,
            [
                Player::new(black, DiskColor::Black),
                Player::new(white, DiskColor::White),
            ],
        )
    }

    pub(crate) fn from_parts(
        board: Board,
        players: [Player; 2],
        current: usize,
        status: Status,
    ) -> Result<Self, GameError> {
        validate_board_size(board.size())?;
        if players[0].color == players[1].color {
            return Err(GameError::InvalidSetup(format!(
                "both players have color {}",
                players[0].color
            )));
        }
        if current >= players.len() {
            return Err(GameError::InvalidSetup(format!(
                "current player index {current} out of range"
            )));
        }

        Ok(Self {
            board,
            players,
            current,
            status,
            observers: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observers.push(observer);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current
    }

    pub fn opponent_player(&self) -> &Player {
        &self.players[1 - self.current]
    }

    pub fn player_by_color(&self, color: DiskColor) -> Option<&Player> {
        self.players.iter().find(|player| player.color == color)
    }

    /// Places the four seed disks and hands the first turn to `players[0]`.
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.status != Status::NotStarted {
            return Err(GameError::AlreadyStarted);
        }

        let hi = self.board.size() / 2;
        let lo = hi - 1;
        let seeds = [
            (Position::new(lo, lo), DiskColor::White),
            (Position::new(lo, hi), DiskColor::Black),
            (Position::new(hi, lo), DiskColor::Black),
            (Position::new(hi, hi), DiskColor::White),
        ];
        for (pos, color) in seeds {
            self.cell_mut(pos)?.put(color);
        }

        self.current = 0;
        self.status = Status::InProgress;
        self.notify(GameEvent::Started {
            first: self.current_player().clone(),
        });
        Ok(())
    }

    /// Legal iff on the board, empty, and bracketing at least one opponent run.
    pub fn is_valid_move(&self, position: Position, color: DiskColor) -> bool {
        match self.board.cell(position) {
            Some(cell) if cell.is_empty() => DIRECTIONS
                .iter()
                .any(|&dir| !self.flip_run(position, dir, color).is_empty()),
            _ => false,
        }
    }

    /// Legal moves for `color` in row-major order.
    pub fn valid_moves(&self, color: DiskColor) -> Vec<Position> {
        self.board
            .positions()
            .filter(|&pos| self.is_valid_move(pos, color))
            .collect()
    }

    pub fn has_valid_move(&self, color: DiskColor) -> bool {
        self.board
            .positions()
            .any(|pos| self.is_valid_move(pos, color))
    }

    /// Places a disk for the current player, flips every bracketed run and
    /// passes the turn. Returns the flipped positions.
    ///
    /// Nothing is mutated unless the move is legal.
    pub fn make_move(&mut self, position: Position) -> Result<Vec<Position>, GameError> {
        self.ensure_in_progress()?;

        let mover = self.current_player().clone();
        let invalid = || GameError::InvalidMove {
            row: position.row as i32,
            col: position.col as i32,
        };
        if !self.board.cell(position).is_some_and(Cell::is_empty) {
            return Err(invalid());
        }

        let flipped: Vec<Position> = DIRECTIONS
            .iter()
            .flat_map(|&dir| self.flip_run(position, dir, mover.color))
            .collect();
        if flipped.is_empty() {
            return Err(invalid());
        }

        self.cell_mut(position)?.put(mover.color);
        for &pos in &flipped {
            self.cell_mut(pos)?
                .disk_mut()
                .ok_or_else(|| GameError::InternalFault(format!("no disk to flip at {pos}")))?
                .flip();
        }

        self.notify(GameEvent::MoveMade {
            player: mover,
            position,
            flipped: flipped.clone(),
        });
        self.switch_player();
        Ok(flipped)
    }

    pub fn switch_player(&mut self) {
        self.current = 1 - self.current;
        self.notify(GameEvent::TurnChanged {
            player: self.current_player().clone(),
        });
    }

    /// Skips stuck players and ends the game once neither side can move.
    pub fn resolve_turn(&mut self) -> Result<(), GameError> {
        for _ in 0..self.players.len() {
            if self.status != Status::InProgress || self.has_valid_move(self.current_player().color)
            {
                return Ok(());
            }
            if !self.has_valid_move(self.opponent_player().color) {
                return self.finish_game();
            }

            self.notify(GameEvent::TurnSkipped {
                player: self.current_player().clone(),
            });
            self.switch_player();
        }
        Ok(())
    }

    /// [`Game::make_move`] followed by [`Game::resolve_turn`].
    pub fn play(&mut self, position: Position) -> Result<Vec<Position>, GameError> {
        let flipped = self.make_move(position)?;
        self.resolve_turn()?;
        Ok(flipped)
    }

    /// Scores the board and moves the game to `Won` or `Drawn`.
    pub fn finish_game(&mut self) -> Result<(), GameError> {
        self.ensure_in_progress()?;

        let black_score = self.score(DiskColor::Black);
        let white_score = self.score(DiskColor::White);
        self.status = if black_score == white_score {
            Status::Drawn
        } else {
            Status::Won
        };

        self.notify(GameEvent::Finished {
            status: self.status,
            winner: self.winner().cloned(),
            black_score,
            white_score,
        });
        Ok(())
    }

    pub fn score(&self, color: DiskColor) -> usize {
        self.board.count(color)
    }

    /// The higher scorer, only once the game is `Won`.
    pub fn winner(&self) -> Option<&Player> {
        if self.status != Status::Won {
            return None;
        }

        match self.score(DiskColor::Black).cmp(&self.score(DiskColor::White)) {
            std::cmp::Ordering::Greater => self.player_by_color(DiskColor::Black),
            std::cmp::Ordering::Less => self.player_by_color(DiskColor::White),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn to_view(&self, game_id: &str) -> GameStateView {
        let current = self.current_player();
        let board: Vec<Vec<CellView>> = self
            .board
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| CellView {
                        row: cell.position().row,
                        column: cell.position().col,
                        disk_color: cell.disk().map(Disk::color),
                    })
                    .collect()
            })
            .collect();

        GameStateView {
            game_id: game_id.to_string(),
            current_player: current.name.clone(),
            current_player_color: current.color,
            status: self.status,
            board,
            valid_moves: self.valid_moves(current.color),
            black_score: self.score(DiskColor::Black),
            white_score: self.score(DiskColor::White),
            winner: self.winner().map(|player| player.name.clone()),
        }
    }

    /// Opponent disks between `from` (exclusive) and the next `color` disk
    /// along `dir`. Empty when the run is not bracketed.
    fn flip_run(&self, from: Position, dir: (i32, i32), color: DiskColor) -> Vec<Position> {
        let mut run = Vec::new();
        let mut next = self.board.step(from, dir);

        while let Some(pos) = next {
            match self.board.disk_at(pos) {
                Some(found) if found == color => return run,
                Some(_) => run.push(pos),
                None => break,
            }
            next = self.board.step(pos, dir);
        }

        Vec::new()
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        if self.status == Status::InProgress {
            Ok(())
        } else {
            Err(GameError::InactiveGame {
                status: self.status,
            })
        }
    }

    fn cell_mut(&mut self, pos: Position) -> Result<&mut Cell, GameError> {
        self.board
            .cell_mut(pos)
            .ok_or_else(|| GameError::InternalFault(format!("position {pos} is off the board")))
    }

    fn notify(&self, event: GameEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("board", &self.board)
            .field("players", &self.players)
            .field("current", &self.current)
            .field("status", &self.status)
            .field("observers", &self.observers.len())
            .finish()
    }
}

pub fn validate_board_size(size: u8) -> Result<(), GameError> {
    if size % 2 != 0 || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
        return Err(GameError::InvalidSetup(format!(
            "board size must be even and within {MIN_BOARD_SIZE}..={MAX_BOARD_SIZE}, got {size}"
        )));
    }
    Ok(())
}

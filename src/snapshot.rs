use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::{GameError, SnapshotError};
use crate::game::Game;
use crate::types::{DiskColor, Player, Status};

const MAGIC: &[u8; 4] = b"OTHS";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;

const CELL_EMPTY: u8 = 0;
const CELL_BLACK: u8 = 1;
const CELL_WHITE: u8 = 2;

/// Everything needed to rebuild a [`Game`], minus its observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub board_size: u8,
    /// Row-major, `board_size * board_size` entries.
    pub cells: Vec<Option<DiskColor>>,
    pub players: [Player; 2],
    /// Index into `players` of the side to move.
    pub current: usize,
    pub status: Status,
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board_size: self.board().size(),
            cells: self.board().to_colors(),
            players: self.players().clone(),
            current: self.current_index(),
            status: self.status(),
        }
    }

    /// Rebuilds a game. Observers are not restored.
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Result<Self, GameError> {
        let size = snapshot.board_size as usize;
        if snapshot.cells.len() != size * size {
            return Err(SnapshotError::Invalid(format!(
                "expected {} cells for a {size}x{size} board, got {}",
                size * size,
                snapshot.cells.len()
            ))
            .into());
        }

        let mut board = Board::new(snapshot.board_size);
        let positions: Vec<_> = board.positions().collect();
        for (pos, color) in positions.into_iter().zip(&snapshot.cells) {
            if let (Some(color), Some(cell)) = (color, board.cell_mut(pos)) {
                cell.put(*color);
            }
        }

        let mut game = Game::from_parts(
            board,
            snapshot.players.clone(),
            snapshot.current,
            snapshot.status,
        )?;
        game.check_restored_status()?;
        Ok(game)
    }

    /// A restored game must be playable or consistently finished.
    fn check_restored_status(&mut self) -> Result<(), GameError> {
        let black = self.score(DiskColor::Black);
        let white = self.score(DiskColor::White);
        let stuck =
            !self.has_valid_move(DiskColor::Black) && !self.has_valid_move(DiskColor::White);

        match self.status() {
            Status::NotStarted => {
                Err(SnapshotError::Invalid("game was never started".into()).into())
            }
            Status::InProgress => self.resolve_turn(),
            Status::Won | Status::Drawn if !stuck => Err(SnapshotError::Invalid(format!(
                "game is {} but legal moves remain",
                self.status()
            ))
            .into()),
            Status::Won if black == white => Err(SnapshotError::Invalid(format!(
                "game is won but scores are tied at {black}-{white}"
            ))
            .into()),
            Status::Drawn if black != white => Err(SnapshotError::Invalid(format!(
                "game is drawn but scores are {black}-{white}"
            ))
            .into()),
            Status::Won | Status::Drawn => Ok(()),
        }
    }
}

impl GameSnapshot {
    /// Compact binary form: a 20-byte header (magic, version, board size,
    /// CRC32 of the payload, reserved) followed by the payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let current = u8::try_from(self.current)
            .map_err(|_| SnapshotError::Invalid(format!("current index {}", self.current)))?;

        let mut payload = Vec::with_capacity(2 + self.cells.len() + 32);
        payload.push(status_to_byte(self.status));
        payload.push(current);
        payload.extend(self.cells.iter().map(|cell| match cell {
            None => CELL_EMPTY,
            Some(DiskColor::Black) => CELL_BLACK,
            Some(DiskColor::White) => CELL_WHITE,
        }));
        for player in &self.players {
            let name = player.name.as_bytes();
            let len = u16::try_from(name.len()).map_err(|_| {
                SnapshotError::Invalid(format!("player name is {} bytes long", name.len()))
            })?;
            payload.push(color_to_byte(player.color));
            payload.extend_from_slice(&len.to_le_bytes());
            payload.extend_from_slice(name);
        }

        let crc = crc32fast::hash(&payload);
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.board_size as u32).to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&payload);
        debug_assert_eq!(out.len(), HEADER_SIZE + payload.len());
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let version = read_u32_le(data, 4)?;
        if version != VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                expected: VERSION,
                actual: version,
            });
        }

        let board_size = u8::try_from(read_u32_le(data, 8)?)
            .map_err(|_| SnapshotError::Invalid("board size does not fit in a byte".into()))?;
        let expected_crc = read_u32_le(data, 12)?;
        let payload = &data[HEADER_SIZE..];

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(SnapshotError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        let mut reader = Reader { data: payload, offset: 0 };
        let status = byte_to_status(reader.byte("status")?)?;
        let current = reader.byte("current player")? as usize;

        let cell_count = board_size as usize * board_size as usize;
        let cells = reader
            .take(cell_count, "cells")?
            .iter()
            .map(|&byte| match byte {
                CELL_EMPTY => Ok(None),
                other => byte_to_color(other).map(Some),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut players = Vec::with_capacity(2);
        for _ in 0..2 {
            let color = byte_to_color(reader.byte("player color")?)?;
            let len_bytes = reader.take(2, "player name length")?;
            let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let name = std::str::from_utf8(reader.take(len, "player name")?)
                .map_err(|err| SnapshotError::Invalid(format!("player name: {err}")))?;
            players.push(Player::new(name, color));
        }

        if reader.offset != payload.len() {
            return Err(SnapshotError::TrailingBytes);
        }

        let players: [Player; 2] = players
            .try_into()
            .map_err(|_| SnapshotError::Invalid("expected two players".into()))?;

        Ok(GameSnapshot {
            board_size,
            cells,
            players,
            current,
            status,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], SnapshotError> {
        if self.offset + len > self.data.len() {
            return Err(SnapshotError::UnexpectedEof(what));
        }
        let out = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, SnapshotError> {
        Ok(self.take(1, what)?[0])
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, SnapshotError> {
    if offset + 4 > data.len() {
        return Err(SnapshotError::UnexpectedEof("u32"));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}

fn color_to_byte(color: DiskColor) -> u8 {
    match color {
        DiskColor::Black => CELL_BLACK,
        DiskColor::White => CELL_WHITE,
    }
}

fn byte_to_color(byte: u8) -> Result<DiskColor, SnapshotError> {
    match byte {
        CELL_BLACK => Ok(DiskColor::Black),
        CELL_WHITE => Ok(DiskColor::White),
        other => Err(SnapshotError::Invalid(format!("unknown color byte {other}"))),
    }
}

fn status_to_byte(status: Status) -> u8 {
    match status {
        Status::NotStarted => 0,
        Status::InProgress => 1,
        Status::Won => 2,
        Status::Drawn => 3,
    }
}

fn byte_to_status(byte: u8) -> Result<Status, SnapshotError> {
    match byte {
        0 => Ok(Status::NotStarted),
        1 => Ok(Status::InProgress),
        2 => Ok(Status::Won),
        3 => Ok(Status::Drawn),
        other => Err(SnapshotError::Invalid(format!("unknown status byte {other}"))),
    }
}

use std::fmt;

use crate::types::{DiskColor, Position};

/// Unit offsets `(d_row, d_col)` scanned when looking for flip runs.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disk {
    color: DiskColor,
    position: Position,
}

impl Disk {
    pub fn color(&self) -> DiskColor {
        self.color
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Turns the disk over in place.
    pub fn flip(&mut self) {
        self.color = self.color.opponent();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    position: Position,
    disk: Option<Disk>,
}

impl Cell {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn disk(&self) -> Option<&Disk> {
        self.disk.as_ref()
    }

    pub fn disk_mut(&mut self) -> Option<&mut Disk> {
        self.disk.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.disk.is_none()
    }

    /// Puts a new disk on this cell, replacing whatever was there.
    pub fn put(&mut self, color: DiskColor) {
        self.disk = Some(Disk {
            color,
            position: self.position,
        });
    }
}

/// Square grid of cells, row-major. Holds disks only; rules live in [`crate::game`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u8,
    cells: Vec<Cell>,
}

impl Board {
    /// Allocates `size * size` empty cells, each tagged with its own coordinate.
    pub fn new(size: u8) -> Self {
        let cells = (0..size)
            .flat_map(|row| (0..size).map(move |col| Position::new(row, col)))
            .map(|position| Cell {
                position,
                disk: None,
            })
            .collect();

        Self { size, cells }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn contains(&self, row: i32, col: i32) -> bool {
        let size = self.size as i32;
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|idx| &self.cells[idx])
    }

    pub fn cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index(pos).map(move |idx| &mut self.cells[idx])
    }

    pub fn disk_at(&self, pos: Position) -> Option<DiskColor> {
        self.cell(pos).and_then(Cell::disk).map(Disk::color)
    }

    /// Neighbour of `pos` one step along `direction`, or `None` off the board.
    pub fn step(&self, pos: Position, (d_row, d_col): (i32, i32)) -> Option<Position> {
        let row = pos.row as i32 + d_row;
        let col = pos.col as i32 + d_col;
        if self.contains(row, col) {
            Some(Position::new(row as u8, col as u8))
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells grouped by row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size.max(1) as usize)
    }

    /// All coordinates in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().map(Cell::position)
    }

    pub fn count(&self, color: DiskColor) -> usize {
        self.cells
            .iter()
            .filter_map(Cell::disk)
            .filter(|disk| disk.color() == color)
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// Row-major disk colors, `None` for empty squares.
    pub fn to_colors(&self) -> Vec<Option<DiskColor>> {
        self.cells
            .iter()
            .map(|cell| cell.disk().map(Disk::color))
            .collect()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < self.size && pos.col < self.size {
            Some(pos.row as usize * self.size as usize + pos.col as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                let symbol = match cell.disk().map(Disk::color) {
                    Some(DiskColor::Black) => 'X',
                    Some(DiskColor::White) => 'O',
                    None => '.',
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_empty_and_cells_know_their_coordinates() {
        let board = Board::new(8);

        assert_eq!(board.cells().len(), 64);
        assert_eq!(board.occupied_count(), 0);
        for (idx, cell) in board.cells().iter().enumerate() {
            assert!(cell.is_empty());
            assert_eq!(cell.position(), Position::new((idx / 8) as u8, (idx % 8) as u8));
        }
    }

    #[test]
    fn out_of_range_access_returns_none() {
        let mut board = Board::new(8);

        assert!(board.cell(Position::new(8, 0)).is_none());
        assert!(board.cell(Position::new(0, 8)).is_none());
        assert!(board.cell_mut(Position::new(200, 200)).is_none());
        assert_eq!(board.disk_at(Position::new(9, 9)), None);
    }

    #[test]
    fn step_stops_at_the_edges() {
        let board = Board::new(8);

        assert_eq!(board.step(Position::new(0, 0), (-1, 0)), None);
        assert_eq!(board.step(Position::new(0, 0), (0, -1)), None);
        assert_eq!(board.step(Position::new(7, 7), (1, 1)), None);
        assert_eq!(
            board.step(Position::new(3, 3), (-1, 1)),
            Some(Position::new(2, 4))
        );
    }

    #[test]
    fn put_and_flip_change_color_in_place() {
        let mut board = Board::new(8);
        let pos = Position::new(2, 5);

        board.cell_mut(pos).unwrap().put(DiskColor::White);
        assert_eq!(board.disk_at(pos), Some(DiskColor::White));
        assert_eq!(board.cell(pos).unwrap().disk().unwrap().position(), pos);

        board.cell_mut(pos).unwrap().disk_mut().unwrap().flip();
        assert_eq!(board.disk_at(pos), Some(DiskColor::Black));
        assert_eq!(board.count(DiskColor::Black), 1);
        assert_eq!(board.count(DiskColor::White), 0);
        assert_eq!(board.occupied_count(), 1);
    }

    #[test]
    fn display_renders_one_line_per_row() {
        let mut board = Board::new(4);
        board.cell_mut(Position::new(1, 1)).unwrap().put(DiskColor::Black);
        board.cell_mut(Position::new(2, 2)).unwrap().put(DiskColor::White);

        assert_eq!(board.to_string(), "....\n.X..\n..O.\n....\n");
    }
}

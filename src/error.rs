use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;

use crate::maze::Pos;

/// Load-time failures. A layout that produces one of these never reaches the search.
#[derive(Debug)]
pub enum LayoutError {
    Empty,
    MissingStart,
    MultipleStarts { first: Pos, second: Pos },
    Ragged { row: usize, expected: usize, found: usize },
    UnknownSymbol { symbol: char, x: usize, y: usize },
    Io(io::Error),
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "layout has no rows"),
            LayoutError::MissingStart => {
                write!(f, "no Pacman starting position (P) found in layout")
            }
            LayoutError::MultipleStarts { first, second } => write!(
                f,
                "more than one Pacman start: {} and {}",
                first, second
            ),
            LayoutError::Ragged { row, expected, found } => write!(
                f,
                "row {} has {} columns, expected {}",
                row, found, expected
            ),
            LayoutError::UnknownSymbol { symbol, x, y } => {
                write!(f, "unknown symbol {:?} at ({}, {})", symbol, x, y)
            }
            LayoutError::Io(err) => write!(f, "cannot read layout: {}", err),
        }
    }
}

impl Error for LayoutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LayoutError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LayoutError {
    fn from(err: io::Error) -> Self {
        LayoutError::Io(err)
    }
}

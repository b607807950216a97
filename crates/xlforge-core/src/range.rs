use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell coordinate, zero-based
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        CellCoord { row, col }
    }

    /// Parse A1 notation ("A1" -> (0, 0), "AA10" -> (9, 26))
    pub fn from_a1(notation: &str) -> Option<Self> {
        let notation = notation.trim();
        let split = notation
            .find(|c: char| c.is_ascii_digit())
            .filter(|&i| i > 0)?;
        let (letters, digits) = notation.split_at(split);

        let col = col_from_label(letters)?;
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }

        Some(CellCoord::new(row - 1, col))
    }

    /// Format as A1 notation
    pub fn to_a1(&self) -> String {
        format!("{}{}", col_to_label(self.col), self.row + 1)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Column label in bijective base-26: 0 -> "A", 25 -> "Z", 26 -> "AA"
pub fn col_to_label(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col;

    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }

    letters.iter().rev().map(|&b| b as char).collect()
}

/// Inverse of [`col_to_label`]. Case-insensitive.
pub fn col_from_label(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }

    let mut col: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }

    Some(col - 1)
}

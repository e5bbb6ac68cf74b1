//! A1-style cell addresses (`D17`) and ranges (`C18:I18`).
//!
//! Rows and columns are 1-based throughout. Column letters are bijective base-26: `A`..`Z` are the
//! digits 1..26, so `Z` = 26, `AA` = 27, `AZ` = 52, `BA` = 53.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TemplateError};

/// Largest column SpreadsheetML allows (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;
/// Largest row SpreadsheetML allows.
pub const MAX_ROW: u32 = 1_048_576;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    /// 1-based column number.
    pub col: u32,
    /// 1-based row number.
    pub row: u32,
}

impl CellAddress {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Parse a relative A1 reference such as `D17`.
    ///
    /// Letters must precede digits, both must be present, and the row must be positive.
    pub fn parse(reference: &str) -> Result<Self> {
        let malformed = || TemplateError::MalformedReference(reference.to_string());

        let split = reference
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(malformed)?;
        let (letters, digits) = reference.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let col = column_to_number(letters).map_err(|_| malformed())?;
        let row: u32 = digits.parse().map_err(|_| malformed())?;
        if row == 0 || row > MAX_ROW {
            return Err(malformed());
        }
        Ok(Self { col, row })
    }

    /// The same column on another row.
    pub fn with_row(self, row: u32) -> Self {
        Self { col: self.col, row }
    }

    pub fn column_label(&self) -> String {
        column_label(self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_label(self.col), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `A` -> 1, `Z` -> 26, `AA` -> 27. ASCII letters only, case-insensitive.
pub fn column_to_number(letters: &str) -> Result<u32> {
    let malformed = || TemplateError::MalformedReference(letters.to_string());
    if letters.is_empty() {
        return Err(malformed());
    }

    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(malformed());
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .filter(|c| *c <= MAX_COLUMN)
            .ok_or_else(malformed)?;
    }
    Ok(col)
}

/// Inverse of [`column_to_number`]. `col` must be at least 1.
pub fn column_label(col: u32) -> String {
    let mut n = col;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A rectangular range such as a merge span (`C18:I18`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self { start, end }
    }

    /// A single-row range spanning `first_col..=last_col`.
    pub fn on_row(row: u32, first_col: u32, last_col: u32) -> Self {
        Self {
            start: CellAddress::new(first_col, row),
            end: CellAddress::new(last_col, row),
        }
    }

    /// Parse `C18:I18`. A bare cell (`B3`) is accepted as a 1x1 range.
    pub fn parse(reference: &str) -> Result<Self> {
        match reference.split_once(':') {
            Some((start, end)) => Ok(Self {
                start: CellAddress::parse(start)?,
                end: CellAddress::parse(end)?,
            }),
            None => {
                let cell = CellAddress::parse(reference)?;
                Ok(Self {
                    start: cell,
                    end: cell,
                })
            }
        }
    }

    /// Number of rows covered minus one (`end.row - start.row`).
    pub fn row_extent(&self) -> u32 {
        self.end.row.saturating_sub(self.start.row)
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        let (r0, r1) = (self.start.row.min(self.end.row), self.start.row.max(self.end.row));
        let (c0, c1) = (self.start.col.min(self.end.col), self.start.col.max(self.end.col));
        (r0..=r1).contains(&cell.row) && (c0..=c1).contains(&cell.col)
    }

    /// Move both corners down by `delta` rows.
    pub fn offset_rows(self, delta: u32) -> Self {
        Self {
            start: self.start.with_row(self.start.row + delta),
            end: self.end.with_row(self.end.row + delta),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        let (r0, r1) = (self.start.row.min(self.end.row), self.start.row.max(self.end.row));
        let (c0, c1) = (self.start.col.min(self.end.col), self.start.col.max(self.end.col));
        (r0..=r1).flat_map(move |row| (c0..=c1).map(move |col| CellAddress::new(col, row)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

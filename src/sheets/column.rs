use std::fmt;
use std::str::FromStr;

use crate::error::CogError;

/// A spreadsheet column, stored as a zero based index and shown as letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(usize);

impl Column {
    pub const A: Column = Column(0);

    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn prev(self) -> Result<Self, CogError> {
        self.offset(-1)
    }

    pub fn offset(self, by: isize) -> Result<Self, CogError> {
        self.0
            .checked_add_signed(by)
            .map(Self)
            .ok_or_else(|| {
                CogError::SheetParsing(format!("column {self} offset by {by} is before A"))
            })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&index_to_column(self.0))
    }
}

impl FromStr for Column {
    type Err = CogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        column_to_index(s).map(Self)
    }
}

/// Letters to zero based index: `A` is 0, `AA` is 26.
pub fn column_to_index(letters: &str) -> Result<usize, CogError> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CogError::SheetParsing(format!("`{letters}` is not a column")));
    }

    Ok(letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0, |acc, b| acc * 26 + usize::from(b - b'A' + 1))
        - 1)
}

// remainders are below 26 so the cast cannot truncate
#[allow(clippy::cast_possible_truncation)]
pub fn index_to_column(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_roundtrip_edges() {
        assert_eq!(column_to_index("A").unwrap(), 0);
        assert_eq!(column_to_index("z").unwrap(), 25);
        assert_eq!(column_to_index("AA").unwrap(), 26);
        assert_eq!(column_to_index("BA").unwrap(), 52);
        assert_eq!(index_to_column(25), "Z");
        assert_eq!(index_to_column(26), "AA");
        assert_eq!(index_to_column(701), "ZZ");
        assert_eq!(index_to_column(702), "AAA");
    }

    #[test]
    fn rejects_garbage() {
        assert!(column_to_index("").is_err());
        assert!(column_to_index("A1").is_err());
    }

    #[test]
    fn stepping() {
        let z: Column = "Z".parse().unwrap();
        assert_eq!(z.next().to_string(), "AA");
        assert_eq!(z.next().prev().unwrap(), z);
        assert_eq!(z.offset(-25).unwrap(), Column::A);
        assert_eq!(Column::A.offset(3).unwrap().to_string(), "D");
        assert!(Column::A.prev().is_err());
    }
}

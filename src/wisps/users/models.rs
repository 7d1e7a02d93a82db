use std::fmt;

use crate::sheets::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum SheetKind {
    Cattle,
    Undermine,
}

impl SheetKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Cattle => "cattle",
            Self::Undermine => "undermine",
        }
    }

    /// Where the names start when the sheet has none yet.
    pub fn default_anchor(self) -> (Column, i64) {
        match self {
            Self::Cattle => (Column::from_index(1), 11),
            Self::Undermine => (Column::from_index(1), 14),
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cattle => "Cattle",
            Self::Undermine => "Undermine",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Faction {
    #[default]
    Hudson,
    Winters,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hudson => "Hudson",
            Self::Winters => "Winters",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DiscordUser {
    pub id: String,
    pub display_name: String,
    pub pref_name: String,
    pub pref_cry: String,
    pub faction: Faction,
}

/// A name row on one of the sheets.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SheetUser {
    pub id: i64,
    pub kind: SheetKind,
    pub faction: Faction,
    pub name: String,
    pub cry: String,
    pub sheet_row: i64,
}

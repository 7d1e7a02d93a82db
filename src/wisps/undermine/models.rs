use std::fmt;

use crate::{error::CogError, sheets::Column};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum UmKind {
    Control,
    Expansion,
    Opposition,
}

impl UmKind {
    /// Sheet titles: `Exp...` is an expansion we back, any other title an
    /// expansion we oppose, and no title an enemy control system.
    pub fn from_title(title: &str) -> Self {
        if title.starts_with("Exp") {
            Self::Expansion
        } else if title.is_empty() {
            Self::Control
        } else {
            Self::Opposition
        }
    }
}

impl fmt::Display for UmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Control => "Control",
            Self::Expansion => "Expansion",
            Self::Opposition => "Opposition",
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UmSystem {
    pub id: i64,
    pub name: String,
    pub kind: UmKind,
    pub sheet_col: String,
    pub goal: i64,
    pub security: String,
    pub notes: String,
    pub close_control: String,
    pub progress_us: i64,
    pub progress_them: f64,
    pub map_offset: i64,
    /// Sum of held and redeemed merits, filled in by the query.
    pub cmdr_merits: i64,
}

impl UmSystem {
    pub fn missing(&self) -> i64 {
        self.goal - (self.cmdr_merits + self.map_offset).max(self.progress_us)
    }

    /// Expansions run until the tick, only control systems can finish early.
    pub fn is_undermined(&self) -> bool {
        self.kind == UmKind::Control && self.missing() <= 0
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn completion(&self) -> String {
        let pct = if self.goal == 0 {
            0.0
        } else {
            (self.goal - self.missing()) as f64 / self.goal as f64 * 100.0
        };

        match self.kind {
            UmKind::Control => format!("{pct:.0}%"),
            UmKind::Expansion | UmKind::Opposition => {
                let lead = pct - 100.0;
                let prefix = if lead >= 0.0 { "leading by" } else { "behind by" };
                format!("{prefix} {:.0}%", lead.abs())
            }
        }
    }

    pub fn column(&self) -> Result<Column, CogError> {
        self.sheet_col.parse()
    }

    /// Apply `us[:them]` as typed by a user.
    pub fn set_status(&mut self, status: &str) -> Result<(), CogError> {
        let bad = || {
            CogError::invalid_args(format!("Status `{status}` should look like `us:them`."))
        };
        let mut parts = status.split(':');

        let us = parts.next().ok_or_else(bad)?.trim().parse().map_err(|_| bad())?;
        let them = match parts.next() {
            Some(them) => Some(them.trim().parse::<f64>().map_err(|_| bad())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(bad());
        }

        self.progress_us = us;
        if let Some(them) = them {
            self.progress_them = them;
        }
        Ok(())
    }

    pub fn display(&self) -> String {
        let mut lines = vec![
            format!("{}: **{}**", self.kind, self.name),
            format!(
                "    Completion: {}, Missing: {}",
                self.completion(),
                self.missing()
            ),
            format!(
                "    Security: {}, Close Control: {}",
                self.security, self.close_control
            ),
        ];
        if !self.notes.is_empty() {
            lines.push(format!("    Notes: {}", self.notes));
        }
        lines.join("\n")
    }
}

/// One user's merits in one system, with what is needed to sync it back.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Hold {
    pub system: String,
    pub sheet_col: String,
    pub user: String,
    pub sheet_row: i64,
    pub held: i64,
    pub redeemed: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn um_system(
        name: &str,
        kind: UmKind,
        goal: i64,
        progress_us: i64,
        cmdr_merits: i64,
    ) -> UmSystem {
        UmSystem {
            id: 0,
            name: name.to_owned(),
            kind,
            sheet_col: "D".to_owned(),
            goal,
            security: "Medium".to_owned(),
            notes: String::new(),
            close_control: "Sol".to_owned(),
            progress_us,
            progress_them: 0.0,
            map_offset: 0,
            cmdr_merits,
        }
    }
}

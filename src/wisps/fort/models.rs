use crate::{error::CogError, sheets::Column, tbl};

/// Systems this close to their trigger are left for last.
pub const DEFER_MISSING: i64 = 650;

/// Always fortified alongside the current target.
pub const OTHIME: &str = "Othime";

/// A friendly control system on the fortification sheet.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct System {
    pub id: i64,
    pub name: String,
    pub cmdr_merits: i64,
    pub fort_status: i64,
    #[sqlx(rename = "fort_trigger")]
    pub trigger: i64,
    pub um_status: i64,
    pub undermine: f64,
    pub distance: f64,
    pub notes: String,
    pub sheet_col: String,
    pub sheet_order: i64,
}

impl System {
    pub fn current_status(&self) -> i64 {
        self.fort_status.max(self.cmdr_merits)
    }

    pub fn skip(&self) -> bool {
        let notes = self.notes.to_lowercase();
        notes.contains("leave") || notes.contains("skip")
    }

    pub fn is_fortified(&self) -> bool {
        self.current_status() >= self.trigger
    }

    pub fn is_undermined(&self) -> bool {
        self.undermine >= 1.0
    }

    pub fn missing(&self) -> i64 {
        (self.trigger - self.current_status()).max(0)
    }

    pub fn is_deferred(&self) -> bool {
        let missing = self.missing();
        !self.skip() && missing > 0 && missing <= DEFER_MISSING
    }

    /// Still needs supplies and should be worked on now.
    pub fn is_target(&self) -> bool {
        !self.is_fortified() && !self.skip() && !self.is_deferred()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn completion(&self) -> String {
        let pct = if self.trigger == 0 {
            0.0
        } else {
            self.current_status() as f64 / self.trigger as f64 * 100.0
        };
        format!("{pct:.1}")
    }

    pub fn ump(&self) -> String {
        format!("{:.1}", self.undermine * 100.0)
    }

    pub fn column(&self) -> Result<Column, CogError> {
        self.sheet_col.parse()
    }

    /// Apply `fort[:um]` as typed by a user.
    pub fn set_status(&mut self, status: &str) -> Result<(), CogError> {
        let mut parts = status.split(':');
        let bad = || {
            CogError::invalid_args(format!("Status `{status}` should look like `fort:um`."))
        };

        let fort = parts.next().ok_or_else(bad)?.trim().parse().map_err(|_| bad())?;
        let um = match parts.next() {
            Some(um) => Some(um.trim().parse().map_err(|_| bad())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(bad());
        }

        self.fort_status = fort;
        if let Some(um) = um {
            self.um_status = um;
        }
        Ok(())
    }

    pub fn display(&self) -> String {
        let mut msg = format!(
            "**{}** {:>4}/{} :Fortif{}:",
            self.name,
            self.current_status(),
            self.trigger,
            if self.is_fortified() { "ied" } else { "ying" }
        );
        if !self.is_fortified() {
            msg.push_str(&format!(" ({} left)", self.missing()));
        }
        if !self.notes.is_empty() {
            msg.push(' ');
            msg.push_str(&self.notes);
        }
        msg
    }

    pub fn display_details(&self) -> String {
        let lines = vec![
            vec!["Completion".to_owned(), format!("{}%", self.completion())],
            vec![
                "CMDR Merits".to_owned(),
                format!("{}/{}", self.cmdr_merits, self.trigger),
            ],
            vec![
                "Fort Status".to_owned(),
                format!("{}/{}", self.fort_status, self.trigger),
            ],
            vec![
                "UM Status".to_owned(),
                format!("{} ({}%)", self.um_status, self.ump()),
            ],
            vec!["Notes".to_owned(), self.notes.clone()],
        ];
        format!(
            "**{}**\n{}",
            self.name,
            tbl::wrap_markdown(&tbl::format_table(&lines, " | ", false, false))
        )
    }
}

/// A contribution row joined with the names needed to show or sync it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Merit {
    pub system: String,
    pub sheet_col: String,
    pub user: String,
    pub sheet_row: i64,
    pub amount: i64,
}

/// Systems grouped the way the summary table shows them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SystemStates {
    pub cancelled: Vec<String>,
    pub fortified: Vec<String>,
    pub undermined: Vec<String>,
    pub skipped: Vec<String>,
    pub left: Vec<String>,
}

impl SystemStates {
    pub fn from_systems(systems: &[System]) -> Self {
        let mut states = Self::default();
        for system in systems {
            let name = system.name.clone();
            match (system.is_fortified(), system.is_undermined()) {
                (true, true) => states.cancelled.push(name.clone()),
                (true, false) => states.fortified.push(name.clone()),
                (false, true) => states.undermined.push(name.clone()),
                (false, false) => states.left.push(name.clone()),
            }
            // counted on top of the state above
            if system.skip() {
                states.skipped.push(name);
            }
        }
        states
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn system(
        name: &str,
        trigger: i64,
        fort_status: i64,
        cmdr_merits: i64,
        notes: &str,
    ) -> System {
        System {
            id: 0,
            name: name.to_owned(),
            cmdr_merits,
            fort_status,
            trigger,
            um_status: 0,
            undermine: 0.0,
            distance: 0.0,
            notes: notes.to_owned(),
            sheet_col: "F".to_owned(),
            sheet_order: 1,
        }
    }
}

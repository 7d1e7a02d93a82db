//! Layout of the undermining sheet.
//!
//! Systems start in column D and take two columns each. The main column holds
//! the title, goal, security, closest control, name, progress and map offset;
//! the secondary column holds notes. Below, each commander row has held merits
//! in the main column and redeemed merits in the secondary one.

use color_eyre::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::{SheetRow, Write};
use crate::{
    sheets::{
        cell::{cell_str, is_blank, parse_float, parse_int},
        Column, Dim, GSheet,
    },
    wisps::{
        undermine,
        undermine::models::{UmKind, UmSystem},
        users::models::SheetKind,
    },
};

const FIRST_SYSTEM: Column = Column::from_index(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedHold {
    pub system: String,
    pub user: String,
    pub held: i64,
    pub redeemed: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UmScan {
    pub systems: Vec<UmSystem>,
    pub users: Vec<SheetRow>,
    pub holds: Vec<ScannedHold>,
}

fn parse_system(main: &[Value], sec: &[Value], col: Column) -> Option<UmSystem> {
    let name = cell_str(main.get(8));
    if name.is_empty() || name.to_lowercase().contains("template") {
        return None;
    }

    let security = cell_str(main.get(6));
    Some(UmSystem {
        id: 0,
        name,
        kind: UmKind::from_title(&cell_str(main.first())),
        sheet_col: col.to_string(),
        goal: parse_int(main.get(3)),
        security: security.trim_start_matches("Sec: ").to_owned(),
        notes: cell_str(sec.get(6)),
        close_control: cell_str(main.get(7)),
        progress_us: parse_int(main.get(9)),
        progress_them: parse_float(main.get(10)),
        map_offset: parse_int(main.get(12)),
        cmdr_merits: 0,
    })
}

pub fn parse_systems(cells: &[Vec<Value>]) -> Vec<UmSystem> {
    let mut found = vec![];
    let mut col = FIRST_SYSTEM;
    while let Some(main) = cells.get(col.index()) {
        let sec = cells.get(col.index() + 1).map(Vec::as_slice).unwrap_or_default();
        let Some(system) = parse_system(main, sec, col) else { break };
        found.push(system);
        col = Column::from_index(col.index() + 2);
    }
    found
}

pub fn parse_holds(
    cells: &[Vec<Value>],
    systems: &[UmSystem],
    users: &[SheetRow],
) -> Vec<ScannedHold> {
    let mut found = vec![];
    for system in systems {
        let Ok(col) = system.column() else { continue };
        let main = cells.get(col.index()).map(Vec::as_slice).unwrap_or_default();
        let sec = cells.get(col.index() + 1).map(Vec::as_slice).unwrap_or_default();

        for user in users {
            let Ok(row) = usize::try_from(user.row - 1) else { continue };
            let (held, redeemed) = (main.get(row), sec.get(row));
            if is_blank(held) && is_blank(redeemed) {
                continue;
            }
            found.push(ScannedHold {
                system: system.name.clone(),
                user: user.name.clone(),
                held: parse_int(held),
                redeemed: parse_int(redeemed),
            });
        }
    }
    found
}

pub fn parse(cells: &[Vec<Value>]) -> UmScan {
    let (user_col, first_row) = SheetKind::Undermine.default_anchor();
    let systems = parse_systems(cells);
    let users = super::fort::parse_users(cells, user_col, first_row);
    let holds = parse_holds(cells, &systems, &users);

    UmScan {
        systems,
        users,
        holds,
    }
}

#[instrument(skip_all, fields(page = %sheet.page))]
pub async fn scan(sheet: &GSheet, db: &SqlitePool) -> Result<()> {
    let cells = sheet.whole_sheet().await?;
    let scan = parse(&cells);

    info!(
        "Undermining sheet: {} systems, {} users, {} holds",
        scan.systems.len(),
        scan.users.len(),
        scan.holds.len()
    );
    undermine::db::replace_sheet(db, &scan).await
}

/// Held and redeemed cells on a commander's row.
pub fn hold_write(col: Column, row: i64, held: i64, redeemed: i64) -> Write {
    let next = col.next();
    Write {
        range: format!("!{col}{row}:{next}{row}"),
        values: vec![vec![held.into(), redeemed.into()]],
        dim: Dim::Rows,
    }
}

/// Progress and map offset cells of a system column.
pub fn system_writes(
    col: Column,
    progress_us: i64,
    progress_them: f64,
    map_offset: i64,
) -> Vec<Write> {
    vec![
        Write {
            range: format!("!{col}10:{col}11"),
            values: vec![vec![progress_us.into(), progress_them.into()]],
            dim: Dim::Columns,
        },
        Write {
            range: format!("!{col}13:{col}13"),
            values: vec![vec![map_offset.into()]],
            dim: Dim::Columns,
        },
    ]
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn cells() -> Vec<Vec<Value>> {
        serde_json::from_value(json!([
            ["", "", "", "", "", "", "", "", "", "", "", "", "", "Burn it all", "For Hudson"],
            ["", "", "", "", "", "", "", "", "", "", "", "", "CMDR Name", "Alice", "Bob"],
            [],
            [
                "", "", "", 10000, "", "", "Sec: Medium", "Sol", "Burr", 4000, 12.5, "", 0, 500, ""
            ],
            ["", "", "", "", "", "", "Hold until Wednesday", "", "", "", "", "", "", 1000, 200],
            [
                "Expansion", "", "", 1000, "", "", "Sec: Low", "LHS 142", "Muncheim", 1500, 20, "",
                50
            ],
            [],
            ["", "", "", 0, "", "", "", "", "Template"],
        ]))
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::cells;
    use super::*;

    #[test]
    fn systems_until_template() {
        let systems = parse_systems(&cells());
        assert_eq!(systems.len(), 2);

        let burr = &systems[0];
        assert_eq!(burr.kind, UmKind::Control);
        assert_eq!(burr.sheet_col, "D");
        assert_eq!(burr.goal, 10000);
        assert_eq!(burr.security, "Medium");
        assert_eq!(burr.notes, "Hold until Wednesday");
        assert_eq!(burr.close_control, "Sol");
        assert_eq!(burr.progress_us, 4000);
        assert!((burr.progress_them - 12.5).abs() < f64::EPSILON);

        let muncheim = &systems[1];
        assert_eq!(muncheim.kind, UmKind::Expansion);
        assert_eq!(muncheim.sheet_col, "F");
        assert_eq!(muncheim.map_offset, 50);
        assert_eq!(muncheim.notes, "");
    }

    #[test]
    fn holds_skip_empty_rows() {
        let scan = parse(&cells());
        assert_eq!(scan.users.len(), 2);
        assert_eq!(scan.users[0].cry, "Burn it all");
        assert_eq!(
            scan.holds,
            vec![
                ScannedHold {
                    system: "Burr".to_owned(),
                    user: "Alice".to_owned(),
                    held: 500,
                    redeemed: 1000,
                },
                ScannedHold {
                    system: "Burr".to_owned(),
                    user: "Bob".to_owned(),
                    held: 0,
                    redeemed: 200,
                },
            ]
        );
    }

    #[test]
    fn write_ranges() {
        let col: Column = "Z".parse().unwrap();
        let write = hold_write(col, 14, 500, 1000);
        assert_eq!(write.range, "!Z14:AA14");
        assert_eq!(write.values, vec![vec![json!(500), json!(1000)]]);

        let writes = system_writes("D".parse().unwrap(), 4000, 12.5, 50);
        assert_eq!(writes[0].range, "!D10:D11");
        assert_eq!(writes[1].range, "!D13:D13");
        assert_eq!(writes[1].values, vec![vec![json!(50)]]);
    }
}

//! Layout of the fortification ("cattle") sheet.
//!
//! Rows 1 to 10 of each system column hold, in order: undermine fraction,
//! completion, trigger, missing, commander merits, fort status, undermine
//! status, distance, notes and the system name. The commander names start on
//! the row after the `CMDR Name` header and every system column holds the
//! supplies each commander delivered there.

use color_eyre::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::{SheetRow, Write};
use crate::{
    error::CogError,
    sheets::{
        cell::{cell_str, is_blank, parse_float, parse_int},
        Column, Dim, GSheet,
    },
    wisps::{fort, fort::models::System},
};

const USER_ANCHOR: &str = "CMDR Name";
const SYSTEM_COLOR: [f64; 3] = [0.427_450_98, 0.619_607_87, 0.921_568_63];
const FORMAT_RANGE: &str = "!A10:J10";

/// Supplies delivered by one commander to one system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedMerit {
    pub system: String,
    pub user: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FortScan {
    pub systems: Vec<System>,
    pub users: Vec<SheetRow>,
    pub merits: Vec<ScannedMerit>,
    pub user_col: Column,
    pub first_row: i64,
}

/// The first system column is the first cell on row 10 with the system
/// background colour.
pub fn find_system_column(formatted: &Value) -> Result<Column, CogError> {
    let values = formatted
        .pointer("/sheets/0/data/0/rowData/0/values")
        .and_then(Value::as_array)
        .ok_or_else(|| CogError::SheetParsing("no formatted cells returned".to_owned()))?;

    values
        .iter()
        .position(|cell| {
            let bg = &cell["effectiveFormat"]["backgroundColor"];
            ["red", "green", "blue"]
                .iter()
                .zip(SYSTEM_COLOR)
                .all(|(channel, want)| {
                    bg[channel]
                        .as_f64()
                        .map_or(false, |have| (have - want).abs() < 1e-6)
                })
        })
        .map(Column::from_index)
        .ok_or_else(|| CogError::SheetParsing("could not find the first system column".to_owned()))
}

/// Column of the commander names and the first (1 based) row holding one.
#[allow(clippy::cast_possible_wrap)]
pub fn find_user_anchor(cells: &[Vec<Value>]) -> Result<(Column, i64), CogError> {
    for (col, column) in cells.iter().enumerate() {
        if let Some(row) = column
            .iter()
            .position(|cell| cell.as_str().map(str::trim) == Some(USER_ANCHOR))
        {
            return Ok((Column::from_index(col), row as i64 + 2));
        }
    }

    Err(CogError::SheetParsing(format!("could not find `{USER_ANCHOR}`")))
}

#[allow(clippy::cast_possible_wrap)]
pub fn parse_systems(cells: &[Vec<Value>], first: Column) -> Vec<System> {
    cells
        .iter()
        .skip(first.index())
        .enumerate()
        .map_while(|(order, lines)| {
            let name = cell_str(lines.get(9));
            if name.is_empty() {
                return None;
            }

            Some(System {
                id: 0,
                name,
                undermine: parse_float(lines.get(0)),
                trigger: parse_int(lines.get(2)),
                cmdr_merits: parse_int(lines.get(4)),
                fort_status: parse_int(lines.get(5)),
                um_status: parse_int(lines.get(6)),
                distance: parse_float(lines.get(7)),
                notes: cell_str(lines.get(8)),
                sheet_col: Column::from_index(first.index() + order).to_string(),
                sheet_order: order as i64 + 1,
            })
        })
        .collect()
}

/// Names in `col` from `first_row` down, battle cries one column to the left.
#[allow(clippy::cast_possible_wrap)]
pub fn parse_users(cells: &[Vec<Value>], col: Column, first_row: i64) -> Vec<SheetRow> {
    let names = cells.get(col.index()).map(Vec::as_slice).unwrap_or_default();
    let cries = col
        .prev()
        .ok()
        .and_then(|c| cells.get(c.index()))
        .map(Vec::as_slice)
        .unwrap_or_default();

    let start = usize::try_from(first_row - 1).unwrap_or(0);
    names
        .iter()
        .enumerate()
        .skip(start)
        .filter(|(_, cell)| !is_blank(Some(cell)))
        .map(|(i, cell)| SheetRow {
            name: cell_str(Some(cell)),
            cry: cell_str(cries.get(i)),
            row: i as i64 + 1,
        })
        .collect()
}

pub fn parse_merits(
    cells: &[Vec<Value>],
    systems: &[System],
    users: &[SheetRow],
) -> Vec<ScannedMerit> {
    let mut found = vec![];
    for system in systems {
        let Ok(col) = system.column() else { continue };
        let Some(column) = cells.get(col.index()) else { continue };

        for user in users {
            let Some(cell) = usize::try_from(user.row - 1).ok().and_then(|i| column.get(i)) else {
                continue;
            };
            if is_blank(Some(cell)) {
                continue;
            }
            found.push(ScannedMerit {
                system: system.name.clone(),
                user: user.name.clone(),
                amount: parse_int(Some(cell)),
            });
        }
    }
    found
}

pub fn parse(cells: &[Vec<Value>], formatted: &Value) -> Result<FortScan, CogError> {
    let first = find_system_column(formatted)?;
    let (user_col, first_row) = find_user_anchor(cells)?;
    let systems = parse_systems(cells, first);
    let users = parse_users(cells, user_col, first_row);
    let merits = parse_merits(cells, &systems, &users);

    Ok(FortScan {
        systems,
        users,
        merits,
        user_col,
        first_row,
    })
}

#[instrument(skip_all, fields(page = %sheet.page))]
pub async fn scan(sheet: &GSheet, db: &SqlitePool) -> Result<()> {
    let cells = sheet.whole_sheet().await?;
    let formatted = sheet.get_with_formatting(FORMAT_RANGE).await?;
    let scan = parse(&cells, &formatted)?;

    info!(
        "Fort sheet: {} systems, {} users, {} merits",
        scan.systems.len(),
        scan.users.len(),
        scan.merits.len()
    );
    fort::db::replace_sheet(db, &scan).await
}

/// The amount a commander delivered to a system.
pub fn drop_write(col: Column, row: i64, amount: i64) -> Write {
    Write {
        range: format!("!{col}{row}:{col}{row}"),
        values: vec![vec![amount.into()]],
        dim: Dim::Rows,
    }
}

/// Fort and undermine status cells of a system column.
pub fn system_write(col: Column, fort_status: i64, um_status: i64) -> Write {
    Write {
        range: format!("!{col}6:{col}7"),
        values: vec![vec![fort_status.into(), um_status.into()]],
        dim: Dim::Columns,
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::{cells, formatted};
    use super::*;

    #[test]
    fn system_column_by_colour() {
        assert_eq!(find_system_column(&formatted()).unwrap().to_string(), "F");
        assert!(find_system_column(&json!({})).is_err());
    }

    #[test]
    fn user_anchor() {
        let (col, row) = find_user_anchor(&cells()).unwrap();
        assert_eq!((col.to_string().as_str(), row), ("B", 11));
        assert!(find_user_anchor(&[vec![json!("nothing")]]).is_err());
    }

    #[test]
    fn systems_in_sheet_order() {
        let systems = parse_systems(&cells(), "F".parse().unwrap());
        let names: Vec<_> = systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Frey", "Nurundere", "LHS 3749", "Sol", "Dongkum", "Alpha Fornacis", "Othime"]
        );

        let frey = &systems[0];
        assert_eq!(frey.sheet_col, "F");
        assert_eq!(frey.sheet_order, 1);
        assert_eq!((frey.trigger, frey.cmdr_merits, frey.fort_status), (4910, 4322, 4910));
        assert!((frey.distance - 116.99).abs() < 1e-9);

        let sol = &systems[3];
        assert_eq!(sol.notes, "Leave For Grinders");
        assert_eq!(sol.sheet_col, "I");

        let othime = &systems[6];
        assert_eq!(othime.fort_status, 1095);
        assert_eq!(othime.sheet_order, 7);
    }

    #[test]
    fn users_with_cries() {
        let users = parse_users(&cells(), "B".parse().unwrap(), 11);
        assert_eq!(users.len(), 15);
        assert_eq!(
            users[0],
            SheetRow {
                name: "Alexander Astropath".to_owned(),
                cry: "FHS Gloria holding the line".to_owned(),
                row: 11,
            }
        );
        assert_eq!(users[1].cry, "");
        assert_eq!(users[6].name, "Grimbald");
        assert_eq!(users[6].cry, "The Grim");
        assert_eq!(users[14].row, 25);
    }

    #[test]
    fn merits_from_grid() {
        let scan = parse(&cells(), &formatted()).unwrap();
        assert_eq!(
            scan.merits[0],
            ScannedMerit {
                system: "Frey".to_owned(),
                user: "Toliman".to_owned(),
                amount: 2222,
            }
        );
        assert_eq!(scan.merits.len(), 13);
        assert!(scan
            .merits
            .iter()
            .any(|m| m.system == "Sol" && m.user == "Rumrunner" && m.amount == 400));
    }

    #[test]
    fn write_ranges() {
        let col: Column = "F".parse().unwrap();
        assert_eq!(drop_write(col, 12, 2222).range, "!F12:F12");

        let write = system_write(col, 4910, 300);
        assert_eq!(write.range, "!F6:F7");
        assert_eq!(write.dim, Dim::Columns);
        assert_eq!(write.values, vec![vec![json!(4910), json!(300)]]);
    }
}

use color_eyre::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::{
    sheets::{
        cell::{cell_str, parse_int},
        Dim, GSheet,
    },
    wisps::{kos, kos::models::KosEntry},
};

/// Rows of `cmdr, faction, danger, friendly`; only `FRIENDLY` marks a friend.
pub fn parse(rows: &[Vec<Value>]) -> Vec<KosEntry> {
    rows.iter()
        .filter_map(|row| {
            let cmdr = cell_str(row.first());
            if cmdr.is_empty() {
                return None;
            }
            Some(KosEntry {
                cmdr,
                faction: cell_str(row.get(1)),
                danger: parse_int(row.get(2)),
                friendly: cell_str(row.get(3)).eq_ignore_ascii_case("friendly"),
            })
        })
        .collect()
}

#[instrument(skip_all, fields(page = %sheet.page))]
pub async fn scan(sheet: &GSheet, db: &SqlitePool) -> Result<()> {
    let rows = sheet.get("!A2:D", Dim::Rows).await?;
    let entries = parse(&rows);
    info!("KOS sheet: {} commanders", entries.len());
    kos::db::replace_all(db, &entries).await
}

/// Append a report for moderators to review.
pub async fn report(sheet: &GSheet, reporter: &str, cmdr: &str, reason: &str) -> Result<()> {
    sheet
        .append(
            "!A:C",
            vec![vec![reporter.into(), cmdr.into(), reason.into()]],
        )
        .await
}

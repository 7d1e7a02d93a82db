//! Sheet layouts and the registry of sheets the bot mirrors.
//!
//! Each sheet sits behind its own lock. A scan holds the write side while it
//! replaces the mirrored tables, so commands reading those tables take the
//! read side and simply wait for a running scan to finish.

pub mod fort;
pub mod kos;
pub mod um;

use std::sync::Arc;

use color_eyre::Result;
use sqlx::SqlitePool;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{error, info, instrument};

use crate::{
    config, db,
    error::CogError,
    sheets::{self, Credentials, Dim, GSheet, Grid, SheetsClient},
    wisps::users::models::SheetKind,
};

/// A commander name row as read off a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub name: String,
    pub cry: String,
    pub row: i64,
}

/// A pending change to a block of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub range: String,
    pub values: Grid,
    pub dim: Dim,
}

/// Name and cry cells of a commander row.
pub fn user_write(
    name_col: sheets::Column,
    row: i64,
    cry: &str,
    name: &str,
) -> Result<Write, CogError> {
    let cry_col = name_col.prev()?;
    Ok(Write {
        range: format!("!{cry_col}{row}:{name_col}{row}"),
        values: vec![vec![cry.into(), name.into()]],
        dim: Dim::Rows,
    })
}

/// Send writes with as few requests as possible.
pub async fn apply(sheet: &GSheet, writes: Vec<Write>) -> Result<()> {
    if let [write] = writes.as_slice() {
        return sheet
            .update(&write.range, write.values.clone(), write.dim)
            .await;
    }

    for dim in [Dim::Rows, Dim::Columns] {
        let (ranges, values): (Vec<&str>, Vec<Grid>) = writes
            .iter()
            .filter(|w| w.dim == dim)
            .map(|w| (w.range.as_str(), w.values.clone()))
            .unzip();
        if !ranges.is_empty() {
            sheet.batch_update(&ranges, values, dim).await?;
        }
    }
    Ok(())
}

fn page_key(kind: SheetKind) -> String {
    format!("{}.page", kind.key())
}

/// The page following `page`, which must already exist in the spreadsheet.
pub fn next_page(kind: SheetKind, page: &str, titles: &[String]) -> Result<String, CogError> {
    let next = sheets::number_increment(page)?;
    if !titles.contains(&next) {
        return Err(CogError::invalid_args(format!(
            "The {} sheet has no page named `{next}` yet.",
            kind.key()
        )));
    }
    Ok(next)
}

pub struct Sheets {
    pub fort: RwLock<GSheet>,
    pub um: RwLock<GSheet>,
    pub kos: RwLock<GSheet>,
    pub kos_reports: GSheet,
}

impl Sheets {
    /// Build from the environment; pages saved by a cycle win over it.
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        let creds = Credentials::load(&config::sheets_credentials()).await?;
        let client = Arc::new(SheetsClient::new(creds));

        let cattle = config::sheet("CATTLE")?;
        let undermine = config::sheet("UM")?;
        let kos = config::sheet("KOS")?;

        let cattle_page = db::get_setting(db, &page_key(SheetKind::Cattle))
            .await?
            .unwrap_or(cattle.page);
        let um_page = db::get_setting(db, &page_key(SheetKind::Undermine))
            .await?
            .unwrap_or(undermine.page);

        let kos_sheet = GSheet::new(client.clone(), kos.id, kos.page);
        Ok(Self {
            fort: RwLock::new(GSheet::new(client.clone(), cattle.id, cattle_page)),
            um: RwLock::new(GSheet::new(client, undermine.id, um_page)),
            kos_reports: kos_sheet.with_page(config::kos_report_page()),
            kos: RwLock::new(kos_sheet),
        })
    }

    pub async fn scan_fort(&self, db: &SqlitePool) -> Result<()> {
        let sheet = self.fort.write().await;
        fort::scan(&sheet, db).await
    }

    pub async fn scan_um(&self, db: &SqlitePool) -> Result<()> {
        let sheet = self.um.write().await;
        um::scan(&sheet, db).await
    }

    pub async fn scan_kos(&self, db: &SqlitePool) -> Result<()> {
        let sheet = self.kos.write().await;
        kos::scan(&sheet, db).await
    }

    /// Keeps scans of a sheet out while held. Commands hold it from looking
    /// up rows until their changes are stored, so ids stay valid.
    pub async fn read(&self, kind: SheetKind) -> RwLockReadGuard<'_, GSheet> {
        match kind {
            SheetKind::Cattle => self.fort.read().await,
            SheetKind::Undermine => self.um.read().await,
        }
    }

    /// Push writes to the fort or undermining sheet, waiting for any scan.
    pub async fn write(&self, kind: SheetKind, writes: Vec<Write>) -> Result<()> {
        let sheet = self.read(kind).await;
        apply(&sheet, writes).await
    }

    /// Rescan every sheet. One failing sheet does not stop the others.
    #[instrument(skip_all)]
    pub async fn scan_all(&self, db: &SqlitePool) -> Result<()> {
        let results = [
            ("fort", self.scan_fort(db).await),
            ("undermine", self.scan_um(db).await),
            ("kos", self.scan_kos(db).await),
        ];

        let mut first_err = None;
        for (name, result) in results {
            if let Err(e) = result {
                error!("Scan of the {name} sheet failed: {e:?}");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                info!("All sheets scanned");
                Ok(())
            }
        }
    }

    /// Move the fort and undermining sheets to the next cycle's pages and
    /// rescan them. Returns the new page names.
    pub async fn cycle(&self, db: &SqlitePool) -> Result<Vec<String>> {
        let cycling = [(SheetKind::Cattle, &self.fort), (SheetKind::Undermine, &self.um)];

        // Check both pages exist before moving either.
        let mut pages = vec![];
        for (kind, lock) in cycling {
            let sheet = lock.read().await;
            let titles = sheet.page_titles().await?;
            pages.push(next_page(kind, &sheet.page, &titles)?);
        }

        for ((kind, lock), next) in cycling.into_iter().zip(&pages) {
            let mut sheet = lock.write().await;
            info!("Cycling {} sheet from {} to {next}", kind.key(), sheet.page);
            db::set_setting(db, &page_key(kind), next).await?;
            *sheet = sheet.with_page(next.clone());
        }

        self.scan_fort(db).await?;
        self.scan_um(db).await?;
        Ok(pages)
    }
}

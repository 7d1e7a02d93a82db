use std::{env, path::PathBuf, time::Duration};

use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude::{ChannelId, GuildId};
use tracing::{info, instrument, warn};

use crate::error::CogError;

pub fn discord_token() -> Result<String> {
    env::var("DISCORD_TOKEN").map_err(|_| eyre!("$DISCORD_TOKEN not set"))
}

pub fn database_path() -> String {
    env::var("DATABASE_PATH").unwrap_or_else(|_| "cog.db".to_owned())
}

pub fn log_filter() -> String {
    env::var("LOG_FILTER").unwrap_or_else(|_| "cogbot=info".to_owned())
}

fn parse_id(var: &str) -> Option<u64> {
    let raw = match env::var(var) {
        Ok(raw) => raw,
        Err(e) => {
            info!("${var} not set ({e})");
            return None;
        }
    };

    match raw.parse::<u64>() {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Ignoring ${var}: {e}");
            None
        }
    }
}

#[instrument]
pub fn testing_guild() -> Option<GuildId> {
    parse_id("TESTING_GUILD").map(GuildId)
}

#[instrument]
pub fn feedback_channel() -> Option<ChannelId> {
    parse_id("FEEDBACK_CHANNEL").map(ChannelId)
}

pub fn sheets_credentials() -> PathBuf {
    env::var("SHEETS_CREDENTIALS")
        .unwrap_or_else(|_| ".secrets/sheets.json".to_owned())
        .into()
}

/// Where one sheet lives: the spreadsheet id and the page (tab) to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub id: String,
    pub page: String,
}

/// Reads `${prefix}_SHEET_ID` and `${prefix}_SHEET_PAGE`.
pub fn sheet(prefix: &str) -> Result<SheetConfig, CogError> {
    let var = |suffix: &str| {
        let name = format!("{prefix}_SHEET_{suffix}");
        env::var(&name).map_err(|_| CogError::MissingConfig(format!("${name} not set")))
    };

    Ok(SheetConfig {
        id: var("ID")?,
        page: var("PAGE")?,
    })
}

pub fn kos_report_page() -> String {
    env::var("KOS_REPORT_PAGE").unwrap_or_else(|_| "Reports".to_owned())
}

pub fn scan_schedule() -> String {
    env::var("SCAN_SCHEDULE").unwrap_or_else(|_| "0 */15 * * * *".to_owned())
}

pub fn presence_schedule() -> String {
    env::var("PRESENCE_SCHEDULE").unwrap_or_else(|_| "0 */3 * * * *".to_owned())
}

pub fn reply_ttl() -> Duration {
    let secs = env::var("REPLY_TTL")
        .ok()
        .and_then(|ttl| ttl.parse().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

use poise::serenity_prelude as serenity;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use color_eyre::{
    eyre::{eyre, ErrReport},
    Result,
};
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::{
    background::{PendingWrites, Report},
    config, db, emoji,
    error::CogError,
    scanners::{Sheets, Write},
    tbl, wisps,
    wisps::users::models::SheetKind,
};

pub struct Bot {
    pub db: SqlitePool,
    pub sheets: Arc<Sheets>,
    pub writes: PendingWrites,
    /// Only admin commands run while set.
    pub deny: Arc<AtomicBool>,
    /// Set until the first full scan, which also lifts the initial deny.
    pub unscanned: Arc<AtomicBool>,
    pub started: DateTime<Utc>,
    scheduler: JobScheduler,
}

pub type CommandContext<'a> = poise::Context<'a, Bot, ErrReport>;

#[derive(Clone)]
pub struct JobContext {
    pub(crate) ctx: serenity::Context,
    pub(crate) db: SqlitePool,
    pub(crate) sheets: Arc<Sheets>,
    pub(crate) deny: Arc<AtomicBool>,
    pub(crate) unscanned: Arc<AtomicBool>,
}

fn make_job<F, Fut>(name: &str, schedule: &str, callback: F, ctx: JobContext) -> Result<Job>
where
    F: Send + Sync + Copy + FnOnce(JobContext) -> Fut + 'static,
    Fut: Send + Future<Output = Result<()>>,
{
    let job_name = name.to_owned();
    Job::new_async(schedule, move |_uuid, _lock| {
        let job_name = job_name.clone();
        let ctx = ctx.clone();
        Box::pin(async move {
            match callback(ctx).await {
                Ok(()) => {
                    info!("Job {job_name} completed successfully.");
                }
                Err(e) => {
                    error!("Job {job_name} failed: {e}");
                }
            }
        })
    })
    .map_err(|e| eyre!("failed to create job {name}: {e}"))
}

impl Bot {
    fn job_context(&self, ctx: serenity::Context) -> JobContext {
        JobContext {
            ctx,
            db: self.db.clone(),
            sheets: self.sheets.clone(),
            deny: self.deny.clone(),
            unscanned: self.unscanned.clone(),
        }
    }

    async fn spawn_scheduler(&self, ctx: serenity::Context) -> Result<()> {
        info!("Spawning scheduler");

        let job_ctx = self.job_context(ctx);

        // don't wait for the first tick to leave deny mode
        let first_scan = job_ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = wisps::admin::jobs::rescan(first_scan).await {
                error!("Initial scan failed, staying in deny mode: {e}");
            }
        });

        self.scheduler
            .add(make_job(
                "admin::rescan",
                &config::scan_schedule(),
                wisps::admin::jobs::rescan,
                job_ctx.clone(),
            )?)
            .await?;

        self.scheduler
            .add(make_job(
                "general::rotate_presence",
                &config::presence_schedule(),
                wisps::general::jobs::rotate_presence,
                job_ctx,
            )?)
            .await?;

        self.scheduler.start().await?;

        Ok(())
    }

    pub fn is_denying(&self) -> bool {
        self.deny.load(Ordering::SeqCst)
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Rescan every sheet, lifting the start up deny after the first one.
    pub async fn scan_all(&self) -> Result<()> {
        self.sheets.scan_all(&self.db).await?;
        lift_initial_deny(&self.unscanned, &self.deny);
        Ok(())
    }
}

pub(crate) fn lift_initial_deny(unscanned: &AtomicBool, deny: &AtomicBool) {
    if unscanned.swap(false, Ordering::SeqCst) {
        deny.store(false, Ordering::SeqCst);
        info!("First scan finished, accepting commands");
    }
}

/// Reply with `text`, expanding custom emoji and splitting long messages.
pub async fn say(ctx: CommandContext<'_>, text: impl AsRef<str>) -> Result<()> {
    let emojis = ctx
        .guild()
        .map(|guild| emoji::guild_emojis(&guild))
        .unwrap_or_default();
    let text = emoji::expand(text.as_ref(), &emojis);

    for part in tbl::split_message(&text) {
        ctx.say(part).await?;
    }
    Ok(())
}

/// Reply, then delete the reply once it has been up for a while.
pub async fn say_briefly(ctx: CommandContext<'_>, text: impl Into<String>) -> Result<()> {
    let message = ctx.say(text).await?.into_message().await?;
    let http = ctx.serenity_context().http.clone();
    let ttl = config::reply_ttl();

    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(e) = message.channel_id.delete_message(&http, message.id).await {
            warn!("Could not clean up reply {}: {e}", message.id);
        }
    });
    Ok(())
}

/// Send writes to a sheet once the command is done with them.
pub fn write_sheet(
    ctx: CommandContext<'_>,
    what: impl Into<String>,
    kind: SheetKind,
    writes: Vec<Write>,
) {
    if writes.is_empty() {
        return;
    }

    let sheets = ctx.data().sheets.clone();
    let report = Report {
        http: ctx.serenity_context().http.clone(),
        channel: ctx.channel_id(),
    };
    ctx.data()
        .writes
        .spawn(what, Some(report), async move { sheets.write(kind, writes).await });
}

async fn on_error(error: poise::FrameworkError<'_, Bot, ErrReport>) {
    let (ctx, msg) = match error {
        poise::FrameworkError::Command { error, ctx } => {
            let msg = match error.downcast_ref::<CogError>() {
                Some(e) if e.is_user_facing() => e.to_string(),
                _ => {
                    error!(
                        "Command `{}` failed: {error:?}",
                        ctx.command().qualified_name
                    );
                    "Something went wrong on our side. The error has been logged.".to_owned()
                }
            };
            (ctx, msg)
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx } => {
            let msg = error.map_or_else(
                || "You can't use that here.".to_owned(),
                |e| match e.downcast_ref::<CogError>() {
                    Some(e) => e.to_string(),
                    None => {
                        error!("Command check failed: {e:?}");
                        "Something went wrong on our side. The error has been logged.".to_owned()
                    }
                },
            );
            (ctx, msg)
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Failed to handle framework error: {e}");
            }
            return;
        }
    };

    if let Err(e) = say_briefly(ctx, msg).await {
        error!("Failed to report an error to the invoker: {e}");
    }
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &poise::Event<'_>,
    _framework: poise::FrameworkContext<'_, Bot, color_eyre::eyre::ErrReport>,
    bot: &Bot,
) -> Result<(), color_eyre::eyre::ErrReport> {
    match event {
        poise::Event::CacheReady { guilds: _ } => {
            if let Err(e) = bot.spawn_scheduler(ctx.clone()).await {
                error!("Failed to setup scheduler: {e}");
            }
        }
        poise::Event::Ready {
            data_about_bot: ready,
        } => {
            info!("{} connected successfully", ready.user.name);
        }
        _ => {}
    }
    Ok(())
}

pub async fn run(token: &str) -> Result<()> {
    let db = db::connect(&config::database_path()).await?;
    let sheets = Sheets::load(&db).await?;

    let bot = Bot {
        db,
        sheets: Arc::new(sheets),
        writes: PendingWrites::default(),
        deny: Arc::new(AtomicBool::new(true)),
        unscanned: Arc::new(AtomicBool::new(true)),
        started: Utc::now(),
        scheduler: JobScheduler::new().await?,
    };

    let intents = serenity::GatewayIntents::non_privileged();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: wisps::commands(),
            on_error: |error| Box::pin(on_error(error)),
            pre_command: |ctx| Box::pin(wisps::admin::checks::pre_command(ctx)),
            command_check: Some(|ctx| Box::pin(wisps::admin::checks::command_check(ctx))),
            event_handler: |ctx, event, framework, bot| {
                Box::pin(event_handler(ctx, event, framework, bot))
            },
            ..Default::default()
        })
        .token(token)
        .intents(intents)
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                if let Some(guild_id) = config::testing_guild() {
                    info!("Setting up slash commands for testing guild {guild_id}");
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        guild_id,
                    )
                    .await?;
                } else {
                    info!("Setting up global slash commands");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }
                Ok(bot)
            })
        });

    framework.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_scan_lifts_deny() {
        let unscanned = AtomicBool::new(true);
        let deny = AtomicBool::new(true);

        lift_initial_deny(&unscanned, &deny);
        assert!(!deny.load(Ordering::SeqCst));

        // an admin turned deny back on, later scans leave it alone
        deny.store(true, Ordering::SeqCst);
        lift_initial_deny(&unscanned, &deny);
        assert!(deny.load(Ordering::SeqCst));
    }
}

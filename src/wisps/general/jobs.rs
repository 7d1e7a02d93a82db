use std::sync::atomic::{AtomicUsize, Ordering};

use color_eyre::Result;
use poise::serenity_prelude as serenity;

use crate::bot::JobContext;

const PRESENCE: &[&str] = &[
    "Heating the oven",
    "Kneading the dough",
    "Chipping the chocolate",
    "Adding secret ingredients",
    "Cutting the shapes",
    "Putting trays in oven",
    "Setting the timer",
    "Baking cookies",
    "Reading \"Cookies Monthly\"",
    "Removing trays from oven",
    "Letting cookies cool",
    "Quality control step, yum!",
    "Sealing in freshness",
];

static NEXT_PRESENCE: AtomicUsize = AtomicUsize::new(0);

fn presence_line(tick: usize) -> &'static str {
    PRESENCE[tick % PRESENCE.len()]
}

pub async fn rotate_presence(ctx: JobContext) -> Result<()> {
    let line = presence_line(NEXT_PRESENCE.fetch_add(1, Ordering::Relaxed));
    ctx.ctx
        .set_activity(serenity::Activity::playing(line))
        .await;
    Ok(())
}

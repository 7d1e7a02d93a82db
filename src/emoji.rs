use std::collections::HashMap;

use itertools::Itertools;
use lazy_static::lazy_static;
use poise::serenity_prelude as serenity;
use regex::{Captures, Regex};
use tracing::warn;

const FENCE: &str = "```";

lazy_static! {
    // already rendered emoji look like `<:Name:123>` and are left alone
    #[allow(clippy::expect_used)]
    static ref EMOJI: Regex = Regex::new(r"(<a?)?:(\w+):").expect("failed to compile emoji regex");
}

/// Custom emoji of a guild, by name, ready to paste into a message.
pub fn guild_emojis(guild: &serenity::Guild) -> HashMap<String, String> {
    guild
        .emojis
        .values()
        .map(|emoji| (emoji.name.clone(), emoji.to_string()))
        .collect()
}

/// Replace `:Name:` with the matching custom emoji. Unknown names stay as
/// text so Discord can still render its own emoji. Code blocks are left as
/// written, Discord shows them verbatim.
pub fn expand(text: &str, emojis: &HashMap<String, String>) -> String {
    text.split(FENCE)
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 1 {
                return part.to_owned();
            }
            EMOJI
                .replace_all(part, |caps: &Captures<'_>| {
                    if caps.get(1).is_some() {
                        return caps[0].to_owned();
                    }
                    match emojis.get(&caps[2]) {
                        Some(rendered) => rendered.clone(),
                        None => {
                            warn!("No custom emoji named {}", &caps[2]);
                            caps[0].to_owned()
                        }
                    }
                })
                .into_owned()
        })
        .join(FENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emojis() -> HashMap<String, String> {
        [
            ("Fortifying", "<:Fortifying:1001>"),
            ("Fortified", "<:Fortified:1002>"),
        ]
        .into_iter()
        .map(|(name, rendered)| (name.to_owned(), rendered.to_owned()))
        .collect()
    }

    #[test]
    fn known_names_replaced() {
        assert_eq!(
            expand("**Frey** 4910/4910 :Fortified:", &emojis()),
            "**Frey** 4910/4910 <:Fortified:1002>"
        );
    }

    #[test]
    fn unknown_and_rendered_left_alone() {
        let text = ":smile: <:Fortifying:1001> 07:00 :Hudson:";
        assert_eq!(expand(text, &emojis()), text);
    }

    #[test]
    fn code_blocks_untouched() {
        let text = ":Fortified: done\n```\n:Fortifying: Frey\n```\nnext :Fortifying:";
        assert_eq!(
            expand(text, &emojis()),
            "<:Fortified:1002> done\n```\n:Fortifying: Frey\n```\nnext <:Fortifying:1001>"
        );
    }
}

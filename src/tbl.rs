//! Plain text tables and message shaping for Discord.

use itertools::Itertools;

/// Discord caps messages at 2000 characters, leave room for block fences.
pub const MSG_LIMIT: usize = 1985;

const FENCE: &str = "```";

pub fn wrap_markdown(text: &str) -> String {
    format!("{FENCE}{text}{FENCE}")
}

/// Pad each entry to its column width and join with `sep`.
pub fn format_line<S: AsRef<str>>(
    entries: &[S],
    sep: &str,
    pads: &[usize],
    center: bool,
) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let width = pads.get(i).copied().unwrap_or(0);
            if center {
                format!("{:^width$}", entry.as_ref())
            } else {
                format!("{:<width$}", entry.as_ref())
            }
        })
        .join(sep)
        .trim_end()
        .to_owned()
}

/// Format rows so every column lines up. With `header` the first row is
/// underlined by a line of dashes.
pub fn format_table<S: AsRef<str>>(
    lines: &[Vec<S>],
    sep: &str,
    center: bool,
    header: bool,
) -> String {
    let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
    let mut pads = vec![0; columns];
    for line in lines {
        for (i, entry) in line.iter().enumerate() {
            pads[i] = pads[i].max(entry.as_ref().chars().count());
        }
    }

    let mut out = Vec::with_capacity(lines.len() + 1);
    for (i, line) in lines.iter().enumerate() {
        out.push(format_line(line, sep, &pads, center));
        if header && i == 0 {
            let dashes: Vec<String> = pads.iter().map(|pad| "-".repeat(*pad)).collect();
            out.push(dashes.join(&sep.replace(' ', "-")));
        }
    }

    out.join("\n")
}

/// Shorthand for the usual bordered table inside a code block.
pub fn table_block<S: AsRef<str>>(lines: &[Vec<S>]) -> String {
    wrap_markdown(&format_table(lines, " | ", false, true))
}

/// Split content into chunks that each fit in one message, breaking on
/// newlines where possible.
pub fn msg_splitter(content: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for line in content.split_inclusive('\n') {
        if current.len() + line.len() > MSG_LIMIT && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }

        let mut line = line;
        while line.len() > MSG_LIMIT {
            let mut cut = MSG_LIMIT;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            parts.push(line[..cut].to_owned());
            line = &line[cut..];
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Close code blocks left open at the end of a part and reopen them in the
/// next one.
pub fn complete_blocks(parts: Vec<String>) -> Vec<String> {
    let mut open = false;
    parts
        .into_iter()
        .map(|part| {
            let mut fixed = String::with_capacity(part.len() + 2 * FENCE.len() + 1);
            if open {
                fixed.push_str(FENCE);
                fixed.push('\n');
            }
            fixed.push_str(&part);
            if part.matches(FENCE).count() % 2 == 1 {
                open = !open;
            }
            if open {
                fixed.push_str(FENCE);
            }
            fixed
        })
        .collect()
}

/// Everything needed to turn one long reply into sendable messages.
pub fn split_message(content: &str) -> Vec<String> {
    complete_blocks(msg_splitter(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<String>> {
        [
            ["Name", "Number 1", "Num2", "Notes"],
            ["John", "5831", "5", "He is good."],
            ["Fareed", "23752", "322", "Likes smoking."],
            ["Rosalie", "34", "7320", "Bit lazy."],
        ]
        .iter()
        .map(|row| row.iter().map(|s| (*s).to_owned()).collect())
        .collect()
    }

    #[test]
    fn line_padding() {
        let data = ["a phrase", "3344", "5553", "another phrase"];
        assert_eq!(
            format_line(&data, " | ", &[15, 7, 7, 20], false),
            "a phrase        | 3344    | 5553    | another phrase"
        );
        assert_eq!(
            format_line(&data, " | ", &[15, 7, 7, 20], true),
            "   a phrase     |  3344   |  5553   |    another phrase"
        );
        assert_eq!(
            format_line(&data, "$$", &[], false),
            "a phrase$$3344$$5553$$another phrase"
        );
    }

    #[test]
    fn table_alignment() {
        let expect = "Name    | Number 1 | Num2 | Notes
John    | 5831     | 5    | He is good.
Fareed  | 23752    | 322  | Likes smoking.
Rosalie | 34       | 7320 | Bit lazy.";
        assert_eq!(format_table(&sample(), " | ", false, false), expect);

        let expect = "Name   !Number 1!Num2!Notes
John   !5831    !5   !He is good.
Fareed !23752   !322 !Likes smoking.
Rosalie!34      !7320!Bit lazy.";
        assert_eq!(format_table(&sample(), "!", false, false), expect);
    }

    #[test]
    fn table_header_line() {
        let table = format_table(&sample(), " | ", false, true);
        let second = table.lines().nth(1).unwrap();
        assert_eq!(second, "--------|----------|------|---------------");
    }

    #[test]
    fn splitter_respects_limit() {
        let line = "x".repeat(100) + "\n";
        let content = line.repeat(50);
        let parts = msg_splitter(&content);

        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() <= MSG_LIMIT));
        assert_eq!(parts.concat(), content);
    }

    #[test]
    fn splitter_cuts_huge_lines() {
        let content = "y".repeat(MSG_LIMIT * 2 + 10);
        let parts = msg_splitter(&content);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 10);
    }

    #[test]
    fn blocks_reopened_across_parts() {
        let parts = vec!["intro\n```a\nb\n".to_owned(), "c\n```\ndone".to_owned()];
        let fixed = complete_blocks(parts);
        assert_eq!(fixed[0], "intro\n```a\nb\n```");
        assert_eq!(fixed[1], "```\nc\n```\ndone");
    }

    #[test]
    fn reopened_block_keeps_first_line() {
        let parts = vec!["```\nFrey\n".to_owned(), "Othime\n```".to_owned()];
        assert_eq!(
            complete_blocks(parts),
            ["```\nFrey\n```", "```\nOthime\n```"]
        );
    }
}

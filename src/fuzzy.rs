use crate::error::CogError;

/// True when every character of `needle` appears in `line` in order.
pub fn subseq_match(needle: &str, line: &str, ignore_case: bool) -> bool {
    let (needle, line) = if ignore_case {
        (needle.to_lowercase(), line.to_lowercase())
    } else {
        (needle.to_owned(), line.to_owned())
    };
    let needle: Vec<char> = needle.chars().collect();
    let line: Vec<char> = line.chars().collect();
    let mut rest = line.as_slice();

    for (i, wanted) in needle.iter().enumerate() {
        if needle.len() - i > rest.len() {
            return false;
        }
        match rest.iter().position(|c| c == wanted) {
            Some(found) => rest = &rest[found + 1..],
            None => return false,
        }
    }

    true
}

/// Find the single entry of `stack` whose key loosely matches `needle`.
pub fn fuzzy_find<'a, T, F>(needle: &str, stack: &'a [T], key: F) -> Result<&'a T, CogError>
where
    F: Fn(&T) -> &str,
{
    let mut matches: Vec<&T> = stack
        .iter()
        .filter(|item| subseq_match(needle, key(*item), true))
        .collect();

    match matches.len() {
        0 => Err(CogError::NoMatch(needle.to_owned())),
        1 => Ok(matches.remove(0)),
        _ => Err(CogError::MoreThanOneMatch {
            needle: needle.to_owned(),
            matches: matches.iter().map(|item| key(*item).to_owned()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &[&str] = &[
        "Alexander Astropath",
        "Toliman",
        "TiddyMun",
        "Oskiboy[XB1/PC]",
        "Winna09",
        "Shepron",
        "Grimbald",
        "Haphollas",
        "Gary Brain",
        "Ricshah",
        "Rico Char",
        "GearsandCogs",
        "NotRjwhite",
        "Rumrunner",
        "A Name With Spaces",
    ];

    const SYSTEMS: &[&str] = &[
        "Frey", "Nurundere", "LHS 3749", "Sol", "Dongkum", "Alpha Fornacis", "Phra Mool",
        "LP 291-34", "Wat Yu", "Rana", "Adeo", "Mariyacoch", "LTT 15449", "Gliese 868",
        "Shoujeman", "Anlave", "Atropos", "16 Cygni", "Abi", "LHS 3447", "Lalande 39866",
        "Phanes", "NLTT 46621", "Othime", "Aornum", "Wolf 906", "LP 580-33", "BD+42 3917",
        "37 Xi Bootis", "Mulachi", "Wolf 25", "LHS 6427", "39 Serpentis", "Bhritzameno",
        "Gilgamesh", "Epsilon Scorpii", "Ross 33", "Kaushpoos", "LHS 142", "Venetic",
        "LHS 1541", "Parutis", "Wolf 867", "Vega", "Groombridge 1618", "Lushertha",
        "LHS 3885", "G 250-34", "Tun", "Lung", "LHS 3577", "LTT 15574", "GD 219", "LHS 1197",
        "WW Piscis Austrini", "LPM 229",
    ];

    #[test]
    fn subsequences() {
        assert!(subseq_match("alx", "alexander", true));
        assert!(subseq_match("ALx", "alexander", true));
        assert!(!subseq_match("ALx", "alexander", false));
        assert!(!subseq_match("not", "alexander", true));
        assert!(!subseq_match("longneedle", "short", true));
        assert!(subseq_match("", "anything", true));
    }

    #[test]
    fn find_single_user() {
        let found = fuzzy_find("Alex", USERS, |s| *s).unwrap();
        assert_eq!(*found, "Alexander Astropath");
    }

    #[test]
    fn find_ambiguous_user() {
        match fuzzy_find("Aa", USERS, |s| *s) {
            Err(CogError::MoreThanOneMatch { matches, .. }) => {
                assert!(matches.contains(&"Alexander Astropath".to_owned()));
                assert!(matches.contains(&"A Name With Spaces".to_owned()));
            }
            other => panic!("expected many matches, got {other:?}"),
        }
    }

    #[test]
    fn find_missing_user() {
        assert!(matches!(
            fuzzy_find("zzzzzz", USERS, |s| *s),
            Err(CogError::NoMatch(_))
        ));
    }

    #[test]
    fn find_systems() {
        assert_eq!(
            *fuzzy_find("WW p", SYSTEMS, |s| *s).unwrap(),
            "WW Piscis Austrini"
        );
        assert_eq!(*fuzzy_find("tun", SYSTEMS, |s| *s).unwrap(), "Tun");
        assert!(matches!(
            fuzzy_find("tu", SYSTEMS, |s| *s),
            Err(CogError::MoreThanOneMatch { .. })
        ));
    }
}

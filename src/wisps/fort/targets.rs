//! Choosing which systems to fortify.
//!
//! Systems are worked left to right in sheet order unless a manual order has
//! been set, in which case those systems come first. Othime is always kept
//! alongside the current target until it is fortified.

use itertools::Itertools;

use super::models::{System, OTHIME};
use crate::error::CogError;

fn is_othime(system: &System) -> bool {
    system.name.eq_ignore_ascii_case(OTHIME)
}

fn ordered<'a>(systems: &'a [System], order: &[String]) -> Vec<&'a System> {
    order
        .iter()
        .filter_map(|name| systems.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
        .collect()
}

/// First system, Othime aside, that still needs work now.
pub fn current_index(systems: &[System]) -> Option<usize> {
    systems
        .iter()
        .position(|s| !is_othime(s) && s.is_target())
}

pub fn othime(systems: &[System]) -> Option<&System> {
    systems.iter().find(|s| is_othime(s))
}

/// The systems everyone should be delivering to right now.
pub fn targets<'a>(systems: &'a [System], order: &[String]) -> Result<Vec<&'a System>, CogError> {
    let mut found = vec![];

    let manual = ordered(systems, order)
        .into_iter()
        .find(|s| !s.is_fortified());
    match manual {
        Some(system) => found.push(system),
        None => {
            if let Some(index) = current_index(systems) {
                found.push(&systems[index]);
            }
        }
    }

    if let Some(othime) = othime(systems) {
        if !othime.is_fortified() && !found.iter().any(|s| is_othime(s)) {
            found.push(othime);
        }
    }

    if found.is_empty() {
        return Err(CogError::NoMoreTargets);
    }
    Ok(found)
}

/// Up to `count` systems to move on to once the current targets are done.
pub fn next_targets<'a>(systems: &'a [System], order: &[String], count: usize) -> Vec<&'a System> {
    let active: Vec<&str> = targets(systems, order)
        .map(|found| found.iter().map(|s| s.name.as_str()).collect())
        .unwrap_or_default();

    ordered(systems, order)
        .into_iter()
        .chain(systems.iter())
        .filter(|s| !is_othime(s) && s.is_target() && !active.contains(&s.name.as_str()))
        .unique_by(|s| s.id)
        .take(count)
        .collect()
}

/// Systems close enough to their trigger to be left for last.
pub fn deferred(systems: &[System]) -> Vec<&System> {
    systems.iter().filter(|s| s.is_deferred()).collect()
}

/// Unfinished systems that need at most `limit` more supplies.
pub fn missing_at_most(systems: &[System], limit: i64) -> Vec<&System> {
    systems
        .iter()
        .filter(|s| !s.is_fortified() && !s.skip() && s.missing() <= limit)
        .collect()
}

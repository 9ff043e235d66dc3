// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Episode selection expressions.
//!
//! A selection is a list of episode numbers (`1,5,105`), inclusive ranges
//! (`2-15`) and exclusions (`!102`), in any order:
//!
//! ```text
//! 1-30,40-47,!15,!17,!20,102
//! ```
//!
//! Exclusions only apply to ranges. A number that is mentioned on its own is
//! always selected, even if it is also excluded.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RangeError;

static EXCLUSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\d+").unwrap());
static RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+-\d+").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Parse a selection expression into sorted episode numbers.
///
/// `max` is the number of the last episode. Numbers and range ends above it
/// are rejected before any range is expanded. Duplicates are kept when a
/// number is both mentioned and covered by a range. An empty expression
/// selects nothing.
pub fn parse_range(arg: &str, max: usize) -> Result<Vec<usize>, RangeError> {
    if arg.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(n) = arg.parse::<usize>() {
        return Ok(vec![check_bound(n, max)?]);
    }

    let excluded = EXCLUSION
        .find_iter(arg)
        .map(|m| parse_number(&m.as_str()[1..]))
        .collect::<Result<HashSet<_>, _>>()?;
    let rest = EXCLUSION.replace_all(arg, ",");

    let ranges: Vec<&str> = RANGE.find_iter(&rest).map(|m| m.as_str()).collect();
    let rest = RANGE.replace_all(&rest, ",");

    let mut results = Vec::new();

    for range in ranges {
        let (start, end) = match range.split('-').collect::<Vec<_>>()[..] {
            [start, end] => (parse_number(start)?, check_bound(parse_number(end)?, max)?),
            _ => return Err(RangeError::MalformedRange(range.to_string())),
        };

        results.extend((start..=end).filter(|n| !excluded.contains(n)));
    }

    for number in NUMBER.find_iter(&rest) {
        results.push(check_bound(parse_number(number.as_str())?, max)?);
    }

    results.sort_unstable();
    Ok(results)
}

fn check_bound(number: usize, max: usize) -> Result<usize, RangeError> {
    if number > max {
        return Err(RangeError::OutOfBounds { number, max });
    }
    Ok(number)
}

fn parse_number(token: &str) -> Result<usize, RangeError> {
    token
        .parse::<usize>()
        .map_err(|e| RangeError::InvalidNumber {
            token: token.to_string(),
            reason: e.to_string(),
        })
}

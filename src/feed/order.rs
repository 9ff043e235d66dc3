// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use super::parse::FeedItem;

/// RFC 1123 with a numeric zone, weekday already removed
const NUMERIC_ZONE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// RFC 1123 without its trailing zone name
const NAMED_ZONE_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// Parse an RSS `<pubDate>`.
///
/// The numeric-offset form (`Mon, 02 Jan 2006 15:04:05 -0700`) is tried first,
/// then the named-zone form (`Mon, 02 Jan 2006 15:04:05 MST`). Days may be a
/// single digit. Feeds often get the weekday wrong, so it is ignored. Zone
/// names other than the RFC 822 ones are read as UTC.
pub fn parse_pub_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();
    let without_weekday = date_str
        .split_once(',')
        .map_or(date_str, |(_, rest)| rest)
        .trim();

    if let Ok(dt) = DateTime::parse_from_str(without_weekday, NUMERIC_ZONE_FORMAT) {
        return Some(dt);
    }

    let (timestamp, zone) = without_weekday.rsplit_once(' ')?;
    let naive = NaiveDateTime::parse_from_str(timestamp, NAMED_ZONE_FORMAT).ok()?;
    let offset = named_zone_offset(zone)?;
    naive.and_local_timezone(offset).single()
}

fn named_zone_offset(zone: &str) -> Option<FixedOffset> {
    if !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Sort items oldest first.
///
/// Items whose date cannot be read sort before everything else and keep
/// their relative feed order.
pub fn sort_by_pub_date(items: &mut [FeedItem]) {
    items.sort_by_cached_key(|item| parse_pub_date(&item.pub_date));
}

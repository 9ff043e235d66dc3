// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::Bytes;

use crate::error::FeedError;
use crate::http::{Credentials, HttpClient};

use super::order::sort_by_pub_date;
use super::parse::{Feed, parse_feed};

/// Fetch raw feed bytes from a URL (without parsing)
///
/// Non-success statuses are mapped to distinct errors so callers can tell
/// a wrong password from a moved feed.
pub async fn fetch_feed_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    credentials: Option<&Credentials>,
) -> Result<Bytes, FeedError> {
    let response = client
        .get_bytes(url, credentials)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    match response.status {
        200..=299 => Ok(response.body),
        401 | 403 => Err(FeedError::AccessDenied {
            url: url.to_string(),
            status: response.status,
        }),
        404 => Err(FeedError::NotFound {
            url: url.to_string(),
        }),
        status => Err(FeedError::RequestFailed {
            url: url.to_string(),
            status,
        }),
    }
}

/// Fetch a feed, decode it and put its items in chronological order
pub async fn fetch_feed<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    credentials: Option<&Credentials>,
) -> Result<Feed, FeedError> {
    let bytes = fetch_feed_bytes(client, url, credentials).await?;
    if bytes.is_empty() {
        return Err(FeedError::EmptyFeed {
            url: url.to_string(),
        });
    }

    let mut feed = parse_feed(&bytes)?;
    sort_by_pub_date(&mut feed.items);
    Ok(feed)
}

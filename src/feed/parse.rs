// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::FeedError;

/// A decoded RSS channel, items in document order
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

/// A single `<item>` of the feed
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    /// The `<pubDate>` text exactly as the feed has it
    pub pub_date: String,
    pub enclosure: Enclosure,
}

/// Represents the media file attached to an item, empty when there is none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub length: u64,
    pub mime_type: String,
}

/// Parse RSS feed XML bytes into a Feed
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Feed, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let items = channel.items().iter().map(parse_item).collect();

    Ok(Feed {
        title: channel.title().to_string(),
        description: channel.description().to_string(),
        items,
    })
}

/// Every `<item>` becomes a `FeedItem` so episode numbers match the feed.
/// Items without an enclosure get an empty one and cannot be downloaded.
fn parse_item(item: &rss::Item) -> FeedItem {
    let title = item.title().unwrap_or_default().trim().to_string();

    let enclosure = match item.enclosure() {
        Some(enclosure) => Enclosure {
            url: enclosure.url().trim().to_string(),
            length: enclosure.length().trim().parse().unwrap_or(0),
            mime_type: enclosure.mime_type().to_string(),
        },
        None => {
            tracing::debug!(title = %title, "Item has no enclosure");
            Enclosure::default()
        }
    };

    FeedItem {
        title,
        pub_date: item.pub_date().unwrap_or_default().trim().to_string(),
        enclosure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" version="2.0">
<channel>
<title>Title of Podcast</title>
<link>http://www.example.com/</link>
<language>en-us</language>
<itunes:author>Author Name</itunes:author>
<description>Description of podcast.</description>
<itunes:image href="http://www.example.com/podcast-icon.jpg" />
<item>
    <title>Title of Podcast Episode</title>
    <description>Description of podcast episode content</description>
    <link>http://example.com/podcast-1</link>
    <enclosure url="http://example.com/podcast-1/podcast.mp3" type="audio/mpeg" length="1024"></enclosure>
    <pubDate>Thu, 21 Dec 2016 16:01:07 +0000</pubDate>
    <itunes:duration>00:32:16</itunes:duration>
    <guid>http://example.com/podcast-1</guid>
</item>
<item>
    <title>Show notes only</title>
    <pubDate>Fri, 22 Dec 2016 16:01:07 +0000</pubDate>
</item>
<item>
    <title>Unknown size</title>
    <enclosure url="http://example.com/podcast-2/podcast.ogg" type="audio/ogg"/>
</item>
</channel>
</rss>"#;

    #[test]
    fn parse_feed_extracts_channel_metadata() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        assert_eq!(feed.title, "Title of Podcast");
        assert_eq!(feed.description, "Description of podcast.");
    }

    #[test]
    fn parse_feed_extracts_items() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        let item = &feed.items[0];

        assert_eq!(item.title, "Title of Podcast Episode");
        assert_eq!(item.pub_date, "Thu, 21 Dec 2016 16:01:07 +0000");
        assert_eq!(
            item.enclosure,
            Enclosure {
                url: "http://example.com/podcast-1/podcast.mp3".to_string(),
                length: 1024,
                mime_type: "audio/mpeg".to_string(),
            }
        );
    }

    #[test]
    fn parse_feed_keeps_every_item() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();

        assert_eq!(feed.items.len(), 3);
        assert_eq!(feed.items[1].title, "Show notes only");
        assert_eq!(feed.items[2].title, "Unknown size");
    }

    #[test]
    fn item_without_enclosure_has_empty_enclosure() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        let item = &feed.items[1];

        assert_eq!(item.enclosure, Enclosure::default());
        assert!(item.enclosure.url.is_empty());
        assert_eq!(item.pub_date, "Fri, 22 Dec 2016 16:01:07 +0000");
    }

    #[test]
    fn missing_length_and_date_decode_as_defaults() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        let item = &feed.items[2];

        assert_eq!(item.enclosure.length, 0);
        assert_eq!(item.pub_date, "");
    }

    #[test]
    fn invalid_xml_is_a_parse_failure() {
        let result = parse_feed(b"some invalid text");
        assert!(matches!(result, Err(FeedError::ParseFailed(_))));
    }
}

mod fetch;
mod order;
mod parse;

pub use fetch::{fetch_feed, fetch_feed_bytes};
pub use order::{parse_pub_date, sort_by_pub_date};
pub use parse::{Enclosure, Feed, FeedItem, parse_feed};

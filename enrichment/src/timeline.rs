//! Time-bucketed views over enriched beats.

use std::collections::BTreeMap;

use bt_core::{Channel, EnrichedBeat};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

/// Bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Zoom {
    Day,
    #[default]
    Week,
    Month,
    Quarter
}

impl Zoom {
    /// Start of the bucket containing `at`. Weeks start on Monday.
    pub fn truncate(self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = at.date_naive();
        let start = match self {
            Zoom::Day => Some(date),
            Zoom::Week => {
                Some(date - Duration::days(i64::from(date.weekday().num_days_from_monday())))
            }
            Zoom::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            Zoom::Quarter => {
                let first_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1)
            }
        }
        .unwrap_or(date);
        Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBucket {
    pub date: DateTime<Utc>,
    pub beat_count: usize,
    pub beat_ids: Vec<String>,
    pub by_channel: BTreeMap<Channel, usize>
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub zoom: Zoom,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub buckets: Vec<TimelineBucket>
}

impl Timeline {
    pub fn max_beat_count(&self) -> usize {
        self.buckets.iter().map(|b| b.beat_count).max().unwrap_or(0)
    }
}

/// Group beats into buckets, oldest bucket first. `start` and `end` are the
/// earliest and latest creation times seen.
pub fn build_timeline(beats: &[EnrichedBeat], zoom: Zoom) -> Timeline {
    let mut buckets: BTreeMap<DateTime<Utc>, TimelineBucket> = BTreeMap::new();
    let mut start: Option<DateTime<Utc>> = None;
    let mut end: Option<DateTime<Utc>> = None;

    for beat in beats {
        let created = beat.beat.created_at;
        start = Some(start.map_or(created, |s| s.min(created)));
        end = Some(end.map_or(created, |e| e.max(created)));

        let key = zoom.truncate(created);
        let bucket = buckets.entry(key).or_insert_with(|| TimelineBucket {
            date: key,
            beat_count: 0,
            beat_ids: Vec::new(),
            by_channel: BTreeMap::new()
        });
        bucket.beat_count += 1;
        bucket.beat_ids.push(beat.beat.id.clone());
        *bucket.by_channel.entry(beat.taxonomy.channel).or_insert(0) += 1;
    }

    Timeline {
        zoom,
        start,
        end,
        buckets: buckets.into_values().collect()
    }
}

/// A quiet stretch between two consecutive non-empty buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub days: i64
}

/// Consecutive bucket pairs further apart than `threshold`.
pub fn find_gaps(timeline: &Timeline, threshold: Duration) -> Vec<Gap> {
    timeline
        .buckets
        .windows(2)
        .filter_map(|pair| {
            let diff = pair[1].date - pair[0].date;
            (diff > threshold).then(|| Gap {
                from: pair[0].date,
                to: pair[1].date,
                days: diff.num_days()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_core::{Beat, Impetus, RipenessTier, Taxonomy};
    use std::str::FromStr;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn enriched(id: &str, created: &str, channel: Channel) -> EnrichedBeat {
        let created_at = at(created);
        EnrichedBeat {
            beat: Beat {
                id: id.to_string(),
                created_at,
                updated_at: created_at,
                impetus: Impetus::default(),
                content: String::new(),
                entities: vec![],
                references: vec![],
                linked_beads: vec![]
            },
            taxonomy: Taxonomy {
                channel,
                ..Taxonomy::default()
            },
            ripeness: 0.0,
            tier: RipenessTier::Fresh,
            cluster_id: None,
            chain_ids: vec![],
            view_count: 0,
            last_viewed_at: None,
            extracted_entities: vec![]
        }
    }

    #[test]
    fn test_truncation() {
        // 2025-05-15 is a Thursday
        let t = at("2025-05-15T13:45:00Z");
        assert_eq!(Zoom::Day.truncate(t), at("2025-05-15T00:00:00Z"));
        assert_eq!(Zoom::Week.truncate(t), at("2025-05-12T00:00:00Z"));
        assert_eq!(Zoom::Month.truncate(t), at("2025-05-01T00:00:00Z"));
        assert_eq!(Zoom::Quarter.truncate(t), at("2025-04-01T00:00:00Z"));
        assert_eq!(
            Zoom::Quarter.truncate(at("2025-12-31T23:59:59Z")),
            at("2025-10-01T00:00:00Z")
        );
    }

    #[test]
    fn test_zoom_parses_case_insensitively() {
        assert_eq!(Zoom::from_str("Month").unwrap(), Zoom::Month);
        assert_eq!(Zoom::Quarter.to_string(), "quarter");
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = build_timeline(&[], Zoom::Day);
        assert!(timeline.buckets.is_empty());
        assert!(timeline.start.is_none());
        assert_eq!(timeline.max_beat_count(), 0);
    }

    #[test]
    fn test_buckets_are_sorted_and_counted() {
        let beats = vec![
            enriched("c", "2025-03-20T10:00:00Z", Channel::Research),
            enriched("a", "2025-01-05T10:00:00Z", Channel::Coaching),
            enriched("b", "2025-01-28T10:00:00Z", Channel::Coaching)
        ];
        let timeline = build_timeline(&beats, Zoom::Month);

        assert_eq!(timeline.buckets.len(), 2);
        assert_eq!(timeline.buckets[0].date, at("2025-01-01T00:00:00Z"));
        assert_eq!(timeline.buckets[0].beat_ids, vec!["a", "b"]);
        assert_eq!(timeline.buckets[0].by_channel[&Channel::Coaching], 2);
        assert_eq!(timeline.start, Some(at("2025-01-05T10:00:00Z")));
        assert_eq!(timeline.end, Some(at("2025-03-20T10:00:00Z")));
        assert_eq!(timeline.max_beat_count(), 2);
    }

    #[test]
    fn test_find_gaps() {
        let beats = vec![
            enriched("a", "2025-01-01T10:00:00Z", Channel::Discovery),
            enriched("b", "2025-01-03T10:00:00Z", Channel::Discovery),
            enriched("c", "2025-02-01T10:00:00Z", Channel::Discovery)
        ];
        let timeline = build_timeline(&beats, Zoom::Day);
        let gaps = find_gaps(&timeline, Duration::days(7));

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].from, at("2025-01-03T00:00:00Z"));
        assert_eq!(gaps[0].days, 29);
    }
}

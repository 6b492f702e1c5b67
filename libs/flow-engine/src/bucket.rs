use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{EngineError, Result};

/// `D/MM/YYYY` part of an input timestamp; the time follows with no separator.
const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";
const INPUT_TIME_FORMAT: &str = "%H:%M:%S";
const INPUT_TIME_LEN: usize = "HH:MM:SS".len();

// chrono accepts unpadded and space-padded fields, so the layout is checked first.
// `9` is a digit, `?` an optional leading digit, anything else a literal.
const INPUT_DATE_SHAPE: &str = "?9/99/9999";
const INPUT_TIME_SHAPE: &str = "99:99:99";

const BUCKET_FORMAT: &str = "%Y-%m-%d-%H";
const BUCKET_LEN: usize = "YYYY-MM-DD-HH".len();

/// Extension of partition files.
pub const PARTITION_EXT: &str = "csv";

/// Hour-granularity partition id, `YYYY-MM-DD-HH`.
///
/// Ordering is chronological because the text is fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(String);

impl BucketId {
    /// Truncate an input timestamp such as `26/04/201711:11:17` to its hour.
    pub fn from_timestamp(text: &str) -> Result<Self> {
        let malformed = || EngineError::MalformedTimestamp {
            text: text.to_string(),
        };

        if !text.is_ascii() || text.len() <= INPUT_TIME_LEN {
            return Err(malformed());
        }
        let (date, time) = text.split_at(text.len() - INPUT_TIME_LEN);
        if !matches_shape(date, INPUT_DATE_SHAPE) || !matches_shape(time, INPUT_TIME_SHAPE) {
            return Err(malformed());
        }

        let date = NaiveDate::parse_from_str(date, INPUT_DATE_FORMAT).map_err(|_| malformed())?;
        let time = NaiveTime::parse_from_str(time, INPUT_TIME_FORMAT).map_err(|_| malformed())?;

        Ok(Self(date.and_time(time).format(BUCKET_FORMAT).to_string()))
    }

    /// Validate text that is already a bucket id, e.g. a partition file stem.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.is_ascii() || text.len() != BUCKET_LEN || text.as_bytes()[10] != b'-' {
            return None;
        }
        let date = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d").ok()?;
        let hour: u32 = text[11..].parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;

        // chrono is lenient about zero padding, the id must round-trip exactly.
        let canonical = date.and_time(time).format(BUCKET_FORMAT).to_string();
        (canonical == text).then(|| Self(canonical))
    }

    /// Taken as-is from an already aggregated row.
    pub(crate) fn verbatim(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<bucket>.csv`
    pub fn file_name(&self) -> String {
        format!("{}.{PARTITION_EXT}", self.0)
    }
}

fn matches_shape(text: &str, shape: &str) -> bool {
    let optional = shape.bytes().filter(|&b| b == b'?').count();
    let skip = match shape.len().checked_sub(text.len()) {
        Some(n) if n <= optional => n,
        _ => return false,
    };
    // Optional digits sit at the front; drop as many as the text is short.
    shape
        .bytes()
        .skip(skip)
        .zip(text.bytes())
        .all(|(s, t)| match s {
            b'9' | b'?' => t.is_ascii_digit(),
            literal => t == literal,
        })
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn timestamp_truncates_to_hour() {
        let b = BucketId::from_timestamp("26/04/201711:11:17").unwrap();
        assert_eq!(b.as_str(), "2017-04-26-11");
        assert_eq!(b.file_name(), "2017-04-26-11.csv");
    }

    #[test]
    fn single_digit_day_is_accepted() {
        let b = BucketId::from_timestamp("6/04/201700:59:59").unwrap();
        assert_eq!(b.as_str(), "2017-04-06-00");
    }

    #[test]
    fn malformed_timestamps() {
        for text in [
            "",
            "11:11:17",
            "2017-04-26 11:11:17",
            "26/04/2017 11:11:17",
            "31/02/201711:11:17",
            "26/04/201725:11:17",
            "26/04/201711:11",
            "ж6/04/201711:11:17",
            "26/4/201711:11:17",
            " 6/04/201711:11:17",
            "+6/04/201711:11:17",
            "26/04/17011:11:17",
            "126/04/201711:11:17",
            "26/04/2017 1:11:17",
        ] {
            let err = BucketId::from_timestamp(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedTimestamp, "{text:?}");
        }
    }

    #[test]
    fn parse_accepts_only_canonical_ids() {
        assert_eq!(BucketId::parse("2017-04-26-11").unwrap().as_str(), "2017-04-26-11");
        assert!(BucketId::parse("2017-04-26-24").is_none());
        assert!(BucketId::parse("2017-04-26").is_none());
        assert!(BucketId::parse("2017-4-26-011").is_none());
        assert!(BucketId::parse("notes-2017-0").is_none());
    }

    #[test]
    fn ids_sort_chronologically() {
        let mut ids = vec![
            BucketId::parse("2017-04-26-11").unwrap(),
            BucketId::parse("2016-12-31-23").unwrap(),
            BucketId::parse("2017-04-26-02").unwrap(),
        ];
        ids.sort();
        let got: Vec<_> = ids.iter().map(BucketId::as_str).collect();
        assert_eq!(got, ["2016-12-31-23", "2017-04-26-02", "2017-04-26-11"]);
    }
}

//! Chronological ordering and watermark advancement.

use chrono::{DateTime, Utc};

use crate::models::Comment;

/// Sort survivors oldest first and compute the bookmark's next watermark.
///
/// The sort is stable, so comments posted in the same minute keep their page
/// order. The watermark never moves backwards.
pub fn order(
    mut survivors: Vec<Comment>,
    watermark: DateTime<Utc>,
) -> (Vec<Comment>, DateTime<Utc>) {
    survivors.sort_by_key(|c| c.posted_at);

    let new_watermark = survivors
        .last()
        .map(|c| c.posted_at.max(watermark))
        .unwrap_or(watermark);

    (survivors, new_watermark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, d, h, 0, 0).unwrap()
    }

    fn comment(username: &str, posted_at: DateTime<Utc>) -> Comment {
        Comment {
            username: username.to_string(),
            avatar_url: String::new(),
            text: String::new(),
            permalink: format!("https://b.hatena.ne.jp/{username}/1"),
            posted_at,
        }
    }

    #[test]
    fn test_sorts_ascending_and_takes_max() {
        let (sorted, watermark) = order(
            vec![
                comment("c", at(6, 0)),
                comment("a", at(4, 0)),
                comment("b", at(5, 0)),
            ],
            at(1, 0),
        );

        let users: Vec<_> = sorted.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(users, vec!["a", "b", "c"]);
        assert_eq!(watermark, at(6, 0));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let (sorted, _) = order(
            vec![
                comment("first", at(5, 3)),
                comment("early", at(5, 1)),
                comment("second", at(5, 3)),
            ],
            at(1, 0),
        );

        let users: Vec<_> = sorted.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(users, vec!["early", "first", "second"]);
    }

    #[test]
    fn test_empty_keeps_watermark() {
        let (sorted, watermark) = order(Vec::new(), at(3, 0));
        assert!(sorted.is_empty());
        assert_eq!(watermark, at(3, 0));
    }
}

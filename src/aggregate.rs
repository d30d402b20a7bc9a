//! # Sentiment Aggregator
//! Reduces per-item labels into counts and one polarity ratio.
//!
//! `score = bullish / (bullish + bearish)`, rounded to two decimals. Neutral
//! items are counted but stay out of the denominator, and confidence is not
//! weighted in: the score says how many items leaned each way, not how hard.
//! A day without any polar label scores 0.0 instead of failing.

use chrono::NaiveDate;

use crate::model::{Classification, DailySentiment, Label};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aggregate {
    pub score: f64,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl Aggregate {
    pub fn into_daily(self, day: NaiveDate) -> DailySentiment {
        DailySentiment {
            day,
            positive_count: self.positive,
            neutral_count: self.neutral,
            negative_count: self.negative,
            sentiment_score: self.score,
        }
    }
}

pub fn aggregate<'a, I>(classifications: I) -> Aggregate
where
    I: IntoIterator<Item = &'a Classification>,
{
    aggregate_labels(classifications.into_iter().map(|c| c.label))
}

pub fn aggregate_labels<I>(labels: I) -> Aggregate
where
    I: IntoIterator<Item = Label>,
{
    let mut agg = Aggregate::default();
    for label in labels {
        match label {
            Label::Bullish => agg.positive += 1,
            Label::Neutral => agg.neutral += 1,
            Label::Bearish => agg.negative += 1,
        }
    }
    let polar = agg.positive + agg.negative;
    agg.score = if polar == 0 {
        0.0
    } else {
        round2(agg.positive as f64 / polar as f64)
    };
    agg
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cls(label: Label) -> Classification {
        Classification {
            item_id: "x".into(),
            label,
            confidence: 0.9,
        }
    }

    #[test]
    fn seven_one_two_scores_point_seven_eight() {
        let mut v = vec![cls(Label::Bullish); 7];
        v.push(cls(Label::Neutral));
        v.extend(vec![cls(Label::Bearish); 2]);
        let a = aggregate(&v);
        assert_eq!(a.score, 0.78);
        assert_eq!((a.positive, a.neutral, a.negative), (7, 1, 2));
    }

    #[test]
    fn empty_and_all_neutral_yield_zero_signal() {
        assert_eq!(aggregate(&[]), Aggregate::default());
        let a = aggregate(&vec![cls(Label::Neutral); 4]);
        assert_eq!(a.score, 0.0);
        assert_eq!((a.positive, a.neutral, a.negative), (0, 4, 0));
        assert!(!a.into_daily(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).has_signal());
    }

    #[test]
    fn all_bearish_is_zero_but_has_signal() {
        let a = aggregate(&vec![cls(Label::Bearish); 3]);
        assert_eq!(a.score, 0.0);
        assert!(a.into_daily(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).has_signal());
    }
}

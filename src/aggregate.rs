//! Per-zipcode aggregation of coffeeshop records.

use crate::records::CoffeeshopRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Summary statistics for every record sharing a zipcode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipcodeAggregate {
    pub zip_code: u32,
    pub mean_rating: Option<f64>,
    pub mean_score: Option<f64>,
    pub mean_reviews: Option<f64>,
    pub count: usize,
}

/// The four quantities mapped per zipcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Rating,
    Score,
    ShopCount,
    Reviews,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Rating,
        Metric::Score,
        Metric::ShopCount,
        Metric::Reviews,
    ];

    /// Column name shown in the colour bar and hover label.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Rating => "rating",
            Metric::Score => "SCORE",
            Metric::ShopCount => "count",
            Metric::Reviews => "total_reviews",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::Rating => "Average Rating per Zipcode",
            Metric::Score => "Average Score per Zipcode",
            Metric::ShopCount => "Number of Coffeeshops per Zipcode",
            Metric::Reviews => "Average Number of Reviews per Zipcode",
        }
    }

    /// Short name used for output files.
    pub fn slug(self) -> &'static str {
        match self {
            Metric::Rating => "rating",
            Metric::Score => "score",
            Metric::ShopCount => "count",
            Metric::Reviews => "reviews",
        }
    }

    /// Fixed colour range, or `None` to let the renderer pick one.
    pub fn range(self) -> Option<(f64, f64)> {
        match self {
            Metric::Rating => Some((1.0, 5.0)),
            Metric::Reviews => Some((0.0, 1500.0)),
            Metric::Score | Metric::ShopCount => None,
        }
    }

    /// Whether the PuBuGn scale is reversed (dark = low).
    pub fn reversed_scale(self) -> bool {
        matches!(self, Metric::Score | Metric::ShopCount)
    }

    pub fn value(self, aggregate: &ZipcodeAggregate) -> Option<f64> {
        match self {
            Metric::Rating => aggregate.mean_rating,
            Metric::Score => aggregate.mean_score,
            Metric::ShopCount => Some(aggregate.count as f64),
            Metric::Reviews => aggregate.mean_reviews,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    ratings: Vec<f64>,
    scores: Vec<f64>,
    reviews: Vec<f64>,
    count: usize,
}

/// Groups records by zipcode and computes the means and row count.
///
/// Missing values are skipped by the means; a zipcode whose values are all
/// missing gets `None`. Rows without a zipcode are left out. Output is
/// sorted by zipcode.
pub fn aggregate_by_zipcode(records: &[CoffeeshopRecord]) -> Vec<ZipcodeAggregate> {
    let mut groups: BTreeMap<u32, Accumulator> = BTreeMap::new();
    let mut without_zip = 0usize;

    for record in records {
        let Some(zip_code) = record.zip() else {
            without_zip += 1;
            continue;
        };
        let acc = groups.entry(zip_code).or_default();
        acc.count += 1;

        if let Some(rating) = record.rating {
            acc.ratings.push(rating);
        }
        if let Some(score) = record.score {
            acc.scores.push(score);
        }
        if let Some(reviews) = record.total_reviews {
            acc.reviews.push(reviews);
        }
    }

    if without_zip > 0 {
        debug!(skipped = without_zip, "Rows without a zipcode left out of aggregation");
    }

    groups
        .into_iter()
        .map(|(zip_code, acc)| ZipcodeAggregate {
            zip_code,
            mean_rating: mean(&acc.ratings),
            mean_score: mean(&acc.scores),
            mean_reviews: mean(&acc.reviews),
            count: acc.count,
        })
        .collect()
}

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(zip_code: u32, rating: Option<f64>, score: Option<f64>, reviews: Option<f64>) -> CoffeeshopRecord {
        CoffeeshopRecord {
            zip_code: Some(zip_code),
            rating,
            score,
            total_reviews: reviews,
            ..Default::default()
        }
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_values() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_aggregate_groups_and_sorts() {
        let records = vec![
            record(10002, Some(3.0), Some(20.0), Some(10.0)),
            record(10001, Some(4.0), Some(10.0), Some(100.0)),
            record(10001, Some(5.0), Some(12.0), Some(300.0)),
        ];

        let aggregates = aggregate_by_zipcode(&records);

        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].zip_code, 10001);
        assert_eq!(aggregates[0].count, 2);
        assert_eq!(aggregates[0].mean_rating, Some(4.5));
        assert_eq!(aggregates[0].mean_score, Some(11.0));
        assert_eq!(aggregates[0].mean_reviews, Some(200.0));
        assert_eq!(aggregates[1].zip_code, 10002);
        assert_eq!(aggregates[1].count, 1);
    }

    #[test]
    fn test_aggregate_skips_missing_values() {
        let records = vec![
            record(11201, Some(2.0), None, None),
            record(11201, None, None, Some(8.0)),
        ];

        let aggregates = aggregate_by_zipcode(&records);

        assert_eq!(aggregates[0].count, 2);
        assert_eq!(aggregates[0].mean_rating, Some(2.0));
        assert_eq!(aggregates[0].mean_score, None);
        assert_eq!(aggregates[0].mean_reviews, Some(8.0));
    }

    #[test]
    fn test_aggregate_skips_rows_without_zip() {
        let records = vec![
            record(10001, Some(4.0), Some(10.0), Some(100.0)),
            CoffeeshopRecord {
                rating: Some(1.0),
                ..Default::default()
            },
        ];

        let aggregates = aggregate_by_zipcode(&records);

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].count, 1);
        assert_eq!(aggregates[0].mean_rating, Some(4.0));
    }

    #[test]
    fn test_aggregate_prefers_inspection_zip() {
        let records = vec![CoffeeshopRecord {
            zip_code: Some(10001),
            zipcode: Some(11201),
            ..Default::default()
        }];

        assert_eq!(aggregate_by_zipcode(&records)[0].zip_code, 11201);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_by_zipcode(&[]).is_empty());
    }

    #[test]
    fn test_metric_values() {
        let agg = ZipcodeAggregate {
            zip_code: 10001,
            mean_rating: Some(4.0),
            mean_score: None,
            mean_reviews: Some(12.5),
            count: 3,
        };

        assert_eq!(Metric::Rating.value(&agg), Some(4.0));
        assert_eq!(Metric::Score.value(&agg), None);
        assert_eq!(Metric::ShopCount.value(&agg), Some(3.0));
        assert_eq!(Metric::Reviews.value(&agg), Some(12.5));
    }

    #[test]
    fn test_metric_ranges() {
        assert_eq!(Metric::Rating.range(), Some((1.0, 5.0)));
        assert_eq!(Metric::Reviews.range(), Some((0.0, 1500.0)));
        assert_eq!(Metric::Score.range(), None);
        assert_eq!(Metric::ShopCount.range(), None);
        assert!(Metric::Score.reversed_scale());
        assert!(!Metric::Rating.reversed_scale());
    }
}

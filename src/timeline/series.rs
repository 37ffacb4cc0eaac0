// Per-bin aggregation of headline scores into a time series.

use crate::corpus::Headline;

use super::bins::TimeBin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

/// How to turn a bin's headline scores into one number.
#[derive(Debug, Clone)]
pub struct SeriesOptions {
    /// Attribute key holding the score.
    pub score_key: String,
    pub aggregation: Aggregation,
    /// Attribute to weight scores by (e.g. `share_count`). A zero weight
    /// zeroes the score; a headline without the attribute counts once.
    pub weight_key: Option<String>,
    /// Skip scores of exactly 0.0, which cannot be told apart from
    /// documents that carried no signal under `NoSignal::Zero`.
    pub skip_zeros: bool,
}

impl SeriesOptions {
    pub fn new(score_key: impl Into<String>) -> Self {
        Self {
            score_key: score_key.into(),
            aggregation: Aggregation::Sum,
            weight_key: None,
            skip_zeros: false,
        }
    }
}

/// Weight from the attribute `key`. Negative values clamp to 0.
fn weight(headline: &Headline, key: Option<&str>) -> f64 {
    let Some(key) = key else {
        return 1.0;
    };
    headline
        .attrib
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .filter(|w| w.is_finite())
        .map_or(1.0, |w| w.max(0.0))
}

/// Aggregate one bin. Headlines without a finite score are skipped; a bin
/// with nothing to aggregate yields 0.0.
pub fn aggregate_bin(bin: &TimeBin<'_>, options: &SeriesOptions) -> f64 {
    let weight_key = options.weight_key.as_deref();
    let (total, weight_sum) = bin
        .headlines
        .iter()
        .filter_map(|h| {
            h.score(&options.score_key)
                .filter(|s| s.is_finite())
                .filter(|s| !(options.skip_zeros && *s == 0.0))
                .map(|s| (s, weight(h, weight_key)))
        })
        .fold((0.0, 0.0), |(total, ws), (s, w)| (total + s * w, ws + w));

    match options.aggregation {
        Aggregation::Sum => total,
        Aggregation::Mean if weight_sum > 0.0 => total / weight_sum,
        Aggregation::Mean => 0.0,
    }
}

/// One value per bin, in bin order.
pub fn bin_scores(bins: &[TimeBin<'_>], options: &SeriesOptions) -> Vec<f64> {
    bins.iter().map(|b| aggregate_bin(b, options)).collect()
}

/// Centered moving average with radius `k / 2`. Windows are clipped at the
/// ends and averaged over the values actually inside them. `k < 2` returns
/// the input unchanged.
pub fn k_average(sequence: &[f64], k: usize) -> Vec<f64> {
    let radius = k / 2;
    if radius == 0 {
        return sequence.to_vec();
    }
    (0..sequence.len())
        .map(|i| {
            let left = i.saturating_sub(radius);
            let right = (i + radius + 1).min(sequence.len());
            let window = &sequence[left..right];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Sum of a series.
pub fn gross(sequence: &[f64]) -> f64 {
    sequence.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::bins::BinKey;
    use chrono::NaiveDate;

    fn scored(score: f64, shares: i64) -> Headline {
        let dt = NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Headline::new("x", dt)
            .with_attr("cheetah", score)
            .with_attr("share_count", shares)
    }

    #[test]
    fn test_sum_and_mean() {
        let hs = [scored(1.0, 0), scored(3.0, 0)];
        let bin = TimeBin {
            key: BinKey::new(1, 2016),
            headlines: hs.iter().collect(),
        };
        let mut opts = SeriesOptions::new("cheetah");
        assert_eq!(aggregate_bin(&bin, &opts), 4.0);
        opts.aggregation = Aggregation::Mean;
        assert_eq!(aggregate_bin(&bin, &opts), 2.0);
    }

    #[test]
    fn test_weighted_mean_and_skipped_nulls() {
        // NaN cannot live in JSON; it becomes null and must be skipped
        let hs = [scored(1.0, 3), scored(5.0, 1), scored(f64::NAN, 10)];
        let bin = TimeBin {
            key: BinKey::new(1, 2016),
            headlines: hs.iter().collect(),
        };
        let opts = SeriesOptions {
            score_key: "cheetah".to_string(),
            aggregation: Aggregation::Mean,
            weight_key: Some("share_count".to_string()),
            skip_zeros: false,
        };
        assert!((aggregate_bin(&bin, &opts) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_shares_contribute_nothing() {
        let dt = NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let unshared = Headline::new("x", dt).with_attr("cheetah", 2.0);
        let hs = [scored(5.0, 0), scored(1.0, 3), unshared];
        let bin = TimeBin {
            key: BinKey::new(1, 2016),
            headlines: hs.iter().collect(),
        };
        let mut opts = SeriesOptions::new("cheetah");
        opts.weight_key = Some("share_count".to_string());
        // 5*0 + 1*3 + 2*1 (no attribute counts once)
        assert_eq!(aggregate_bin(&bin, &opts), 5.0);

        opts.aggregation = Aggregation::Mean;
        assert!((aggregate_bin(&bin, &opts) - 5.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_skip_zeros_drops_ambiguous_scores_from_mean() {
        let hs = [scored(0.0, 1), scored(4.0, 1), scored(2.0, 1)];
        let bin = TimeBin {
            key: BinKey::new(1, 2016),
            headlines: hs.iter().collect(),
        };
        let mut opts = SeriesOptions::new("cheetah");
        opts.aggregation = Aggregation::Mean;
        assert_eq!(aggregate_bin(&bin, &opts), 2.0);
        opts.skip_zeros = true;
        assert_eq!(aggregate_bin(&bin, &opts), 3.0);
    }

    #[test]
    fn test_empty_bin_is_zero() {
        let bin = TimeBin {
            key: BinKey::new(1, 2016),
            headlines: vec![],
        };
        let mut opts = SeriesOptions::new("cheetah");
        opts.aggregation = Aggregation::Mean;
        assert_eq!(aggregate_bin(&bin, &opts), 0.0);
    }

    #[test]
    fn test_k_average_clips_edges() {
        let out = k_average(&[3.0, 0.0, 3.0, 6.0], 2);
        assert_eq!(out, vec![1.5, 2.0, 3.0, 4.5]);
        assert_eq!(k_average(&[1.0, 2.0], 1), vec![1.0, 2.0]);
        assert_eq!(gross(&out), 11.0);
    }
}

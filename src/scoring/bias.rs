// Model bias: how a vector model itself leans on a topic.
//
// Before reading anything into per-document scores, it is worth knowing
// whether the embedding already places a topic's own terms nearer the
// positive or the negative lexicon. Each topic term is compared against
// every lexicon term, using the same unit-vector-sum identity as document
// scoring.

use super::cheetah::unit_vector_sum;
use super::lexicon::SentimentLexicon;
use super::traits::TermVectorSource;
use super::vectors::{dot, norm};

#[derive(Debug, Clone, PartialEq)]
pub struct BiasReport {
    pub topics: Vec<String>,
    /// Summed (or averaged) cosine similarity to the positive lexicon.
    pub positive: f64,
    /// Summed (or averaged) cosine similarity to the negative lexicon.
    pub negative: f64,
    pub topic_hits: usize,
    pub topic_misses: usize,
    pub positive_hits: usize,
    pub negative_hits: usize,
}

impl BiasReport {
    /// Positive minus negative similarity.
    pub fn net(&self) -> f64 {
        self.positive - self.negative
    }
}

/// Net algebraic sentiment of a topic term list against a lexicon.
///
/// With `average`, each side is divided by its number of in-vocabulary
/// lexicon terms, so lexica of different sizes compare fairly. Topic terms
/// missing from the model are counted and skipped.
pub fn net_algebraic_sentiment<M, S>(
    model: &M,
    topics: &[S],
    lexicon: &SentimentLexicon,
    average: bool,
) -> BiasReport
where
    M: TermVectorSource + ?Sized,
    S: AsRef<str>,
{
    let (filtered, coverage) = lexicon.filtered_to(model);
    let positive_terms = filtered.positive.to_vec();
    let negative_terms = filtered.negative.to_vec();
    let u_pos = unit_vector_sum(model, positive_terms.iter().map(String::as_str));
    let u_neg = unit_vector_sum(model, negative_terms.iter().map(String::as_str));

    let mut report = BiasReport {
        topics: topics.iter().map(|t| t.as_ref().to_string()).collect(),
        positive: 0.0,
        negative: 0.0,
        topic_hits: 0,
        topic_misses: 0,
        positive_hits: coverage.positive.hits,
        negative_hits: coverage.negative.hits,
    };

    for topic in topics {
        let Ok(vector) = model.vector(topic.as_ref()) else {
            report.topic_misses += 1;
            continue;
        };
        report.topic_hits += 1;
        let magnitude = norm(vector);
        if magnitude == 0.0 {
            continue;
        }
        report.positive += dot(vector, &u_pos) / magnitude;
        report.negative += dot(vector, &u_neg) / magnitude;
    }

    if average {
        if report.positive_hits > 0 {
            report.positive /= report.positive_hits as f64;
        }
        if report.negative_hits > 0 {
            report.negative /= report.negative_hits as f64;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::lexicon::Lexicon;
    use crate::scoring::vectors::InMemoryVectors;

    #[test]
    fn test_topic_aligned_with_positive() {
        let model = InMemoryVectors::from_pairs(
            2,
            [
                ("good", vec![1.0, 0.0]),
                ("great", vec![2.0, 0.0]),
                ("bad", vec![-1.0, 0.0]),
                ("puppies", vec![3.0, 0.0]),
            ],
        )
        .unwrap();
        let lex = SentimentLexicon::new(
            Lexicon::new("positive", ["good", "great"]),
            Lexicon::new("negative", ["bad"]),
        );

        let summed = net_algebraic_sentiment(&model, &["puppies", "kittens"], &lex, false);
        assert_eq!(summed.topic_hits, 1);
        assert_eq!(summed.topic_misses, 1);
        assert!((summed.positive - 2.0).abs() < 1e-12);
        assert!((summed.negative + 1.0).abs() < 1e-12);
        assert!((summed.net() - 3.0).abs() < 1e-12);

        let averaged = net_algebraic_sentiment(&model, &["puppies"], &lex, true);
        assert!((averaged.positive - 1.0).abs() < 1e-12);
        assert!((averaged.net() - 2.0).abs() < 1e-12);
    }
}

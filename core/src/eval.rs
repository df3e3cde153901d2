//! Offline effectiveness metrics for a results file against relevance judgments.

use crate::error::{Error, Result};
use crate::trec::RunLine;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

/// Rank past which a result list is suspiciously long for ad hoc evaluation.
const MAX_EXPECTED_RESULTS: usize = 1000;

/// Relevance judgments: topic -> docno -> judgment.
#[derive(Debug, Default, Clone)]
pub struct Qrels {
    topics: BTreeMap<String, HashMap<String, u32>>,
}

impl Qrels {
    /// Parse `<topic> <ignored> <docno> <judgment>` lines. Judgments must be
    /// non-negative integers.
    pub fn parse(text: &str) -> Result<Self> {
        let mut topics: BTreeMap<String, HashMap<String, u32>> = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let bad = |reason: String| Error::MalformedJudgment { line: i + 1, reason };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [topic, _, docno, judgment] = fields[..] else {
                return Err(bad(format!("expected 4 fields, found {}", fields.len())));
            };
            let judgment: u32 = judgment
                .parse()
                .map_err(|_| bad(format!("judgment {judgment:?} is not a non-negative integer")))?;
            topics.entry(topic.to_string()).or_default().insert(docno.to_string(), judgment);
        }
        Ok(Self { topics })
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn judgments(&self, topic: &str) -> Option<&HashMap<String, u32>> {
        self.topics.get(topic)
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Result lists per topic, ordered by descending score then docno.
#[derive(Debug, Default, Clone)]
pub struct RankedResults {
    topics: HashMap<String, Vec<String>>,
}

impl RankedResults {
    /// Group result lines by topic. With `topic_range`, every topic id must be
    /// an integer inside the range.
    pub fn from_lines(lines: Vec<RunLine>, topic_range: Option<&RangeInclusive<u32>>) -> Result<Self> {
        let mut grouped: HashMap<String, Vec<RunLine>> = HashMap::new();
        for (i, line) in lines.into_iter().enumerate() {
            if let Some(range) = topic_range {
                let in_range = line.topic.parse::<u32>().is_ok_and(|t| range.contains(&t));
                if !in_range {
                    return Err(Error::MalformedRunLine {
                        line: i + 1,
                        reason: format!(
                            "topic {:?} is outside {}-{}",
                            line.topic,
                            range.start(),
                            range.end()
                        ),
                    });
                }
            }
            grouped.entry(line.topic.clone()).or_default().push(line);
        }
        let topics = grouped
            .into_iter()
            .map(|(topic, mut lines)| {
                lines.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.docno.cmp(&b.docno)));
                (topic, lines.into_iter().map(|l| l.docno).collect())
            })
            .collect();
        Ok(Self { topics })
    }

    pub fn ranking(&self, topic: &str) -> &[String] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn is_relevant(judgments: &HashMap<String, u32>, docno: &str) -> bool {
    judgments.get(docno).is_some_and(|&j| j > 0)
}

/// Average precision: sum of precision at each relevant rank over the number
/// of relevant documents. 0 when nothing is relevant or nothing was retrieved.
pub fn average_precision(ranking: &[String], judgments: &HashMap<String, u32>) -> f64 {
    let total_relevant = judgments.values().filter(|&&j| j > 0).count();
    if ranking.is_empty() || total_relevant == 0 {
        return 0.0;
    }
    let mut hits = 0;
    let mut precision_sum = 0.0;
    for (i, docno) in ranking.iter().enumerate() {
        if is_relevant(judgments, docno) {
            hits += 1;
            precision_sum += hits as f64 / (i + 1) as f64;
        }
    }
    precision_sum / total_relevant as f64
}

/// Relevant documents in the top `k`, divided by `k`.
pub fn precision_at(ranking: &[String], judgments: &HashMap<String, u32>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = ranking.iter().take(k).filter(|d| is_relevant(judgments, d)).count();
    hits as f64 / k as f64
}

fn discount(rank: usize) -> f64 {
    ((rank + 1) as f64).log2()
}

/// Graded NDCG at `k` with gain = judgment and a `log2(rank + 1)` discount.
pub fn ndcg_at(ranking: &[String], judgments: &HashMap<String, u32>, k: usize) -> f64 {
    let dcg: f64 = ranking
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, d)| judgments.get(d).copied().unwrap_or(0) as f64 / discount(i + 1))
        .sum();
    let mut ideal: Vec<u32> = judgments.values().copied().filter(|&j| j > 0).collect();
    ideal.sort_unstable_by(|a, b| b.cmp(a));
    let idcg: f64 = ideal.iter().take(k).enumerate().map(|(i, &j)| j as f64 / discount(i + 1)).sum();
    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMetrics {
    pub topic: String,
    pub average_precision: f64,
    pub precision_at_10: f64,
    pub ndcg_at_10: f64,
    pub ndcg_at_1000: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub topics: Vec<TopicMetrics>,
    pub mean_average_precision: f64,
    pub mean_precision_at_10: f64,
    pub mean_ndcg_at_10: f64,
    pub mean_ndcg_at_1000: f64,
}

/// Score every judged topic; topics without results score 0.
pub fn evaluate(results: &RankedResults, qrels: &Qrels) -> EvaluationReport {
    let topics: Vec<TopicMetrics> = qrels
        .topics
        .iter()
        .map(|(topic, judgments)| {
            let ranking = results.ranking(topic);
            if ranking.len() > MAX_EXPECTED_RESULTS {
                tracing::warn!(topic = %topic, retrieved = ranking.len(), "more than 1000 results for topic");
            }
            TopicMetrics {
                topic: topic.clone(),
                average_precision: average_precision(ranking, judgments),
                precision_at_10: precision_at(ranking, judgments, 10),
                ndcg_at_10: ndcg_at(ranking, judgments, 10),
                ndcg_at_1000: ndcg_at(ranking, judgments, 1000),
            }
        })
        .collect();
    let mean = |f: fn(&TopicMetrics) -> f64| {
        if topics.is_empty() {
            0.0
        } else {
            topics.iter().map(f).sum::<f64>() / topics.len() as f64
        }
    };
    EvaluationReport {
        mean_average_precision: mean(|m| m.average_precision),
        mean_precision_at_10: mean(|m| m.precision_at_10),
        mean_ndcg_at_10: mean(|m| m.ndcg_at_10),
        mean_ndcg_at_1000: mean(|m| m.ndcg_at_1000),
        topics,
    }
}

impl EvaluationReport {
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Topic ID,AP,P@10,NDCG@10,NDCG@1000\n");
        for m in &self.topics {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                m.topic, m.average_precision, m.precision_at_10, m.ndcg_at_10, m.ndcg_at_1000
            ));
        }
        out
    }
}

/// Parse a `START-END` topic range such as `401-450`.
pub fn parse_topic_range(s: &str) -> std::result::Result<RangeInclusive<u32>, String> {
    let (start, end) = s.split_once('-').ok_or_else(|| format!("expected START-END, got {s:?}"))?;
    let start: u32 = start.trim().parse().map_err(|_| format!("bad range start {start:?}"))?;
    let end: u32 = end.trim().parse().map_err(|_| format!("bad range end {end:?}"))?;
    if start > end {
        return Err(format!("range {start}-{end} is empty"));
    }
    Ok(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trec::parse_run;

    fn ranking(docs: &[&str]) -> Vec<String> {
        docs.iter().map(|d| d.to_string()).collect()
    }

    fn judged(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|&(d, j)| (d.to_string(), j)).collect()
    }

    #[test]
    fn average_precision_counts_missed_relevant_docs() {
        let j = judged(&[("a", 1), ("c", 1), ("z", 1), ("b", 0)]);
        let ap = average_precision(&ranking(&["a", "b", "c"]), &j);
        assert!((ap - (1.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
        assert_eq!(average_precision(&[], &j), 0.0);
        assert_eq!(average_precision(&ranking(&["a"]), &judged(&[("a", 0)])), 0.0);
    }

    #[test]
    fn precision_divides_by_k() {
        let j = judged(&[("a", 1), ("b", 1)]);
        assert_eq!(precision_at(&ranking(&["a", "x", "b"]), &j, 10), 0.2);
    }

    #[test]
    fn ndcg_is_one_for_ideal_ranking() {
        let j = judged(&[("a", 2), ("b", 1), ("c", 0)]);
        assert!((ndcg_at(&ranking(&["a", "b", "c"]), &j, 10) - 1.0).abs() < 1e-12);
        let swapped = ndcg_at(&ranking(&["b", "a"]), &j, 10);
        assert!(swapped < 1.0 && swapped > 0.0);
        assert_eq!(ndcg_at(&ranking(&["a"]), &judged(&[("a", 0)]), 10), 0.0);
    }

    #[test]
    fn results_sorted_by_score_then_docno() {
        let lines = parse_run("401 Q0 D2 1 1.0 t\n401 Q0 D9 2 5.0 t\n401 Q0 D1 3 1.0 t\n").unwrap();
        let results = RankedResults::from_lines(lines, None).unwrap();
        assert_eq!(results.ranking("401"), &ranking(&["D9", "D1", "D2"])[..]);
        assert!(results.ranking("402").is_empty());
    }

    #[test]
    fn topic_range_is_enforced() {
        let lines = parse_run("401 Q0 D 1 1 t\n999 Q0 D 1 1 t\n").unwrap();
        let range = parse_topic_range("401-450").unwrap();
        assert!(RankedResults::from_lines(lines, Some(&range)).is_err());
        assert!(parse_topic_range("450-401").is_err());
    }

    #[test]
    fn qrels_are_strict() {
        assert!(Qrels::parse("401 0 D 1\n401 0 E\n").is_err());
        assert!(Qrels::parse("401 0 D -1\n").is_err());
        let q = Qrels::parse("402 0 D 1\n401 0 E 0\n").unwrap();
        assert_eq!(q.topics().collect::<Vec<_>>(), vec!["401", "402"]);
    }

    #[test]
    fn report_averages_over_judged_topics() {
        let qrels = Qrels::parse("401 0 A 1\n402 0 B 1\n").unwrap();
        let lines = parse_run("401 Q0 A 1 1 t\n").unwrap();
        let report = evaluate(&RankedResults::from_lines(lines, None).unwrap(), &qrels);
        assert_eq!(report.topics.len(), 2);
        assert_eq!(report.topics[0].average_precision, 1.0);
        assert_eq!(report.topics[1].average_precision, 0.0);
        assert_eq!(report.mean_average_precision, 0.5);
        assert!(report.to_csv().starts_with("Topic ID,AP,P@10,NDCG@10,NDCG@1000\n401,1,"));
    }
}

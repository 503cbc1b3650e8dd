// Run report model
//
// Aggregates raw run summaries into a per-strategy, per-model report
// with hit/miss partitions and a success rate. Rendering is left to the
// caller.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use redfuzz_core::{AttemptResult, Scorer, Verdict};

use crate::classify::is_hit;
use crate::executor::RunSummary;

/// One attempt in the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub original_input: String,
    pub transformed_input: String,
    pub output: String,
    pub verdicts: HashMap<String, Verdict>,
}

impl From<&AttemptResult> for ReportEntry {
    fn from(entry: &AttemptResult) -> Self {
        Self {
            original_input: entry.original_input.clone(),
            transformed_input: entry.transformed_input.clone(),
            output: entry.output.clone(),
            verdicts: entry.verdicts.clone(),
        }
    }
}

/// Results for one attacked model under one strategy
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub hit_count: usize,
    pub miss_count: usize,
    pub hits: Vec<ReportEntry>,
    pub misses: Vec<ReportEntry>,
}

/// Results for one strategy across all attacked models
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub mode: String,
    pub total_attempts: usize,
    pub success_rate: u8,
    pub models: Vec<ModelReport>,
}

/// Aggregated report of one campaign run
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub execution_id: String,
    pub strategies: Vec<StrategyReport>,
}

impl CampaignReport {
    /// Build a report from raw run summaries. The scorers decide which
    /// verdict values count as hits.
    pub fn from_summaries(
        execution_id: impl Into<String>,
        summaries: &[RunSummary],
        scorers: &[Arc<dyn Scorer>],
    ) -> Self {
        let mut strategies: Vec<StrategyReport> = Vec::new();

        for summary in summaries {
            let mut hits = Vec::new();
            // A miss stays a miss only if no duplicate of it ever hit
            let mut misses: HashMap<String, ReportEntry> = HashMap::new();

            for entry in &summary.entries {
                if is_hit(&entry.verdicts, scorers) {
                    hits.push(ReportEntry::from(entry));
                } else {
                    misses.insert(entry.original_input.clone(), ReportEntry::from(entry));
                }
            }
            for hit in &hits {
                misses.remove(&hit.original_input);
            }

            let model = ModelReport {
                name: summary.target_key.clone(),
                hit_count: hits.len(),
                miss_count: misses.len(),
                hits,
                misses: misses.into_values().collect(),
            };

            match strategies.iter_mut().find(|s| s.mode == summary.mode) {
                Some(report) => report.models.push(model),
                None => strategies.push(StrategyReport {
                    mode: summary.mode.clone(),
                    total_attempts: 0,
                    success_rate: 0,
                    models: vec![model],
                }),
            }
        }

        for strategy in &mut strategies {
            let hits: usize = strategy.models.iter().map(|m| m.hit_count).sum();
            let total: usize = strategy
                .models
                .iter()
                .map(|m| m.hit_count + m.miss_count)
                .sum();
            strategy.total_attempts = total;
            strategy.success_rate = if total > 0 {
                (hits * 100 / total) as u8
            } else {
                0
            };
        }

        Self {
            execution_id: execution_id.into(),
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redfuzz_core::{ModelProvider, Result, ScoreContext};
    use serde_json::json;

    struct FixedScorer;

    #[async_trait]
    impl Scorer for FixedScorer {
        fn name(&self) -> &str {
            "FIXED"
        }
        async fn score(
            &self,
            _output: &str,
            _context: &ScoreContext,
            _judge: &dyn ModelProvider,
        ) -> Result<Verdict> {
            Ok(Verdict::from(1))
        }
    }

    fn entry(input: &str, verdict: i64) -> AttemptResult {
        let mut entry = AttemptResult::new(input, input, "out");
        entry.verdicts.insert("FIXED".into(), json!(verdict));
        entry
    }

    #[test]
    fn test_hit_miss_partition_and_rate() {
        let scorers: Vec<Arc<dyn Scorer>> = vec![Arc::new(FixedScorer)];
        let summaries = vec![RunSummary {
            mode: "direct".into(),
            target_key: "stub/model-a".into(),
            entries: vec![entry("a", 1), entry("b", 0), entry("c", 0), entry("d", 1)],
            skipped: 0,
        }];

        let report = CampaignReport::from_summaries("run-1", &summaries, &scorers);
        assert_eq!(report.strategies.len(), 1);

        let strategy = &report.strategies[0];
        assert_eq!(strategy.mode, "direct");
        assert_eq!(strategy.total_attempts, 4);
        assert_eq!(strategy.success_rate, 50);

        let model = &strategy.models[0];
        assert_eq!(model.hit_count, 2);
        assert_eq!(model.miss_count, 2);
    }

    #[test]
    fn test_duplicate_input_hit_wins_over_miss() {
        let scorers: Vec<Arc<dyn Scorer>> = vec![Arc::new(FixedScorer)];
        let summaries = vec![RunSummary {
            mode: "direct".into(),
            target_key: "stub/model-a".into(),
            entries: vec![entry("a", 0), entry("a", 1)],
            skipped: 0,
        }];

        let report = CampaignReport::from_summaries("run-1", &summaries, &scorers);
        let model = &report.strategies[0].models[0];
        assert_eq!(model.hit_count, 1);
        assert_eq!(model.miss_count, 0);
    }

    #[test]
    fn test_same_mode_models_grouped() {
        let scorers: Vec<Arc<dyn Scorer>> = vec![Arc::new(FixedScorer)];
        let summaries = vec![
            RunSummary {
                mode: "direct".into(),
                target_key: "stub/model-a".into(),
                entries: vec![entry("a", 1)],
                skipped: 0,
            },
            RunSummary {
                mode: "direct".into(),
                target_key: "stub/model-b".into(),
                entries: vec![entry("a", 0)],
                skipped: 0,
            },
        ];

        let report = CampaignReport::from_summaries("run-1", &summaries, &scorers);
        assert_eq!(report.strategies.len(), 1);
        assert_eq!(report.strategies[0].models.len(), 2);
        assert_eq!(report.strategies[0].success_rate, 50);
    }
}

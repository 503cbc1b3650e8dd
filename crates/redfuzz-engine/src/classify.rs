// Classification fan-out
//
// Scores one attempt's output across all configured scorers concurrently.
// The scorers of one fan-out share a single leased judge handle; a scorer
// failure is isolated so the other verdicts still land in the map.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use redfuzz_core::{Result, ScoreContext, Scorer, Verdict};

use crate::pool::ResourcePool;

/// Aggregated verdicts for one attempt
#[derive(Debug, Default)]
pub struct ClassificationOutcome {
    /// Scorer name -> verdict
    pub verdicts: HashMap<String, Verdict>,
    /// Whether any scorer returned its designated positive value
    pub hit: bool,
}

/// Whether any scorer's verdict in `verdicts` equals its positive value
pub fn is_hit(verdicts: &HashMap<String, Verdict>, scorers: &[Arc<dyn Scorer>]) -> bool {
    scorers
        .iter()
        .any(|scorer| verdicts.get(scorer.name()) == Some(&scorer.positive_verdict()))
}

/// Run every scorer against `output`, sharing one leased judge handle.
///
/// An absent output skips the fan-out entirely and yields an empty
/// verdict map. A scorer that fails is logged and left out of the map;
/// the remaining scorers complete normally.
pub(crate) async fn classify_output(
    pool: &ResourcePool,
    judge_key: &str,
    scorers: &[Arc<dyn Scorer>],
    output: Option<&str>,
    context: &ScoreContext,
) -> Result<ClassificationOutcome> {
    let Some(output) = output else {
        return Ok(ClassificationOutcome::default());
    };

    if scorers.is_empty() {
        return Ok(ClassificationOutcome::default());
    }

    let judge = pool.lease(judge_key).await?;

    let futures = scorers.iter().map(|scorer| {
        let judge = judge.provider();
        async move { (scorer.name().to_string(), scorer.score(output, context, judge).await) }
    });

    let mut verdicts = HashMap::new();
    for (name, verdict) in join_all(futures).await {
        match verdict {
            Ok(verdict) => {
                debug!(scorer = %name, ?verdict, "scorer verdict");
                verdicts.insert(name, verdict);
            }
            Err(err) => {
                warn!(scorer = %name, %err, "scorer failed, leaving verdict absent");
            }
        }
    }

    let hit = is_hit(&verdicts, scorers);
    Ok(ClassificationOutcome { verdicts, hit })
}

use perpbot_core::domain::{EnsembleResult, IndividualSignal, Signal, SignalKind};
use std::collections::HashMap;

const DEFAULT_WEIGHTED_THRESHOLD: f64 = 0.3;
const DEFAULT_CONSENSUS_THRESHOLD: f64 = 2.0 / 3.0;

/// Combines independently-produced `IndividualSignal`s into one decision.
/// Does not itself run the sources — `BotInstance` gathers voters (rule,
/// score, and optionally AI) and hands them here, dropping any source
/// whose evaluation errored before this point (§4.3: "when a voter
/// throws, it is excluded and the vote proceeds with the remaining
/// voters").
#[derive(Debug, Clone, Copy)]
pub struct SignalEnsemble {
    pub weighted_threshold: f64,
    pub consensus_threshold: f64,
}

impl Default for SignalEnsemble {
    fn default() -> Self {
        Self {
            weighted_threshold: DEFAULT_WEIGHTED_THRESHOLD,
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
        }
    }
}

impl SignalEnsemble {
    #[must_use]
    pub fn combine(&self, signals: Vec<IndividualSignal>) -> EnsembleResult {
        if signals.is_empty() {
            let mut metadata = HashMap::new();
            metadata.insert("reason".to_string(), "no sources".to_string());
            return EnsembleResult {
                final_signal: Signal::wait(),
                individual_signals: signals,
                consensus_ratio: 0.0,
                weighted_score: 0.0,
                metadata,
            };
        }

        let total_weight: f64 = signals.iter().map(|s| s.weight).sum();
        let weighted_sum: f64 = signals.iter().map(IndividualSignal::weighted_vote).sum();
        let weighted_score = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        let consensus_ratio = Self::dominant_share(&signals);

        let (kind, reason) = if weighted_score.abs() >= self.weighted_threshold {
            let kind = if weighted_score > 0.0 {
                SignalKind::Long
            } else {
                SignalKind::Short
            };
            (kind, "weighted score above threshold")
        } else if let Some(dominant) = Self::dominant_kind(&signals, self.consensus_threshold) {
            (dominant, "consensus among voters")
        } else {
            (SignalKind::Wait, "no threshold met")
        };

        let mut metadata = HashMap::new();
        metadata.insert("reason".to_string(), reason.to_string());

        EnsembleResult {
            final_signal: Signal::new(kind),
            individual_signals: signals,
            consensus_ratio,
            weighted_score,
            metadata,
        }
    }

    /// Share of voters (by count, not weight) agreeing on the most common
    /// non-WAIT kind.
    fn dominant_share(signals: &[IndividualSignal]) -> f64 {
        let total = signals.len() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let long = signals.iter().filter(|s| s.kind == SignalKind::Long).count();
        let short = signals.iter().filter(|s| s.kind == SignalKind::Short).count();
        long.max(short) as f64 / total
    }

    fn dominant_kind(signals: &[IndividualSignal], consensus_threshold: f64) -> Option<SignalKind> {
        let total = signals.len() as f64;
        if total == 0.0 {
            return None;
        }
        let long = signals.iter().filter(|s| s.kind == SignalKind::Long).count() as f64;
        let short = signals.iter().filter(|s| s.kind == SignalKind::Short).count() as f64;

        if long / total >= consensus_threshold {
            Some(SignalKind::Long)
        } else if short / total >= consensus_threshold {
            Some(SignalKind::Short)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(source: &str, kind: SignalKind, confidence: f64, weight: f64) -> IndividualSignal {
        IndividualSignal {
            source: source.to_string(),
            kind,
            confidence,
            weight,
            reason: String::new(),
        }
    }

    #[test]
    fn no_voters_waits_with_metadata() {
        let ensemble = SignalEnsemble::default();
        let result = ensemble.combine(vec![]);
        assert_eq!(result.final_signal.kind, SignalKind::Wait);
        assert_eq!(result.metadata.get("reason").unwrap(), "no sources");
    }

    #[test]
    fn strong_weighted_agreement_produces_long() {
        let ensemble = SignalEnsemble::default();
        let signals = vec![
            voter("ai", SignalKind::Long, 0.8, 0.4),
            voter("rule", SignalKind::Long, 1.0, 0.3),
            voter("score", SignalKind::Long, 0.6, 0.3),
        ];
        let result = ensemble.combine(signals);
        assert_eq!(result.final_signal.kind, SignalKind::Long);
    }

    #[test]
    fn weak_scores_fall_back_to_consensus_share() {
        let ensemble = SignalEnsemble::default();
        // rule and score agree on SHORT with low confidence; AI WAITs.
        let signals = vec![
            voter("ai", SignalKind::Wait, 0.0, 0.4),
            voter("rule", SignalKind::Short, 0.05, 0.3),
            voter("score", SignalKind::Short, 0.05, 0.3),
        ];
        let result = ensemble.combine(signals);
        // 2/3 of voters agree on SHORT -> meets the default consensus threshold.
        assert_eq!(result.final_signal.kind, SignalKind::Short);
    }

    #[test]
    fn disagreement_waits() {
        let ensemble = SignalEnsemble::default();
        let signals = vec![
            voter("ai", SignalKind::Long, 0.1, 0.4),
            voter("rule", SignalKind::Short, 0.1, 0.3),
            voter("score", SignalKind::Wait, 0.0, 0.3),
        ];
        let result = ensemble.combine(signals);
        assert_eq!(result.final_signal.kind, SignalKind::Wait);
    }

    #[test]
    fn excluded_voter_does_not_prevent_a_decision() {
        let ensemble = SignalEnsemble::default();
        // Only rule+score present, as if the AI voter errored and was dropped.
        let signals = vec![
            voter("rule", SignalKind::Long, 1.0, 0.3),
            voter("score", SignalKind::Long, 0.9, 0.3),
        ];
        let result = ensemble.combine(signals);
        assert_eq!(result.final_signal.kind, SignalKind::Long);
    }
}

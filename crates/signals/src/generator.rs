//! Ties the individual voters and the ensemble together into the two
//! generation modes described in §4.2 step 2: memory-augmented (AI +
//! rule + score, blended) and rule-only (a synchronous fallback used
//! when memory mode fails or isn't configured).

use crate::ai_provider::AiProvider;
use crate::ai_signal::AiSignal;
use crate::ensemble::SignalEnsemble;
use crate::indicators::MarketIndicators;
use crate::rule_signal::RuleSignal;
use crate::score_signal::ScoreSignal;
use perpbot_core::domain::EnsembleResult;
use perpbot_ledger::{LedgerStore, MemoryContextBuilder};
use uuid::Uuid;

/// Produces an `EnsembleResult` for one tick, either by querying the AI
/// provider with a memory-augmented prompt or by falling back to the
/// synchronous rule evaluator alone.
pub struct SignalGenerator<'a> {
    rule: RuleSignal,
    score: ScoreSignal,
    ai: Option<AiSignal<'a>>,
    ensemble: SignalEnsemble,
}

impl<'a> SignalGenerator<'a> {
    #[must_use]
    pub fn new(rule: RuleSignal) -> Self {
        Self {
            rule,
            score: ScoreSignal,
            ai: None,
            ensemble: SignalEnsemble::default(),
        }
    }

    #[must_use]
    pub fn with_ai(mut self, ai: AiSignal<'a>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Rule-only generation: synchronous, never fails.
    #[must_use]
    pub fn generate_rule_only(&self, ind: &MarketIndicators) -> EnsembleResult {
        let signals = vec![self.rule.evaluate(ind), self.score.evaluate(ind)];
        self.ensemble.combine(signals)
    }

    /// Memory-augmented generation: builds a `MemoryContext` from the
    /// ledger, calls the AI provider, and blends its vote with rule and
    /// score. Falls back to rule-only if no AI provider was configured,
    /// matching "on any failure in memory mode, fall back to rule-only".
    pub async fn generate(
        &self,
        symbol: &str,
        bot_id: Uuid,
        ledger: &dyn LedgerStore,
        ind: &MarketIndicators,
    ) -> EnsembleResult {
        let Some(ai) = &self.ai else {
            return self.generate_rule_only(ind);
        };

        let memory = MemoryContextBuilder::new(ledger).build(bot_id).await;

        let mut signals = vec![self.rule.evaluate(ind), self.score.evaluate(ind)];
        match ai.evaluate(symbol, ind, &memory).await {
            Ok(ai_signal) => signals.push(ai_signal),
            Err(err) => tracing::warn!(error = %err, "AI voter excluded from ensemble after transport failure"),
        }
        self.ensemble.combine(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_provider::StubAiProvider;
    use perpbot_ledger::DummyLedgerStore;

    fn indicators() -> MarketIndicators {
        MarketIndicators {
            price: 105_000.0,
            rsi_14: 30.0,
            ma7: 104_000.0,
            ma25: 103_000.0,
            ma99: 102_000.0,
            atr_14: 50.0,
            volume_ratio: 1.5,
            macd_histogram: 0.2,
            candle_pattern: 0.3,
            support: 103_500.0,
            resistance: 106_000.0,
            change_24h_pct: 1.2,
        }
    }

    #[tokio::test]
    async fn rule_only_generation_never_fails() {
        let generator = SignalGenerator::new(RuleSignal::new(35.0, 70.0, 1.2));
        let result = generator.generate_rule_only(&indicators());
        assert_eq!(result.individual_signals.len(), 2);
    }

    #[tokio::test]
    async fn memory_augmented_generation_blends_three_voters() {
        let provider = StubAiProvider {
            response: r#"{"signal": "LONG", "reason": "confluence"}"#.to_string(),
        };
        let ai = AiSignal::new(&provider, "test-model".to_string());
        let generator = SignalGenerator::new(RuleSignal::new(35.0, 70.0, 1.2)).with_ai(ai);
        let ledger = DummyLedgerStore;
        let result = generator
            .generate("BTCUSDT", Uuid::new_v4(), &ledger, &indicators())
            .await;
        assert_eq!(result.individual_signals.len(), 3);
        assert_eq!(result.final_signal.kind, perpbot_core::domain::SignalKind::Long);
    }

    #[tokio::test]
    async fn no_ai_provider_configured_falls_back_to_rule_only() {
        let generator = SignalGenerator::new(RuleSignal::new(35.0, 70.0, 1.2));
        let ledger = DummyLedgerStore;
        let result = generator
            .generate("BTCUSDT", Uuid::new_v4(), &ledger, &indicators())
            .await;
        assert_eq!(result.individual_signals.len(), 2);
    }
}

use crate::ai_provider::{parse_ai_reply, AiProvider, CompletionRequest};
use crate::indicators::MarketIndicators;
use perpbot_core::domain::{IndividualSignal, SignalKind};
use perpbot_core::MemoryContext;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a disciplined perpetual-futures trading assistant. \
    Reply with a single JSON object: {\"signal\": \"LONG\"|\"SHORT\"|\"WAIT\", \"reason\": <string>}.";

/// Memory-augmented AI voter. Composes `systemPrompt + memoryContext.toPrompt()
/// + marketPrompt`, calls the AI provider, and parses its reply. A transport
/// failure is returned as `Err` so the caller can drop this voter from the
/// ensemble entirely (§4.3: "when a voter throws, it is excluded"); a reply
/// that parses but carries an invalid/empty signal coerces to a WAIT vote
/// that still participates, per §4.2's "invalid returned kinds are coerced
/// to WAIT".
pub struct AiSignal<'a> {
    provider: &'a dyn AiProvider,
    model: String,
}

impl<'a> AiSignal<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn AiProvider, model: String) -> Self {
        Self { provider, model }
    }

    fn market_prompt(symbol: &str, ind: &MarketIndicators) -> String {
        format!(
            "## Market snapshot for {symbol}\n\
             price={:.2} rsi14={:.1} ma7={:.2} ma25={:.2} ma99={:.2} \
             atr14={:.2} volume_ratio={:.2} macd_hist={:.3} candle_pattern={:.2} \
             change_24h={:+.2}%\n",
            ind.price, ind.rsi_14, ind.ma7, ind.ma25, ind.ma99,
            ind.atr_14, ind.volume_ratio, ind.macd_histogram, ind.candle_pattern,
            ind.change_24h_pct
        )
    }

    /// # Errors
    /// Returns an error only when the provider call itself fails; the
    /// caller should drop this voter from the ensemble rather than vote
    /// WAIT on its behalf. An unparseable or invalid reply is not an
    /// error — it still returns `Ok` with a WAIT vote.
    pub async fn evaluate(
        &self,
        symbol: &str,
        ind: &MarketIndicators,
        memory: &MemoryContext,
    ) -> anyhow::Result<IndividualSignal> {
        let prompt = format!(
            "{DEFAULT_SYSTEM_PROMPT}\n{}\n{}",
            memory.to_prompt(),
            Self::market_prompt(symbol, ind)
        );

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt,
            temperature: 0.2,
            max_tokens: 200,
        };

        let raw = self.provider.complete(request).await?;

        let Some(reply) = parse_ai_reply(&raw) else {
            tracing::warn!(raw = %raw, "AI reply did not parse as the expected JSON shape");
            return Ok(Self::wait("unparseable reply"));
        };

        let kind = SignalKind::parse_lenient(&reply.signal);
        Ok(IndividualSignal {
            source: "ai".to_string(),
            kind,
            confidence: 0.8,
            weight: 0.4,
            reason: reply.reason.chars().take(200).collect(),
        })
    }

    fn wait(reason: &str) -> IndividualSignal {
        IndividualSignal {
            source: "ai".to_string(),
            kind: SignalKind::Wait,
            confidence: 0.0,
            weight: 0.4,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_provider::StubAiProvider;

    fn indicators() -> MarketIndicators {
        MarketIndicators {
            price: 100.0,
            rsi_14: 50.0,
            ma7: 100.0,
            ma25: 100.0,
            ma99: 100.0,
            atr_14: 1.0,
            volume_ratio: 1.0,
            macd_histogram: 0.0,
            candle_pattern: 0.0,
            support: 99.0,
            resistance: 101.0,
            change_24h_pct: 0.0,
        }
    }

    #[tokio::test]
    async fn valid_reply_becomes_a_signal() {
        let provider = StubAiProvider {
            response: r#"{"signal": "LONG", "reason": "breakout"}"#.to_string(),
        };
        let ai = AiSignal::new(&provider, "test-model".to_string());
        let result = ai
            .evaluate("BTCUSDT", &indicators(), &MemoryContext::default())
            .await
            .unwrap();
        assert_eq!(result.kind, SignalKind::Long);
        assert_eq!(result.reason, "breakout");
    }

    #[tokio::test]
    async fn garbage_reply_coerces_to_wait_without_erroring() {
        let provider = StubAiProvider {
            response: "I am not sure what to say".to_string(),
        };
        let ai = AiSignal::new(&provider, "test-model".to_string());
        let result = ai
            .evaluate("BTCUSDT", &indicators(), &MemoryContext::default())
            .await
            .unwrap();
        assert_eq!(result.kind, SignalKind::Wait);
    }
}

use serde::{Deserialize, Serialize};

/// Six narrative fields built from ledger aggregates and spliced into
/// the AI prompt. Empty when no closed trades exist for the bot yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryContext {
    pub overall_summary: String,
    pub recent_performance: String,
    pub best_conditions: String,
    pub worst_conditions: String,
    pub timing_insights: String,
    pub recommendations: String,
}

impl MemoryContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overall_summary.is_empty()
            && self.recent_performance.is_empty()
            && self.best_conditions.is_empty()
            && self.worst_conditions.is_empty()
            && self.timing_insights.is_empty()
            && self.recommendations.is_empty()
    }

    /// Renders the context as a prompt fragment. Returns an empty string
    /// when there is nothing to say, so the ensemble's AI voter behaves
    /// as if it has no memory.
    #[must_use]
    pub fn to_prompt(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(
            "## Trading history context\n\
             Overall: {}\n\
             Recent performance: {}\n\
             Best conditions: {}\n\
             Worst conditions: {}\n\
             Timing insights: {}\n\
             Recommendations: {}\n",
            self.overall_summary,
            self.recent_performance,
            self.best_conditions,
            self.worst_conditions,
            self.timing_insights,
            self.recommendations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_empty_and_renders_nothing() {
        let ctx = MemoryContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.to_prompt(), "");
    }

    #[test]
    fn populated_context_renders_a_prompt() {
        let ctx = MemoryContext {
            overall_summary: "52% win rate over 30 trades".into(),
            ..Default::default()
        };
        assert!(!ctx.is_empty());
        assert!(ctx.to_prompt().contains("52% win rate"));
    }
}

pub mod ai_provider;
pub mod ai_signal;
pub mod ensemble;
pub mod generator;
pub mod indicators;
pub mod rule_signal;
pub mod score_signal;

pub use ai_provider::{AiProvider, AiSignalReply, CompletionRequest, HttpAiProvider, StubAiProvider};
pub use ai_signal::AiSignal;
pub use ensemble::SignalEnsemble;
pub use generator::SignalGenerator;
pub use indicators::MarketIndicators;
pub use rule_signal::RuleSignal;
pub use score_signal::ScoreSignal;

use perpbot_core::domain::IndividualSignal;
use perpbot_core::BotConfig;
use tokio::sync::oneshot;

/// Messages a `BotHandle` sends into a running `BotInstance`'s mailbox.
///
/// `Stop` and `Shutdown` carry an acknowledgement channel so the sender
/// can wait for the instance to actually reach the requested state at a
/// tick boundary, rather than firing and hoping.
#[derive(Debug)]
pub enum BotCommand {
    Start,
    Stop(oneshot::Sender<()>),
    Pause,
    Resume,
    EmergencyClose,
    UpdateConfig(Box<BotConfig>),
    /// A webhook-sourced voter to fold into the next tick's ensemble
    /// vote alongside rule/score/AI (§6.3). One-shot: consumed by the
    /// first tick that runs after it arrives.
    ExternalSignal(IndividualSignal),
    Shutdown(oneshot::Sender<()>),
}

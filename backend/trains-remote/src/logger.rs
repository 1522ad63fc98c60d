use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Logs to the standard output, up to the given level.
///
/// Fails if a global subscriber was already set, e.g. by an earlier call.
pub fn init_logger(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    set_global_default(subscriber)
}

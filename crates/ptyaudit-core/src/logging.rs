//! Diagnostics for the audit layer itself
//!
//! Audit records go to the reserved descriptor; this is only the `tracing`
//! output describing what the layer is doing. It stays silent unless enabled,
//! because it shares stderr with the host program.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a stderr subscriber when `debug` is set
///
/// Returns `true` if a subscriber was installed. A subscriber that is already
/// in place is left untouched.
pub fn setup_logging(debug: bool) -> bool {
    if !debug {
        return false;
    }

    let filter = EnvFilter::new("ptyaudit=debug,ptyaudit_core=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

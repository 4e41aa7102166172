mod logging;
pub mod state;

uniffi::setup_scaffolding!();

/// Installs logging and the panic hook
/// Call this once at startup from Kotlin/Swift
#[uniffi::export]
pub fn init_logging() {
    logging::setup_logging();
}

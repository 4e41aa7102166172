use std::panic::PanicHookInfo;
use std::sync::Once;

use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type InstallError = Box<dyn std::error::Error + Send + Sync>;

/// Installs the tracing subscriber and panic hook, once per process
pub fn setup_logging() {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        let filter =
            FilterFn::new(|meta| meta.module_path().unwrap_or_default().starts_with("yus_"));
        if let Err(e) = install(filter) {
            // nothing to log through yet
            eprintln!("failed to install tracing subscriber: {e}");
        }
        std::panic::set_hook(Box::new(panic_hook));
    })
}

#[cfg(target_os = "android")]
fn install<F>(filter: FilterFn<F>) -> Result<(), InstallError>
where
    F: Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static,
{
    use tracing_logcat::{LogcatMakeWriter, LogcatTag};

    let tag = LogcatTag::Fixed("Yus-Rust".to_owned());
    let writer = LogcatMakeWriter::new(tag)?;
    let layer = tracing_subscriber::fmt::layer()
        .event_format(Format::default().with_level(false).without_time())
        .with_writer(writer)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;
    Ok(())
}

#[cfg(not(target_os = "android"))]
fn install<F>(filter: FilterFn<F>) -> Result<(), InstallError>
where
    F: Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().event_format(Format::default().with_target(true));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;
    Ok(())
}

fn panic_hook(info: &PanicHookInfo) {
    tracing::error!("{info}")
}

mod browser;
mod document;
mod fakes;
mod shop;

pub use browser::SimulatedBrowser;
pub use document::{SimulatedDocument, Slot};
pub use fakes::{FakeApi, FakeClipboard, FakeGateway, ManualClock};
pub use shop::{LANDING_URL, TestShop, sample_catalog};

/// Route `tracing` output to the test writer. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

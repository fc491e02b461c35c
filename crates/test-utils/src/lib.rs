//! Shared helpers for tierflow's integration tests.
//!
//! - [`builders`] assembles configs and plans without touching the disk.
//! - [`fake_backend`] is a scripted [`tierflow::backend::Backend`].

pub mod builders;
pub mod fake_backend;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: OnceLock<()> = OnceLock::new();

/// Default deadline for [`with_timeout`].
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). `RUST_LOG` overrides the default of
/// `tierflow=debug`.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tierflow=debug"));

        // Another harness may have installed one already; either is fine.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    within(TEST_TIMEOUT, f).await
}

/// Await `f`, panicking if it takes longer than `limit`.
pub async fn within<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("test future did not finish within {limit:?}"),
    }
}

/*! Integration tests for docfields.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - doc: Tests for registration, dirty tracking, flushing, decoding and field kinds
 * - store: Tests for the Storage trait and the in-memory store
 * - record: Tests for Record load/save and live regeneration ticks
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("docfields=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod doc;
mod helpers;
mod record;
mod store;

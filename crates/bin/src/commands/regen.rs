//! Regen command - waits for live energy ticks and saves after each one.

use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use crate::backend::Session;
use crate::cli::RegenArgs;
use crate::output::{OutputFormat, print_changes};

/// Run the regen command
pub async fn run(
    session: &mut Session,
    args: &RegenArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Writes only pending mutations; the catch-up applied on load leaves the document clean.
    print_changes(&session.commit()?, format)?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    while session.record.doc().energy.is_regenerating() {
        match timeout_at(deadline, session.record.next_tick()).await {
            Ok(true) => {
                let energy = &session.record.doc().energy;
                tracing::info!(energy = energy.get(), max = energy.max_value(), "regenerated");
                print_changes(&session.commit()?, format)?;
            }
            Ok(false) => {}
            Err(_) => {
                tracing::info!(seconds = args.seconds, "stopped waiting");
                break;
            }
        }
    }
    Ok(())
}

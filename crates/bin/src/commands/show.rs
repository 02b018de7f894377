//! Show command - prints the stored player and its live energy.

use crate::backend::Session;
use crate::output::{OutputFormat, print_document};

/// Run the show command
pub fn run(session: &Session, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let doc = session.record.doc();
    print_document(&doc.to_document()?, format)?;

    if format == OutputFormat::Human && doc.energy.is_regenerating() {
        println!(
            "Next energy in {}s ({}/{})",
            (doc.energy.remaining_millis() + 999) / 1000,
            doc.energy.get(),
            doc.energy.max_value(),
        );
    }
    Ok(())
}

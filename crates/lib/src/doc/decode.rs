//! Populating a document from a raw tagged stream.
//!
//! Decoding is best effort: a field whose payload cannot be converted keeps
//! its previous value, the failure is logged and collected in the
//! [`DecodeReport`], and decoding continues with the next element. Only a
//! malformed stream aborts.

use tracing::{trace, warn};

use super::{errors::FieldError, node::DocNode, path};
use crate::raw::{RawError, RawPayload, RawReader};

/// Outcome of a decode call that did not abort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Fields that kept their previous value
    pub errors: Vec<FieldError>,
    /// Paths present in the input but not registered
    pub skipped: Vec<String>,
}

impl DecodeReport {
    /// Returns true when every known field decoded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Why a single field failed to decode.
#[derive(Debug)]
pub(crate) enum DecodeFailure {
    /// Recorded in the report; siblings continue.
    Field(FieldError),
    /// The stream itself is broken; decoding stops.
    Stream(RawError),
}

impl From<FieldError> for DecodeFailure {
    fn from(err: FieldError) -> Self {
        DecodeFailure::Field(err)
    }
}

impl From<RawError> for DecodeFailure {
    fn from(err: RawError) -> Self {
        DecodeFailure::Stream(err)
    }
}

/// Decodes every element of `reader` into the fields of `node`.
///
/// Null payloads reset the field to its default.
pub(crate) fn decode_fields<'a>(
    node: &DocNode,
    reader: &mut (dyn RawReader<'a> + 'a),
    report: &mut DecodeReport,
) -> Result<(), RawError> {
    while let Some(element) = reader.next_element()? {
        let Some(slot) = node.slot(&element.name) else {
            let skipped = path::join(&node.full_path(), &element.name);
            trace!(path = %skipped, "skipping unknown field");
            report.skipped.push(skipped);
            continue;
        };

        let field = slot.node();
        let result = match element.payload {
            RawPayload::Null => {
                field.reset();
                Ok(())
            }
            payload => field.decode(payload, report),
        };

        match result {
            Ok(()) => {}
            Err(DecodeFailure::Field(err)) => {
                warn!(field = %field.base().full_path(), error = %err, "failed to decode field");
                report.errors.push(err);
            }
            Err(DecodeFailure::Stream(err)) => return Err(err),
        }
    }
    Ok(())
}

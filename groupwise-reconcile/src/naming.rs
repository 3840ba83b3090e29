//! Identity names as URL path segments
//!
//! Dots are swapped for `#` before percent-encoding; a literal `.` in the path makes
//! the console's routes 404 on reload.

use groupwise_core::{validation_error, GroupwiseResult};

pub fn encode_identity_name_for_url(name: &str) -> String {
    urlencoding::encode(&name.replace('.', "#")).into_owned()
}

pub fn decode_identity_name_from_url(segment: &str) -> GroupwiseResult<String> {
    let decoded = urlencoding::decode(segment).map_err(|e| {
        validation_error!(
            format!("Invalid identity segment: {}", e),
            "segment",
            "naming"
        )
    })?;
    Ok(decoded.replace('#', "."))
}

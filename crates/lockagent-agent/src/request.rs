//! Parsing of ask-password request descriptors.

use lockagent_core::LockagentResult;
use std::collections::HashMap;
use std::io::BufRead;

/// Parse a password-request file into its indexed fields.
///
/// Lines starting with `#` are comments and lines without a `=` separator
/// are skipped; neither fails the parse. Duplicate keys keep the last value.
/// Only a read error on the underlying stream is fatal.
pub fn parse_request<R: BufRead>(reader: R) -> LockagentResult<HashMap<String, String>> {
    let mut fields = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        fields.insert(key.to_string(), value.to_string());
    }
    Ok(fields)
}

/// Extract the device id from a request claimed by cryptsetup.
///
/// Returns `None` when the `Id` field is missing or carries a different
/// prefix; such requests are not for this agent.
pub fn cryptsetup_id(fields: &HashMap<String, String>) -> Option<&str> {
    fields.get("Id")?.strip_prefix("cryptsetup:")
}

//! Fuzz target: `telegram::parse_updates`
//!
//! Feeds arbitrary response bodies to the Bot API decoder.  Garbage must
//! come back as an error, never a panic.
//!
//! cargo fuzz run fuzz_update_parser

#![no_main]

use heatcycle::adapters::telegram::{parse_updates, MAX_RESPONSE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_RESPONSE {
        return;
    }
    if let Ok(updates) = parse_updates(data) {
        for update in &updates {
            if let Some(text) = update.message.as_ref().and_then(|m| m.text.as_deref()) {
                let _ = heatcycle::app::commands::RemoteCommand::parse(text);
            }
        }
    }
});

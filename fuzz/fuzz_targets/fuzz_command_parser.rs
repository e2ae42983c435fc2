//! Fuzz target: `RemoteCommand::parse`
//!
//! Arbitrary operator text must either parse to a command whose canonical
//! form parses back to itself, or be rejected.  Never panics.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use heatcycle::app::commands::RemoteCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Some(cmd) = RemoteCommand::parse(text) {
        assert_eq!(RemoteCommand::parse(cmd.as_str()), Some(cmd));
        assert!(text.contains(cmd.as_str()));
    }
});

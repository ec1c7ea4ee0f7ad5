#![no_main]
use libfuzzer_sys::fuzz_target;

use goscript::config::CompileConfig;

// Arbitrary bytes as package JSON: loading may fail, but neither loading nor
// compiling a package that validated may panic.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = goscript::compile_json(text, &CompileConfig::default());
});

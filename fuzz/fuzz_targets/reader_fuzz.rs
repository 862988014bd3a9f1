#![no_main]
use libfuzzer_sys::fuzz_target;
use oxircs::rcs::RcsFile;

fuzz_target!(|data: &[u8]| {
    // The reader must never panic, only return errors.
    if let Ok(file) = RcsFile::parse(data) {
        let _ = file.reconstruct();
    }
});

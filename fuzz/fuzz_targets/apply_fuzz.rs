#![no_main]
use libfuzzer_sys::fuzz_target;
use oxircs::delta::apply;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the split between base text and edit script.
    let split = (data[0] as usize).min(data.len() - 1);
    let (base, script) = data[1..].split_at(split);
    let _ = apply(base, script);
});

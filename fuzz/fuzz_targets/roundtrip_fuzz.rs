#![no_main]
use libfuzzer_sys::fuzz_target;
use oxircs::delta::diff_bytes;
use oxircs::rcs::{RcsDate, RcsFile, RcsHeader, RevisionNumber, RevisionRecord, State, write_rcs};

fn record(index: usize, is_head: bool) -> RevisionRecord {
    RevisionRecord {
        number: RevisionNumber::trunk(index),
        date: RcsDate(std::time::SystemTime::UNIX_EPOCH.into()),
        author: "fuzz".into(),
        log: "@@ log @".into(),
        state: State::Exp,
        branches: Vec::new(),
        next: index.checked_sub(1).map(RevisionNumber::trunk),
        is_head,
    }
}

fuzz_target!(|data: &[u8]| {
    // Split the payload into an older and a newer snapshot.
    let split = data.len() / 2;
    let (older, newer) = data.split_at(split);

    let script = diff_bytes(newer, older);
    let revisions = vec![
        (record(1, true), newer.to_vec()),
        (record(0, false), script),
    ];
    let readers = revisions
        .into_iter()
        .map(|(r, text)| (r, std::io::Cursor::new(text)))
        .collect();

    let mut out = Vec::new();
    write_rcs(&mut out, &RcsHeader::for_head(RevisionNumber::trunk(1)), readers).unwrap();

    let file = RcsFile::parse(&out).unwrap();
    let revs = file.reconstruct().unwrap();
    assert_eq!(revs[0].1, newer);
    assert_eq!(revs[1].1, older);
});

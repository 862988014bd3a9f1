use std::path::{Path, PathBuf};
use std::process::Command;

use oxircs::rcs::RcsFile;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_oxircs").to_string()
}

fn write_copies(dir: &Path) -> Vec<PathBuf> {
    let files: [(&str, &[u8]); 3] = [
        ("notes.txt.0", b"first\n"),
        ("notes.txt.1", b"first\nsecond\n"),
        ("notes.txt", b"first\nsecond\nthird @ home\n"),
    ];
    files
        .iter()
        .map(|(name, data)| {
            let path = dir.join(name);
            std::fs::write(&path, data).unwrap();
            path
        })
        .collect()
}

fn diff_available() -> bool {
    Command::new("diff")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[test]
fn cli_import_to_stdout() {
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());

    let out = Command::new(bin())
        .args(["--diff", "builtin"])
        .args(&copies)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.starts_with(b"head\t1.3;\n"));

    let revs = RcsFile::parse(&out.stdout).unwrap().reconstruct().unwrap();
    assert_eq!(revs.len(), 3);
    assert_eq!(revs[0].1, b"first\nsecond\nthird @ home\n");
    assert_eq!(revs[2].1, b"first\n");
}

#[test]
fn cli_import_to_file_requires_force() {
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());
    let dest = dir.path().join("notes.txt,v");

    let st = Command::new(bin())
        .args(["--diff", "builtin", "--verify", "-o"])
        .arg(&dest)
        .args(&copies)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(dest.exists());

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-o"])
        .arg(&dest)
        .args(&copies)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("oxircs: "), "{stderr}");
    assert!(stderr.contains("use --force"), "{stderr}");

    let st = Command::new(bin())
        .args(["--diff", "builtin", "--force", "-o"])
        .arg(&dest)
        .args(&copies)
        .status()
        .unwrap();
    assert!(st.success());
}

#[test]
fn cli_recursive_import_mirrors_tree() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("sub")).unwrap();
    write_copies(src.path());
    std::fs::write(src.path().join("sub/data.csv.3"), b"a,b\n").unwrap();
    std::fs::write(src.path().join("sub/data.csv.12"), b"a,b\n1,2\n").unwrap();

    let st = Command::new(bin())
        .args(["--diff", "builtin", "-r", "-o"])
        .arg(out.path())
        .arg(src.path())
        .status()
        .unwrap();
    assert!(st.success());

    let notes = std::fs::read(out.path().join("notes.txt,v")).unwrap();
    assert!(notes.starts_with(b"head\t1.3;"));
    let data = std::fs::read(out.path().join("sub/data.csv,v")).unwrap();
    let revs = RcsFile::parse(&data).unwrap().reconstruct().unwrap();
    assert_eq!(revs[0].1, b"a,b\n1,2\n");
    assert_eq!(revs[1].1, b"a,b\n");
}

#[test]
fn cli_recursive_needs_existing_output_dir() {
    let src = tempdir().unwrap();
    write_copies(src.path());

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-r", "-o"])
        .arg(src.path().join("missing"))
        .arg(src.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("oxircs: "));

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-r"])
        .arg(src.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn cli_recursive_rejects_ambiguous_numbers() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    std::fs::write(src.path().join("x.1"), b"one\n").unwrap();
    std::fs::write(src.path().join("x.01"), b"uno\n").unwrap();

    let res = Command::new(bin())
        .args(["--diff", "builtin", "-r", "-o"])
        .arg(out.path())
        .arg(src.path())
        .output()
        .unwrap();
    assert_eq!(res.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&res.stderr).contains("ambiguous"));
    assert!(!out.path().join("x,v").exists());
}

#[test]
fn cli_generated_info_drives_import() {
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());
    let info = dir.path().join("info.json");

    let st = Command::new(bin())
        .arg("-g")
        .arg("-o")
        .arg(&info)
        .args(&copies)
        .status()
        .unwrap();
    assert!(st.success());

    let mut doc: serde_json::Value = serde_json::from_slice(&std::fs::read(&info).unwrap()).unwrap();
    let commits = doc["history"].as_array_mut().unwrap();
    assert_eq!(commits.len(), 3);
    for commit in commits.iter_mut() {
        commit["author"] = "archivist".into();
    }
    commits[1]["log"] = "added the second line".into();
    std::fs::write(&info, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-i"])
        .arg(&info)
        .args(&copies)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let file = RcsFile::parse(&out.stdout).unwrap();
    assert!(file.deltas.iter().all(|d| d.author == "archivist"));
    let rev2 = file.text("1.2".parse().unwrap()).unwrap();
    assert_eq!(rev2.log, b"added the second line");
}

#[test]
fn cli_malformed_info_is_fatal() {
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());
    let info = dir.path().join("info.json");
    std::fs::write(&info, b"<history></history>").unwrap();

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-i"])
        .arg(&info)
        .args(&copies)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("malformed commit information"));
}

#[test]
fn cli_json_stats_on_stderr() {
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());

    let out = Command::new(bin())
        .args(["--diff", "builtin", "--json", "-o"])
        .arg(dir.path().join("notes.txt,v"))
        .args(&copies)
        .output()
        .unwrap();
    assert!(out.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(stats["command"], "import");
    assert_eq!(stats["revisions"], 3);
    assert_eq!(stats["head"], "1.3");
}

#[test]
fn cli_usage_errors() {
    let st = Command::new(bin()).output().unwrap();
    assert!(!st.status.success());

    let st = Command::new(bin()).args(["--no-such-flag", "x"]).output().unwrap();
    assert!(!st.status.success());

    let st = Command::new(bin()).args(["--diff", "magic", "x"]).output().unwrap();
    assert!(!st.status.success());
}

#[test]
fn cli_missing_snapshot_writes_nothing() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("gone,v");

    let out = Command::new(bin())
        .args(["--diff", "builtin", "-o"])
        .arg(&dest)
        .arg(dir.path().join("gone.0"))
        .arg(dir.path().join("gone"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!dest.exists());
}

#[test]
fn cli_external_diff_backend() {
    if !diff_available() {
        eprintln!("skipping: no diff program on PATH");
        return;
    }
    let dir = tempdir().unwrap();
    let copies = write_copies(dir.path());

    let out = Command::new(bin())
        .arg("--verify")
        .args(&copies)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let revs = RcsFile::parse(&out.stdout).unwrap().reconstruct().unwrap();
    assert_eq!(revs[1].1, b"first\nsecond\n");
}

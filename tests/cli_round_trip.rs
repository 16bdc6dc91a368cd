use assert_cmd::prelude::*;
use std::fs;
use std::process::{Command, Output};

fn rdelta(args: &[&str]) -> Output {
    let mut command = Command::cargo_bin("rdelta")
        .unwrap_or_else(|error| panic!("failed to locate rdelta: {error}"));
    command.args(args);
    command
        .output()
        .unwrap_or_else(|error| panic!("failed to run rdelta: {error}"))
}

#[test]
fn help_lists_the_three_subcommands() {
    let output = rdelta(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("signature"));
    assert!(stdout.contains("delta"));
    assert!(stdout.contains("patch"));
}

#[test]
fn without_a_subcommand_the_usage_is_shown() {
    let output = rdelta(&[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("Usage:"));
}

#[test]
fn signature_delta_patch_round_trip_on_disk() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let basis_path = dir.path().join("basis");
    let new_path = dir.path().join("new");
    let sig_path = dir.path().join("sig");
    let delta_path = dir.path().join("delta");
    let out_path = dir.path().join("rebuilt");

    let basis: Vec<u8> = (0u64..100_000).map(|i| (i * 37 % 256) as u8).collect();
    let mut new = basis.clone();
    new.splice(50_000..50_000, *b"inserted in the middle");
    new.extend_from_slice(b"and appended at the end");
    fs::write(&basis_path, &basis).unwrap();
    fs::write(&new_path, &new).unwrap();

    let output = rdelta(&[
        "signature",
        basis_path.to_str().unwrap(),
        sig_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "signature failed: {output:?}");

    let output = rdelta(&[
        "delta",
        sig_path.to_str().unwrap(),
        new_path.to_str().unwrap(),
        delta_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "delta failed: {output:?}");

    let delta_len = fs::metadata(&delta_path).unwrap().len();
    assert!(
        delta_len < basis.len() as u64 / 2,
        "delta should be much smaller than the file: {delta_len} bytes"
    );

    let output = rdelta(&[
        "patch",
        basis_path.to_str().unwrap(),
        delta_path.to_str().unwrap(),
        out_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "patch failed: {output:?}");

    assert_eq!(fs::read(&out_path).unwrap(), new);
}

#[test]
fn md4_rollsum_signature_round_trips() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let basis_path = dir.path().join("basis");
    let sig_path = dir.path().join("sig");
    let delta_path = dir.path().join("delta");
    let out_path = dir.path().join("rebuilt");

    let basis = vec![0x41u8; 10_000];
    fs::write(&basis_path, &basis).unwrap();

    let output = rdelta(&[
        "signature",
        "--hash",
        "md4",
        "--rollsum",
        "rollsum",
        "--block-size",
        "512",
        "--sum-size",
        "8",
        basis_path.to_str().unwrap(),
        sig_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "signature failed: {output:?}");

    let output = rdelta(&[
        "delta",
        sig_path.to_str().unwrap(),
        basis_path.to_str().unwrap(),
        delta_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let output = rdelta(&[
        "patch",
        basis_path.to_str().unwrap(),
        delta_path.to_str().unwrap(),
        out_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(fs::read(&out_path).unwrap(), basis);
}

#[test]
fn statistics_flag_reports_on_stderr() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let basis_path = dir.path().join("basis");
    let sig_path = dir.path().join("sig");
    fs::write(&basis_path, vec![9u8; 4096]).unwrap();

    let output = rdelta(&[
        "signature",
        "--statistics",
        basis_path.to_str().unwrap(),
        sig_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("signature statistics:"));
}

#[test]
fn patching_with_a_corrupt_delta_fails_cleanly() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let basis_path = dir.path().join("basis");
    let delta_path = dir.path().join("delta");
    fs::write(&basis_path, b"some basis").unwrap();
    fs::write(&delta_path, b"not a delta").unwrap();

    let output = rdelta(&[
        "patch",
        basis_path.to_str().unwrap(),
        delta_path.to_str().unwrap(),
        dir.path().join("out").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("rdelta:"));
}

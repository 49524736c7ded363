use std::process::{Command, Output};

fn ferrovis(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ferrovis"))
        .args(args)
        .env_remove("FERROVIS_WORKERS")
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs")
}

#[test]
fn prints_one_line_of_flags() {
    let out = ferrovis(&["-n", "2", "1,2,3,4,5"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "_,v,u,u,u\n");
}

#[test]
fn stream_collection_gives_the_same_line() {
    let batch = ferrovis(&["-n", "4", "0,2,6,3,4,8,30"]);
    let stream = ferrovis(&["-n", "4", "--collect", "stream", "0,2,6,3,4,8,30"]);
    assert_eq!(batch.stdout, stream.stdout);
    assert_eq!(String::from_utf8_lossy(&stream.stdout), "_,v,v,u,u,u,v\n");
}

#[test]
fn missing_input_exits_with_status_one() {
    let out = ferrovis(&["-q"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn malformed_input_fails_without_output() {
    let out = ferrovis(&["-n", "2", "1,,3"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("wrong input format"), "stderr: {stderr}");
}

#[test]
fn timings_go_to_stderr() {
    let out = ferrovis(&["-q", "-n", "3", "--timings", "5,6,7,8"]);
    assert!(out.status.success());
    // Samples 2 and 3 sit on the slope of sample 1.
    assert_eq!(String::from_utf8_lossy(&out.stdout), "_,v,u,u\n");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.trim().split(' ').count(), 3, "stderr: {stderr}");
}

#[test]
fn worker_count_from_environment() {
    let out = Command::new(env!("CARGO_BIN_EXE_ferrovis"))
        .args(["--timings", "-q", "9,1,2"])
        .env("FERROVIS_WORKERS", "2")
        .output()
        .expect("binary runs");
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.trim().split(' ').count(), 2, "stderr: {stderr}");
}

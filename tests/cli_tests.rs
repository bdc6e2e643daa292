// tests/cli_tests.rs - End-to-end runs of the logherd binary

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn logherd() -> Command {
    Command::cargo_bin("logherd").unwrap()
}

fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

const NGINX_FIXTURE: &str = "\
description: nginx error log
application: nginx
paths: [/var/log/nginx/error.log]
groks: [\"%{WORD:level} %{GREEDYDATA:rest}\"]
###
error something broke

warn first line
warn second line
";

#[test]
fn test_check_reports_document_summary() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "nginx.conf", NGINX_FIXTURE);

    logherd()
        .arg("check")
        .arg(&conf)
        .assert()
        .success()
        .stdout(predicate::str::contains("application 'nginx'"))
        .stdout(predicate::str::contains("2 example group(s)"));
}

#[test]
fn test_check_accepts_bundled_demos() {
    logherd()
        .arg("check")
        .arg("demos/nginx-error.conf")
        .arg("demos/java-app.conf")
        .assert()
        .success()
        .stdout(predicate::str::contains("application 'nginx'"))
        .stdout(predicate::str::contains("application 'orders'"));
}

#[test]
fn test_check_rejects_malformed_header() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "broken.conf", "not: valid: yaml: here\n###\nfoo\n");

    logherd()
        .arg("check")
        .arg(&conf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.conf"));
}

#[test]
fn test_render_writes_then_reports_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "nginx.conf", NGINX_FIXTURE);
    let out_dir = dir.path().join("obj");

    logherd()
        .arg("render")
        .arg(&conf)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let filter = fs::read_to_string(out_dir.join("conf/nginx-filter.conf")).unwrap();
    assert!(filter.contains("%{WORD:level}"));

    let routing = fs::read_to_string(out_dir.join("conf/routing.yml")).unwrap();
    assert!(routing.contains("/var/log/nginx/error.log"));

    logherd()
        .arg("render")
        .arg(&conf)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));
}

#[test]
fn test_render_refuses_multiple_groks() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(
        dir.path(),
        "two.conf",
        "groks: [\"%{WORD:a}\", \"%{WORD:b}\"]\n###\nfoo\n",
    );

    logherd()
        .arg("render")
        .arg(&conf)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple grok patterns"));
}

#[test]
fn test_run_replays_examples_into_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "nginx.conf", NGINX_FIXTURE);
    let log = dir.path().join("replayed.log");

    logherd()
        .arg("run")
        .arg(&conf)
        .arg("--keep-timestamps")
        .arg("--log-file")
        .arg(&log)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .success()
        .stdout(predicate::str::contains("replayed"));

    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "error something broke\nwarn first line\nwarn second line\n"
    );
}

#[test]
fn test_run_selects_one_example_group() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "nginx.conf", NGINX_FIXTURE);
    let log = dir.path().join("replayed.log");

    logherd()
        .arg("run")
        .arg(&conf)
        .arg("--example")
        .arg("1")
        .arg("--keep-timestamps")
        .arg("--log-file")
        .arg(&log)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "warn first line\nwarn second line\n"
    );
}

#[test]
fn test_run_out_of_range_example_leaves_log_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "nginx.conf", NGINX_FIXTURE);
    let log = dir.path().join("replayed.log");
    fs::write(&log, "precious\n").unwrap();

    logherd()
        .arg("run")
        .arg(&conf)
        .arg("--example")
        .arg("7")
        .arg("--truncate")
        .arg("--log-file")
        .arg(&log)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    assert_eq!(fs::read_to_string(&log).unwrap(), "precious\n");
}

#[test]
fn test_run_appends_unless_truncate() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(dir.path(), "short.conf", "groks: [\"%{WORD:w}\"]\n###\nfoo\n");
    let log = dir.path().join("replayed.log");

    for _ in 0..2 {
        logherd()
            .arg("run")
            .arg(&conf)
            .arg("--keep-timestamps")
            .arg("--log-file")
            .arg(&log)
            .arg("--out-dir")
            .arg(dir.path().join("obj"))
            .assert()
            .success();
    }
    assert_eq!(fs::read_to_string(&log).unwrap(), "foo\nfoo\n");

    logherd()
        .arg("run")
        .arg(&conf)
        .arg("--keep-timestamps")
        .arg("--truncate")
        .arg("--log-file")
        .arg(&log)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&log).unwrap(), "foo\n");
}

#[test]
fn test_run_rewrites_timestamps_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_fixture(
        dir.path(),
        "ts.conf",
        "groks: [\"%{WORD:w}\"]\ntimestamp: {find: \"\\\\d{4}-\\\\d{2}-\\\\d{2}\", replace: \"%Y-%m-%d\"}\n###\n2001-01-01 error\n",
    );
    let log = dir.path().join("replayed.log");

    let before = chrono::Local::now().format("%Y-%m-%d").to_string();
    logherd()
        .arg("run")
        .arg(&conf)
        .arg("--log-file")
        .arg(&log)
        .arg("--out-dir")
        .arg(dir.path().join("obj"))
        .assert()
        .success();
    let after = chrono::Local::now().format("%Y-%m-%d").to_string();

    let content = fs::read_to_string(&log).unwrap();
    assert!(
        content == format!("{} error\n", before) || content == format!("{} error\n", after),
        "unexpected replay output: {:?}",
        content
    );
}

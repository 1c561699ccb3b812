//! E2E: init -> sync -> show -> status -> backups -> restore, plus failure exit codes.

mod common;

use hostsync::block::BEGIN_MARKER;
use predicates::prelude::*;
use std::fs;

const LOCAL: &str = "127.0.0.1 localhost\n";

#[test]
fn e2e_happy_path() {
    let dir = common::temp_home();
    let home = dir.path().join("home");
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, LOCAL).unwrap();
    let block = common::block(&["1.2.3.4 x"]);
    let url = common::serve(common::Fixture::ok(format!("a\n{block}z\n")));
    let hosts_arg = hosts.to_str().unwrap();

    // init records the URL
    common::hostsync_cmd(&home)
        .args(["init", "--url", &url])
        .assert()
        .success();
    assert!(home.join("config.toml").is_file());

    // dry run changes nothing
    common::hostsync_cmd(&home)
        .args(["sync", "--dry-run", "--hosts-file", hosts_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("appended"));
    assert_eq!(fs::read_to_string(&hosts).unwrap(), LOCAL);

    // sync
    common::hostsync_cmd(&home)
        .args(["sync", "--hosts-file", hosts_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup:"));
    assert_eq!(fs::read_to_string(&hosts).unwrap(), format!("{LOCAL}{block}"));

    // show prints the block
    common::hostsync_cmd(&home)
        .args(["show", "--hosts-file", hosts_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.3.4 x"));

    // status has the run
    common::hostsync_cmd(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(url.as_str()))
        .stdout(predicate::str::contains("appended"));

    // backups lists one
    common::hostsync_cmd(&home)
        .args(["backups", "--hosts-file", hosts_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains(".bak"));

    // restore brings back the original
    common::hostsync_cmd(&home)
        .args(["restore", "--hosts-file", hosts_arg])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&hosts).unwrap(), LOCAL);
}

#[test]
fn fetch_failure_exit_code() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, LOCAL).unwrap();
    let url = common::serve(common::Fixture::status(404));

    common::hostsync_cmd(dir.path())
        .args(["sync", "--url", &url, "--hosts-file", hosts.to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("404"));
    assert_eq!(fs::read_to_string(&hosts).unwrap(), LOCAL);
}

#[test]
fn malformed_remote_exit_code() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, LOCAL).unwrap();
    let url = common::serve(common::Fixture::ok(format!("{BEGIN_MARKER}\n1.2.3.4 x\n")));

    common::hostsync_cmd(dir.path())
        .args(["sync", "--url", &url, "--hosts-file", hosts.to_str().unwrap()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("remote source malformed"));
    assert_eq!(fs::read_to_string(&hosts).unwrap(), LOCAL);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn missing_url_exit_code() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, LOCAL).unwrap();

    common::hostsync_cmd(&dir.path().join("home"))
        .args(["sync", "--hosts-file", hosts.to_str().unwrap()])
        .assert()
        .code(9)
        .stderr(predicate::str::contains("no source URL"));
}

#[test]
fn url_from_env() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, LOCAL).unwrap();
    let url = common::serve(common::Fixture::ok(common::block(&["5.6.7.8 y"])));

    common::hostsync_cmd(&dir.path().join("home"))
        .env("HOSTSYNC_URL", &url)
        .env("HOSTSYNC_HOSTS_FILE", &hosts)
        .arg("sync")
        .assert()
        .success();
    assert!(fs::read_to_string(&hosts).unwrap().contains("5.6.7.8 y"));
}

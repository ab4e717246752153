use std::fs;
use tempfile::tempdir;

#[test]
fn merge_requires_a_configured_remote() {
    let tmp = tempdir().expect("tempdir");
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).expect("mkdir data");

    assert_cmd::cargo::cargo_bin_cmd!("tsmerge")
        .current_dir(tmp.path())
        .env("TSMERGE_DATA_DIR", &data_dir)
        // point at a nonexistent config so a developer's real one cannot leak in
        .env("TSMERGE_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env_remove("TSMERGE_BASE_URL")
        .env_remove("TSMERGE_COMPANY")
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicates::str::contains("base_url"));
}

#[test]
fn merge_requires_credentials_once_remote_is_configured() {
    let tmp = tempdir().expect("tempdir");
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).expect("mkdir data");

    assert_cmd::cargo::cargo_bin_cmd!("tsmerge")
        .current_dir(tmp.path())
        .env("TSMERGE_DATA_DIR", &data_dir)
        .env("TSMERGE_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env("TSMERGE_BASE_URL", "https://timesheets.example.com")
        .env("TSMERGE_COMPANY", "ACME")
        .env_remove("TSMERGE_USERNAME")
        .env_remove("TSMERGE_PASSWORD")
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicates::str::contains("TSMERGE_USERNAME"));
}

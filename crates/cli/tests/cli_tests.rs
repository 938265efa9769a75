use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn blogpix_cmd(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blogpix").expect("Failed to find blogpix binary");
    cmd.arg("--config").arg(config_dir.join("config.toml"));
    cmd
}

fn photo_dir(names: &[&str]) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temporary directory");
    for name in names {
        fs::write(temp.path().join(name), b"not a real jpeg").expect("write photo");
    }
    temp
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn rename_dry_run_prints_plan_and_leaves_files() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG", "P1000002.JPG"]);

    blogpix_cmd(config.path())
        .args(["rename", "--dry-run", "--key", "modified"])
        .arg(photos.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("P1000001.JPG ->"))
        .stdout(predicate::str::contains("planned=2"))
        .stderr(predicate::str::contains("dry-run"));

    assert_eq!(
        file_names(photos.path()),
        vec!["P1000001.JPG".to_string(), "P1000002.JPG".to_string()]
    );
}

#[test]
fn rename_by_modified_time_gives_unique_timestamp_names() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG", "P1000002.JPG", "P1000003.JPG"]);

    blogpix_cmd(config.path())
        .args(["rename", "--key", "modified"])
        .arg(photos.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("適用完了: 3件"));

    let names = file_names(photos.path());
    assert_eq!(names.len(), 3);
    for name in &names {
        assert!(name.ends_with(".jpg"), "unexpected name {name}");
        assert!(!name.starts_with('P'), "file was not renamed: {name}");
    }
}

#[test]
fn rename_leaves_files_without_capture_time_alone() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG", "P1000002.JPG"]);

    blogpix_cmd(config.path())
        .args(["rename", "--key", "exif"])
        .arg(photos.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown_date=2"))
        .stderr(predicate::str::contains("適用完了: 0件 (変更なし 2件)"));

    assert_eq!(
        file_names(photos.path()),
        vec!["P1000001.JPG".to_string(), "P1000002.JPG".to_string()]
    );
}

#[test]
fn rename_twice_leaves_renamed_folder_alone() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG", "P1000002.JPG", "P1000003.JPG"]);
    let shot = SystemTime::UNIX_EPOCH + Duration::from_secs(1_400_000_000);
    for name in file_names(photos.path()) {
        fs::File::options()
            .write(true)
            .open(photos.path().join(name))
            .and_then(|file| file.set_modified(shot))
            .expect("set mtime");
    }

    blogpix_cmd(config.path())
        .args(["rename", "--key", "modified"])
        .arg(photos.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("適用完了: 3件"));
    let renamed = file_names(photos.path());

    blogpix_cmd(config.path())
        .args(["rename", "--key", "modified"])
        .arg(photos.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("suffixed=0"))
        .stderr(predicate::str::contains("適用完了: 0件 (変更なし 3件)"));
    assert_eq!(file_names(photos.path()), renamed);
}

#[test]
fn rename_json_output_lists_entries() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG"]);

    let output = blogpix_cmd(config.path())
        .args(["rename", "--dry-run", "--output", "json", "--extension", "jpeg"])
        .arg(photos.path().join("P1000001.JPG"))
        .output()
        .expect("run blogpix");
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json plan");
    assert_eq!(plan["extension"], "jpeg");
    assert_eq!(plan["entries"].as_array().map(Vec::len), Some(1));
    assert_eq!(plan["entries"][0]["key"], "0000-00-00 00-00-00");
    assert_eq!(plan["entries"][0]["changed"], false);
}

#[test]
fn rename_rejects_missing_path() {
    let config = TempDir::new().expect("config dir");
    let photos = photo_dir(&["P1000001.JPG"]);

    blogpix_cmd(config.path())
        .arg("rename")
        .arg(photos.path().join("P1000001.JPG"))
        .arg(photos.path().join("missing.JPG"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.JPG"));

    assert_eq!(file_names(photos.path()), vec!["P1000001.JPG".to_string()]);
}

#[test]
fn tags_render_html_for_each_list_line() {
    let config = TempDir::new().expect("config dir");
    let local = TempDir::new().expect("local dir");
    let month = local.path().join("201403");
    fs::create_dir_all(&month).expect("mkdir");
    image::RgbImage::new(30, 40)
        .save(month.join("2014-03-09 10.11.12.png"))
        .expect("save png");

    let list = local.path().join("list.txt");
    fs::write(&list, "2014-03-09 10.11.12.png\tOn the ferry\n").expect("write list");

    blogpix_cmd(config.path())
        .arg("tags")
        .arg(&list)
        .arg("--local-dir")
        .arg(local.path())
        .args(["--bucket", "my-blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://s3.amazonaws.com/my-blog/2014-03-09+10.11.12.png",
        ))
        .stdout(predicate::str::contains(r#"width="240""#))
        .stdout(predicate::str::contains(r#"height="320""#))
        .stdout(predicate::str::contains("On the ferry"));
}

#[test]
fn upload_requires_bucket_then_credentials() {
    let config = TempDir::new().expect("config dir");
    let local = TempDir::new().expect("local dir");
    let list = local.path().join("list.txt");
    fs::write(&list, "2014-03-09 10.11.12.jpg\n").expect("write list");

    blogpix_cmd(config.path())
        .arg("upload")
        .arg(&list)
        .arg("--local-dir")
        .arg(local.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("バケット名が設定されていません"));

    blogpix_cmd(config.path())
        .arg("upload")
        .arg(&list)
        .arg("--local-dir")
        .arg(local.path())
        .args(["--bucket", "my-blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("認証情報"));
}

#[test]
fn config_show_masks_secret_key() {
    let config = TempDir::new().expect("config dir");
    fs::write(
        config.path().join("config.toml"),
        "access_key = \"AKIDEXAMPLE\"\nsecret_key = \"do-not-print\"\n",
    )
    .expect("write config");

    blogpix_cmd(config.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AKIDEXAMPLE"))
        .stdout(predicate::str::contains("do-not-print").not());
}

#[test]
fn config_init_then_show() {
    let config = TempDir::new().expect("config dir");

    blogpix_cmd(config.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.path().join("config.toml").exists());

    blogpix_cmd(config.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url = \"https://s3.amazonaws.com\""))
        .stdout(predicate::str::contains("key_source = \"exif\""));

    blogpix_cmd(config.path())
        .args(["config", "init"])
        .assert()
        .failure();
}

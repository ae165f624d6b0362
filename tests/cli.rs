#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const PURIFY_SCRIPT: &str = r#"css="$1"
shift
while [ "$#" -gt 0 ]; do
  if [ "$1" = "--out" ]; then
    out="$2"
    shift
  fi
  shift
done
sed 's/\.unused{[^}]*}//g' "$css" > "$out"
"#;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn purifies_an_emitted_build() {
    let temp = tempdir().expect("failed to create temp dir");
    let root = temp.path();
    let dist = root.join("dist");
    let script = root.join("purify.sh");

    write(&script, PURIFY_SCRIPT);
    write(&root.join("src/index.js"), "document.body.className = 'used'");
    write(&dist.join("main.css"), ".used{color:red}.unused{color:blue}");
    write(&dist.join("main.js"), "console.log('main')");
    write(&dist.join("vendor.css"), ".unused{color:blue}");
    write(
        &root.join("build.json"),
        r#"{
      "entry": { "main": "./src/index.js" },
      "chunks": [
        {
          "name": "main",
          "files": ["main.css?abc", "main.js"],
          "modules": [{ "resource": "src/index.js" }]
        },
        { "name": "vendor", "files": ["vendor.css"] }
      ],
      "modules": [{ "resource": "src/index.js" }]
    }"#,
    );
    write(
        &root.join("purify.config.yaml"),
        "paths:\n  main: src\nmoduleExtensions:\n  - .js\nstyleExtensions:\n  - main.css\n",
    );

    let output = Command::new(env!("CARGO_BIN_EXE_purify-chunks"))
        .current_dir(root)
        .args(["--manifest", "build.json", "--output-dir", "dist"])
        .args(["--purifier", "sh", "--purifier-arg"])
        .arg(&script)
        .output()
        .expect("failed to run purify-chunks");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let purified = fs::read_to_string(dist.join("main.css")).unwrap();
    assert_eq!(purified.trim_end(), ".used{color:red}");
    assert_eq!(fs::read_to_string(dist.join("vendor.css")).unwrap(), ".unused{color:blue}");
    assert_eq!(fs::read_to_string(dist.join("main.js")).unwrap(), "console.log('main')");
}

#[test]
fn rejects_unknown_options() {
    let temp = tempdir().expect("failed to create temp dir");
    let root = temp.path();
    write(&root.join("build.json"), r#"{ "chunks": [] }"#);
    write(&root.join("options.json"), r#"{ "paths": [], "purge": true }"#);

    let output = Command::new(env!("CARGO_BIN_EXE_purify-chunks"))
        .current_dir(root)
        .args(["--manifest", "build.json", "--output-dir", ".", "--config", "options.json"])
        .output()
        .expect("failed to run purify-chunks");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown field `purge`"));
}

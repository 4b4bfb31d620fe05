//! End-to-end tests for the `xyo-cc` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("xyo-cc");
    cmd.env_remove("XYO_COMPILE_DEBUG")
        .env_remove("XYO_COMPILE_DEFINE")
        .env_remove("CC")
        .env_remove("CXX");
    cmd
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("source")).unwrap();
    for file in ["hello.cpp", "hello.hpp"] {
        fs::copy(
            Path::new("tests/fixtures/source").join(file),
            dir.path().join("source").join(file),
        )
        .unwrap();
    }
    dir
}

// ============================================================================
// Informational options
// ============================================================================

#[test]
fn no_arguments_prints_usage() {
    cmd()
        .assert()
        .success()
        .stdout(contains("C/C++ Compiler Command Driver"))
        .stdout(contains("--output-bin-path=path"));
}

#[test]
fn version_and_license() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(format!("version {}", env!("CARGO_PKG_VERSION"))));
    cmd().arg("--license").assert().success().stdout(contains("Apache License"));
}

#[test]
fn info_option_wins_over_earlier_build_options() {
    cmd()
        .args(["--exe", "--src-cpp=missing.cpp", "--usage"])
        .assert()
        .success()
        .stdout(contains("options:"));
}

// ============================================================================
// Option errors
// ============================================================================

#[test]
fn missing_target_fails() {
    cmd()
        .arg("--project=demo")
        .assert()
        .code(1)
        .stderr(contains("Error: no exe/dll/lib specified to compile"));
}

#[test]
fn empty_option_value_fails() {
    cmd()
        .args(["--exe", "--src-cpp="])
        .assert()
        .code(1)
        .stderr(contains("Error: src-cpp file not provided"));
}

#[test]
fn missing_argument_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("@input/none.arguments")
        .assert()
        .code(1)
        .stderr(contains("Error: file not found - input/none.arguments"));
}

#[test]
fn malformed_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.json"), "{ \"project\": \"x\", }").unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("@bad.json")
        .assert()
        .code(1)
        .stderr(contains("json file load - bad.json"));
}

#[test]
fn empty_manifest_is_not_an_empty_command_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.json"), "{}").unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("@empty.json")
        .assert()
        .code(1)
        .stderr(contains("Error: no exe/dll/lib specified to compile"));
}

#[cfg(unix)]
#[test]
fn huge_thread_count_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.cpp"), "").unwrap();
    cmd()
        .current_dir(dir.path())
        .env("CXX", "true")
        .args(["--exe", "--src-cpp=a.cpp", "--threads=9223372036854775807"])
        .assert()
        .success()
        .stdout(contains("[1/1]"));
}

#[test]
fn manifest_with_wrong_field_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.json"), r#"{ "project": "x", "cppSource": "a.cpp" }"#).unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("@x.json")
        .assert()
        .code(1)
        .stderr(contains("Error: json syntax - cppSource - x.json"));
}

#[test]
fn missing_source_fails_before_anything_runs() {
    let dir = workspace();
    cmd()
        .current_dir(dir.path())
        .args(["--exe", "--source-path=source", "--src-cpp=nope.cpp"])
        .assert()
        .code(1)
        .stderr(contains("Error: file not found nope.cpp"));
    assert!(!dir.path().join("temp").exists());
}

#[test]
fn build_without_sources_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--lib", "--project=demo"])
        .assert()
        .code(1)
        .stderr(contains("Error: no c/cpp source for library demo"));
}

// ============================================================================
// Builds with a stand-in compiler
// ============================================================================

#[cfg(unix)]
mod with_fake_compiler {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes the file named after `-o` in its response file and logs the call.
    const FAKE_CXX: &str = r#"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        @*) rsp="${arg#@}" ;;
    esac
done
echo "$rsp" >> "$(dirname "$0")/calls.log"
out=$(awk '{ for (i = 1; i < NF; i++) if ($i == "-o") { print $(i + 1); exit } }' "$rsp" | tr -d '"')
[ -n "$FAKE_CXX_FAIL" ] && case "$rsp" in *"$FAKE_CXX_FAIL"*) exit 7 ;; esac
mkdir -p "$(dirname "$out")"
echo built > "$out"
"#;

    fn fake_compiler(dir: &Path) -> String {
        let path = dir.join("fake-cxx.sh");
        fs::write(&path, FAKE_CXX).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn build(dir: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
        cmd()
            .current_dir(dir)
            .env("CXX", fake_compiler(dir))
            .args([
                "--exe",
                "--project=hello",
                "--source-path=source",
                "--src-hpp=hello.hpp",
                "--src-cpp=hello.cpp",
                "--output-bin-path=out",
            ])
            .args(extra)
            .assert()
    }

    #[test]
    fn executable_is_compiled_then_linked() {
        let dir = workspace();
        build(dir.path(), &[])
            .success()
            .stdout(contains("[1/1]"))
            .stdout(contains("hello.o2elf"));

        assert!(dir.path().join("out/hello").is_file());
        let calls = calls(dir.path());
        assert_eq!(calls.len(), 2, "{calls:?}");
        assert!(calls[0].ends_with("hello.cpp2o"), "{calls:?}");
        assert!(calls[1].ends_with("hello.o2elf"), "{calls:?}");

        let flags = fs::read_to_string(dir.path().join(&calls[0])).unwrap();
        assert!(flags.contains("-D\"HELLO_INTERNAL\""), "{flags}");
        assert!(flags.contains("-DXYO_COMPILE_RELEASE"), "{flags}");
    }

    #[test]
    fn force_make_rebuilds() {
        let dir = workspace();
        build(dir.path(), &[]).success();
        build(dir.path(), &["--force-make"]).success();
        assert_eq!(calls(dir.path()).len(), 4);
    }

    #[test]
    fn compiler_failure_reports_artifact() {
        let dir = workspace();
        cmd()
            .current_dir(dir.path())
            .env("CXX", fake_compiler(dir.path()))
            .env("FAKE_CXX_FAIL", "cpp2o")
            .args(["--exe", "--project=hello", "--source-path=source", "--src-cpp=hello.cpp"])
            .assert()
            .code(1)
            .stderr(contains("Error: building executable hello"));
        assert!(!dir.path().join("hello").exists());
    }

    #[test]
    fn debug_environment_selects_debug_profile() {
        let dir = workspace();
        cmd()
            .current_dir(dir.path())
            .env("CXX", fake_compiler(dir.path()))
            .env("XYO_COMPILE_DEBUG", "1")
            .env("XYO_COMPILE_DEFINE", "EXTRA_ONE  EXTRA_TWO")
            .args(["--exe", "--project=hello", "--source-path=source", "--src-cpp=hello.cpp"])
            .assert()
            .success();

        let calls = calls(dir.path());
        let flags = fs::read_to_string(dir.path().join(&calls[0])).unwrap();
        assert!(flags.contains("-DXYO_COMPILE_DEBUG"), "{flags}");
        assert!(flags.contains("-D\"EXTRA_ONE\""), "{flags}");
        assert!(flags.contains("-D\"EXTRA_TWO\""), "{flags}");
    }

    #[test]
    fn argument_file_drives_the_build() {
        let dir = workspace();
        fs::create_dir_all(dir.path().join("input")).unwrap();
        fs::copy(
            "tests/fixtures/input/xyo-cc-x.compile.arguments",
            dir.path().join("input/xyo-cc-x.compile.arguments"),
        )
        .unwrap();

        cmd()
            .current_dir(dir.path())
            .env("CXX", fake_compiler(dir.path()))
            .args(["@input/xyo-cc-x.compile.arguments", "--output-bin-path=output/test"])
            .assert()
            .success();
        assert!(dir.path().join("output/test/xyo-cc-x").is_file());
    }
}

#![allow(clippy::disallowed_methods)]

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use stitch::config::Config;
use stitch::module::ModuleId;
use stitch::orchestrator::BundleOrchestrator;

/// Write `files` (relative path, contents) below `root`
fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}

fn config(src: PathBuf, entry: &str, output: PathBuf) -> Config {
    Config {
        src,
        entry: ModuleId::parse(entry).unwrap(),
        output,
        extension: "js".to_owned(),
    }
}

fn bundle_tree(files: &[(&str, &str)], entry: &str) -> String {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), files);
    let bundler = BundleOrchestrator::new(config(
        temp_dir.path().to_path_buf(),
        entry,
        temp_dir.path().join("unused.js"),
    ));
    bundler.bundle_to_string().unwrap()
}

/// `node` is only needed to execute bundles; tests that need it are skipped without it
fn node_available() -> bool {
    Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run a bundle with node and return (stdout, stderr, exit_code)
fn run_bundle(bundle: &str) -> (String, String, i32) {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("bundle.js");
    fs::write(&script, bundle).unwrap();

    let output = Command::new("node")
        .arg(&script)
        .output()
        .expect("Failed to execute node");
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn test_function_export_is_callable_from_entry() {
    let bundle = bundle_tree(
        &[
            ("a.js", "export function foo(){return 1;}"),
            (
                "main.js",
                "import { foo } from './a.js'; console.log(foo());",
            ),
        ],
        "./main.js",
    );

    assert!(bundle.contains("__define(\"./a.js\""));
    assert!(bundle.contains("__define(\"./main.js\""));
    assert!(bundle.trim_end().ends_with("__require(\"./main.js\");\n})();"));

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    assert_eq!(stdout, "1\n");
}

#[test]
fn test_registrations_follow_discovery_order() {
    let bundle = bundle_tree(
        &[
            ("main.js", ""),
            ("a/b.js", ""),
            ("a.js", ""),
            ("z.js", ""),
        ],
        "./main.js",
    );

    let order: Vec<&str> = bundle
        .lines()
        .filter_map(|line| line.strip_prefix("__define(\""))
        .filter_map(|rest| rest.split('"').next())
        .collect();
    assert_eq!(order, vec!["./a.js", "./a/b.js", "./main.js", "./z.js"]);
}

#[test]
fn test_bundle_is_byte_identical_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    write_tree(
        &src,
        &[
            ("main.js", "import { a } from './a.js';\nconsole.log(a);\n"),
            ("a.js", "export const a = 'a';\n"),
            ("lib/util.js", "export function util() {}\n"),
        ],
    );

    let first = temp_dir.path().join("first.js");
    let second = temp_dir.path().join("second.js");
    BundleOrchestrator::new(config(src.clone(), "main.js", first.clone()))
        .bundle()
        .unwrap();
    BundleOrchestrator::new(config(src, "main.js", second.clone()))
        .bundle()
        .unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

#[test]
fn test_repeated_require_returns_same_exports_and_evaluates_once() {
    let bundle = bundle_tree(
        &[
            (
                "counter.js",
                "globalThis.evaluations = (globalThis.evaluations || 0) + 1;\nexport const stamp = {};\n",
            ),
            (
                "main.js",
                "const first = require('./counter.js');\nconst second = require('./counter.js');\nimport { stamp } from './counter.js';\nconsole.log(first === second, first.stamp === stamp, globalThis.evaluations);\n",
            ),
        ],
        "./main.js",
    );

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    assert_eq!(stdout, "true true 1\n");
}

#[test]
fn test_circular_requires_terminate_with_partial_exports() {
    let files = [
        (
            "a.js",
            "import bExports from './b.js';\nexport const a = 'A';\nexport function seeB() { return bExports.sawDuringLoad; }\n",
        ),
        (
            "b.js",
            "import aExports from './a.js';\nexport const sawDuringLoad = String(aExports.a);\nexport function seeA() { return aExports.a; }\n",
        ),
        (
            "main.js",
            "import { seeB } from './a.js';\nimport { seeA } from './b.js';\nconsole.log(seeB(), seeA());\n",
        ),
    ];
    let bundle = bundle_tree(&files, "./main.js");

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    // b.js ran while a.js was still evaluating, so it saw a.js before its exports were set
    assert_eq!(stdout, "undefined A\n");
}

#[test]
fn test_cycle_entered_from_either_side_terminates() {
    let files = [
        ("a.js", "import b from './b.js';\nexport const name = 'a';\nconsole.log('a sees', b.name);\n"),
        ("b.js", "import a from './a.js';\nexport const name = 'b';\nconsole.log('b sees', a.name);\n"),
    ];

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    for (entry, expected) in [
        ("./a.js", "b sees undefined\na sees b\n"),
        ("./b.js", "a sees undefined\nb sees a\n"),
    ] {
        let (stdout, stderr, code) = run_bundle(&bundle_tree(&files, entry));
        assert_eq!(code, 0, "bundle failed: {stderr}");
        assert_eq!(stdout, expected);
    }
}

#[test]
fn test_unregistered_module_throws_when_required() {
    let bundle = bundle_tree(
        &[("main.js", "import { x } from './missing.js';\nconsole.log('unreachable');\n")],
        "./main.js",
    );

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_ne!(code, 0);
    assert_eq!(stdout, "");
    assert!(
        stderr.contains("Cannot find module './missing.js'"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_factory_may_replace_module_exports() {
    let bundle = bundle_tree(
        &[
            (
                "greet.js",
                "module.exports = function greet(name) { return 'hello ' + name; };\n",
            ),
            (
                "main.js",
                "import greet from './greet.js';\nconsole.log(typeof greet, greet('class'), greet === require('./greet.js'));\n",
            ),
        ],
        "./main.js",
    );

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    assert_eq!(stdout, "function hello class true\n");
}

#[test]
fn test_throwing_factory_is_not_evaluated_again() {
    let bundle = bundle_tree(
        &[
            (
                "flaky.js",
                "globalThis.flakyRuns = (globalThis.flakyRuns || 0) + 1;\nexports.before = 'set';\nthrow new Error('boom');\n",
            ),
            (
                "main.js",
                "try { require('./flaky.js'); } catch (error) { console.log('caught', error.message); }\nconst first = require('./flaky.js');\nconst second = require('./flaky.js');\nconsole.log(first.before, first === second, globalThis.flakyRuns);\n",
            ),
        ],
        "./main.js",
    );

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    // The record stays in the evaluating state and keeps handing out the partial exports
    assert_eq!(stdout, "caught boom\nset true 1\n");
}

#[test]
fn test_default_export_is_evaluated_but_not_exported() {
    let bundle = bundle_tree(
        &[
            ("value.js", "export default 42;\nexport const named = 7;\n"),
            (
                "main.js",
                "import value from './value.js';\nconsole.log(Object.keys(value).join(','), value.named);\n",
            ),
        ],
        "./main.js",
    );
    assert!(bundle.contains("/* export default removed */ 42;"));

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    assert_eq!(stdout, "named 7\n");
}

#[test]
fn test_classroom_fixture() {
    let fixture = PathBuf::from("tests/fixtures/classroom");
    if !fixture.join("main.js").exists() {
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("script.js");
    let report = BundleOrchestrator::new(config(fixture, "./main.js", output.clone()))
        .bundle()
        .unwrap();
    assert_eq!(report.modules, 4);

    let bundle = fs::read_to_string(&output).unwrap();
    assert!(bundle.contains("__define(\"./board/slots.js\""));
    assert!(bundle.contains("exports.showToast = showToast;"));
    assert!(!bundle.contains("export {"));

    if !node_available() {
        eprintln!("node not found, skipping execution");
        return;
    }
    let (stdout, stderr, code) = run_bundle(&bundle);
    assert_eq!(code, 0, "bundle failed: {stderr}");
    assert_eq!(
        stdout,
        "* Lunch menu\n  Football tournament on Friday\ntoast: Football to…\n"
    );
}

#[test]
fn test_export_rename_fails_the_build() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(
        temp_dir.path(),
        &[("main.js", "export const X = 5; export { X as Y };")],
    );
    let bundler = BundleOrchestrator::new(config(
        temp_dir.path().to_path_buf(),
        "main.js",
        temp_dir.path().join("out.js"),
    ));

    let error = bundler.bundle().unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("./main.js"), "{message}");
    assert!(message.contains("X as Y"), "{message}");
    assert!(!temp_dir.path().join("out.js").exists());
}

#[test]
fn test_missing_entry_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    let output = temp_dir.path().join("out.js");

    let error = BundleOrchestrator::new(config(src, "main.js", output.clone()))
        .bundle()
        .unwrap_err();

    assert!(format!("{error:#}").contains("./main.js"));
    assert!(!output.exists());
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

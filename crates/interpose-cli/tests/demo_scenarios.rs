//! Integration tests for the demo harness.
//!
//! Drives the same code paths as `interpose demo` and `interpose describe`.

use std::sync::Arc;

use interpose_cli::config::load_options;
use interpose_cli::demo::{self, MyClass, MyIntInterface, MyInterface, Scenario};
use interpose_cli::output::descriptor_lines;
use interpose_engine::{
    EngineOptions, Hook, HookEvent, ProxyGenerator, RecordingInterceptor,
};

// ────────────────────────────────────────────────────────────────────────────
// Scenarios
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_text_scenario_returns_answer() {
    let generator = ProxyGenerator::default();
    let target = Arc::new(MyClass::new());
    let recorder = Arc::new(RecordingInterceptor::new());

    let result = demo::run(&generator, Scenario::Text, Arc::clone(&target), recorder.clone()).unwrap();

    assert_eq!(result, "123");
    assert_eq!(target.calls(), 1);
    assert_eq!(recorder.events(), vec![HookEvent::Before, HookEvent::After]);
}

#[test]
fn test_integer_scenario_returns_answer() {
    let generator = ProxyGenerator::default();
    let target = Arc::new(MyClass::new());
    let recorder = Arc::new(RecordingInterceptor::new());

    let result =
        demo::run(&generator, Scenario::Integer, Arc::clone(&target), recorder.clone()).unwrap();

    assert_eq!(result, "123");
    assert_eq!(target.calls(), 1);
    assert_eq!(recorder.count(HookEvent::Before), 1);
    assert_eq!(recorder.count(HookEvent::After), 1);
}

#[test]
fn test_rejecting_before_hook_skips_target() {
    let generator = ProxyGenerator::default();
    let target = Arc::new(MyClass::new());
    let recorder = Arc::new(RecordingInterceptor::new().fail_before("denied"));

    let err = demo::run(&generator, Scenario::Text, Arc::clone(&target), recorder.clone()).unwrap_err();

    assert!(err.is_hook_failure(Hook::Before));
    assert_eq!(target.calls(), 0);
    assert_eq!(recorder.events(), vec![HookEvent::Before]);
}

#[test]
fn test_scenarios_reuse_factories() {
    let generator = ProxyGenerator::default();
    let target = Arc::new(MyClass::new());
    for _ in 0..3 {
        demo::run(&generator, Scenario::Text, Arc::clone(&target), Arc::new(RecordingInterceptor::new())).unwrap();
        demo::run(&generator, Scenario::Integer, Arc::clone(&target), Arc::new(RecordingInterceptor::new())).unwrap();
    }
    assert_eq!(generator.synthesizer().len(), 2);
    assert_eq!(target.calls(), 6);
    // Every proxy was dropped at the end of its scenario
    assert!(generator.bindings().is_empty());
}

// ────────────────────────────────────────────────────────────────────────────
// Describe
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_describe_lines() {
    let generator = ProxyGenerator::default();
    let text = descriptor_lines(&generator.describe::<dyn MyInterface>().unwrap());
    let int = descriptor_lines(&generator.describe::<dyn MyIntInterface>().unwrap());

    assert_eq!(text.len(), 2);
    assert!(text[0].starts_with("MyInterface ["));
    assert!(text[1].contains("my_method(foo: String, bar: String) -> String"));
    assert!(int[1].contains("bar: i32"));
}

// ────────────────────────────────────────────────────────────────────────────
// Config
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_load_options_defaults_without_path() {
    assert_eq!(load_options(None).unwrap(), EngineOptions::default());
}

#[test]
fn test_load_options_from_file() {
    let dir = std::env::temp_dir().join(format!("interpose-cli-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("engine.toml");
    std::fs::write(&path, "allow_dynamic_contracts = false\n").unwrap();

    let options = load_options(Some(&path)).unwrap();
    assert!(!options.allow_dynamic_contracts);
    assert_eq!(options.max_methods_per_contract, EngineOptions::new().max_methods_per_contract);

    std::fs::write(&path, "allow_dynamic_contracts = \"maybe\"\n").unwrap();
    assert!(load_options(Some(&path)).is_err());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_load_options_missing_file() {
    let path = std::env::temp_dir().join("interpose-cli-test-missing/engine.toml");
    let err = load_options(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

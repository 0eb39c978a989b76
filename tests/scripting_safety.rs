use std::sync::Arc;

use ecc_control::driver::MockDriver;
use ecc_control::scripting::{RhaiEngine, ScriptError};
use ecc_control::DeviceBinding;

#[test]
fn test_simple_script() {
    let mut engine = RhaiEngine::new();
    let result = engine.execute_script("5 + 5").unwrap();
    assert_eq!(result.as_int().unwrap(), 10);
}

#[test]
fn test_safety_limit() {
    let mut engine = RhaiEngine::new();
    let infinite_loop = "loop { }";
    let result = engine.execute_script(infinite_loop);

    assert!(result.is_err());
    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("Safety limit exceeded"), "{}", err_msg);
}

#[test]
fn test_safety_limit_stops_stepping_loop() {
    let driver = Arc::new(MockDriver::new(1));
    let binding = Arc::new(DeviceBinding::new(driver.clone()));
    let mut engine = RhaiEngine::with_device(binding, 500);

    let result = engine.execute_script(
        r#"
        let dev = ecc.connect(0);
        loop { dev.step_forward(0); }
    "#,
    );

    assert!(matches!(result, Err(ScriptError::RuntimeError { .. })));
    let steps = driver.steps(1, 0);
    assert!(steps > 0 && steps < 500, "steps = {}", steps);
}

#[test]
fn test_script_validation() {
    let engine = RhaiEngine::new();

    // Valid script
    assert!(engine.validate_script("let x = 10;").is_ok());

    // Invalid syntax
    assert!(engine.validate_script("let x = ;").is_err());
}

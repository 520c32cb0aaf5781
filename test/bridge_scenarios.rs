//! Bridge Scenario Tests
//!
//! End-to-end checks of the import / probe / execute protocol as a native
//! acceptance program would use it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use once_cell::sync::OnceCell;
use polybridge::{
    Arity, Bridge, Capability, ForeignError, ForeignValue, HostArray, HostObject, InteropError,
    Invoker, SymbolRegistry,
};

/// Outcome of the fixture-style branch
#[derive(Debug, PartialEq)]
enum Branch {
    Executable,
    NotExecutable,
}

fn fixture(bridge: &Bridge) -> Result<Branch, InteropError> {
    let handle = bridge.import("foreign")?;
    if bridge.is_executable(&handle) {
        Ok(Branch::Executable)
    } else {
        Ok(Branch::NotExecutable)
    }
}

fn counted(arity: Arity, calls: &Arc<AtomicUsize>) -> ForeignValue {
    let calls = Arc::clone(calls);
    ForeignValue::executable(arity, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(ForeignValue::from(true))
    })
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_a_executable_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = SymbolRegistry::new();
    registry.register("foreign", counted(Arity::Exact(0), &calls));
    let bridge = Bridge::new(registry);

    assert_eq!(fixture(&bridge).unwrap(), Branch::Executable);

    let handle = bridge.import("foreign").unwrap();
    assert!(bridge.probe(&handle, Capability::Executable));
    let result = bridge.execute(&handle, &[]).unwrap();
    assert!(matches!(
        result.value().as_primitive(),
        Some(polybridge::Primitive::Bool(true))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scenario_b_primitive_not_executable() {
    let mut registry = SymbolRegistry::new();
    registry.register("foreign", ForeignValue::from(13i64));
    let bridge = Bridge::new(registry);

    assert_eq!(fixture(&bridge).unwrap(), Branch::NotExecutable);

    let handle = bridge.import("foreign").unwrap();
    assert!(!bridge.probe(&handle, Capability::Executable));
    assert!(matches!(
        bridge.execute(&handle, &[]),
        Err(InteropError::NotExecutable { .. })
    ));
}

#[test]
fn test_scenario_c_missing_name() {
    let bridge = Bridge::new(SymbolRegistry::new());
    match bridge.import("missing") {
        Err(InteropError::NameNotFound(name)) => assert_eq!(name, "missing"),
        other => panic!("expected NameNotFound, got {:?}", other),
    }
    assert!(fixture(&bridge).is_err());
}

#[test]
fn test_scenario_d_arity_mismatch_has_no_side_effect() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = SymbolRegistry::new();
    registry.register("foreign", counted(Arity::Exact(1), &calls));
    let bridge = Bridge::new(registry);

    let handle = bridge.import("foreign").unwrap();
    let err = bridge
        .execute(&handle, &[ForeignValue::from(1i64), ForeignValue::from(2i64)])
        .unwrap_err();
    assert!(matches!(
        err,
        InteropError::ArityMismatch {
            expected: 1,
            got: 2
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Properties
// =============================================================================

fn mixed_registry(calls: &Arc<AtomicUsize>) -> SymbolRegistry {
    let mut registry = SymbolRegistry::new();
    registry.register("null", ForeignValue::Null);
    registry.register("flag", ForeignValue::from(false));
    registry.register("text", ForeignValue::from("guest"));
    registry.register("fn0", counted(Arity::Exact(0), calls));
    registry.register("fnv", counted(Arity::AtLeast(2), calls));
    registry.register("fn?", counted(Arity::Unknown, calls));
    registry.register(
        "list",
        ForeignValue::array(Arc::new(HostArray::new(vec![ForeignValue::Null], true))),
    );
    registry.register(
        "obj",
        ForeignValue::object(Arc::new(HostObject::new(BTreeMap::new(), false))),
    );
    registry.register("ptr", ForeignValue::pointer(0x40));
    registry
}

#[test]
fn test_probe_matches_callability_for_all_names() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));

    for name in bridge.registry().names() {
        let handle = bridge.import(name).unwrap();
        let callable = name.starts_with("fn");
        assert_eq!(bridge.probe(&handle, Capability::Executable), callable, "{}", name);
    }
}

#[test]
fn test_probe_is_idempotent_and_never_invokes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));

    for name in bridge.registry().names() {
        let handle = bridge.import(name).unwrap();
        for cap in Capability::ALL {
            let first = bridge.probe(&handle, cap);
            let second = bridge.probe(&handle, cap);
            assert_eq!(first, second);
            assert_eq!(first, bridge.probe_value(handle.value(), cap));
        }
        assert!(!bridge.probe_named(&handle, "serializable"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_execute_on_non_executable_never_enters_foreign_code() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));

    for name in ["null", "flag", "text", "list", "obj", "ptr"] {
        let handle = bridge.import(name).unwrap();
        assert!(matches!(
            bridge.execute(&handle, &[]),
            Err(InteropError::NotExecutable { .. })
        ));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeated_import_refers_to_same_object() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));

    for name in bridge.registry().names() {
        let a = bridge.import(name).unwrap();
        let b = bridge.import(name).unwrap();
        assert!(a.same_object(&b), "{}", name);
        assert_eq!(a.capabilities(), b.capabilities());
    }
}

#[test]
fn test_each_invocation_is_independent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));
    let handle = bridge.import("fn0").unwrap();

    for _ in 0..3 {
        bridge.execute(&handle, &[]).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_foreign_failure_is_passed_through() {
    let mut registry = SymbolRegistry::new();
    registry.register(
        "foreign",
        ForeignValue::executable(Arity::Exact(1), |args| {
            Err(ForeignError::new("rejected").with_payload(args[0].clone()))
        }),
    );
    let bridge = Bridge::new(registry);
    let handle = bridge.import("foreign").unwrap();

    match bridge.execute(&handle, &[ForeignValue::from("why")]) {
        Err(InteropError::ForeignRaised(err)) => {
            assert_eq!(err.message, "rejected");
            assert_eq!(err.payload.unwrap().as_str(), Some("why"));
        }
        other => panic!("expected ForeignRaised, got {:?}", other),
    }
}

#[test]
#[should_panic(expected = "guest abort")]
fn test_panics_propagate_when_not_caught() {
    let mut registry = SymbolRegistry::new();
    registry.register(
        "foreign",
        ForeignValue::executable(Arity::Exact(0), |_| panic!("guest abort")),
    );
    let bridge = Bridge::new(registry).with_invoker(Invoker::new().with_catch_panics(false));
    let handle = bridge.import("foreign").unwrap();
    let _ = bridge.execute(&handle, &[]);
}

// =============================================================================
// Concurrency and re-entry
// =============================================================================

#[test]
fn test_concurrent_imports_share_handles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(mixed_registry(&calls));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let bridge = bridge.clone();
            thread::spawn(move || {
                let handle = bridge.import("fn0").unwrap();
                assert!(bridge.is_executable(&handle));
                bridge.execute(&handle, &[]).unwrap();
                handle
            })
        })
        .collect();

    let handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    for handle in &handles[1..] {
        assert!(handle.same_object(&handles[0]));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[test]
fn test_callable_can_reenter_bridge() {
    let slot: Arc<OnceCell<Bridge>> = Arc::new(OnceCell::new());
    let inner_slot = Arc::clone(&slot);

    let mut registry = SymbolRegistry::new();
    registry.register(
        "inner",
        ForeignValue::executable(Arity::Exact(1), |args| {
            let n = args[0].as_int().ok_or_else(|| ForeignError::new("expected int"))?;
            Ok(ForeignValue::from(n + 1))
        }),
    );
    registry.register(
        "outer",
        ForeignValue::executable(Arity::Exact(0), move |_| {
            let bridge = inner_slot
                .get()
                .ok_or_else(|| ForeignError::new("bridge not installed"))?;
            let inner = bridge
                .import("inner")
                .map_err(|e| ForeignError::new(e.to_string()))?;
            let result = bridge
                .execute(&inner, &[ForeignValue::from(41i64)])
                .map_err(|e| ForeignError::new(e.to_string()))?;
            Ok(result.into_value())
        }),
    );

    let bridge = Bridge::new(registry);
    assert!(slot.set(bridge.clone()).is_ok());

    let outer = bridge.import("outer").unwrap();
    let result = bridge.execute(&outer, &[]).unwrap();
    assert_eq!(result.value().as_int(), Some(42));
}

//! Tests for contracts assembled at runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use interpose_engine::reflect::SynthesisState;
use interpose_engine::{
    describe, ContractDefinition, DynamicTarget, EngineOptions, Hook, HookEvent,
    MethodDefinition, ParameterDefinition, PropertyDefinition, ProxyError, ProxyGenerator,
    RecordingInterceptor, TypeInfo, TypeKind, Value,
};

fn int() -> TypeInfo {
    TypeInfo::primitive(TypeKind::Int, "i64")
}

fn contract_with(n: usize) -> ContractDefinition {
    (0..n).fold(ContractDefinition::new("Wide"), |def, i| {
        def.add_method(
            MethodDefinition::new(&format!("m{}", i))
                .with_param(ParameterDefinition::new("x", int()))
                .returns(int()),
        )
    })
}

fn target_for(n: usize) -> DynamicTarget {
    (0..n).fold(DynamicTarget::new(), |target, i| {
        target.with_method(&format!("m{}", i), move |_, mut args| {
            let x: i64 = args.take(0)?;
            Ok(Value::i64(x + i as i64))
        })
    })
}

fn printer() -> ContractDefinition {
    ContractDefinition::new("Printer")
        .add_method(
            MethodDefinition::new("print")
                .with_param(ParameterDefinition::new("s", TypeInfo::string()))
                .returns(TypeInfo::string()),
        )
        .add_method(
            MethodDefinition::new("print")
                .with_param(ParameterDefinition::new("n", int()))
                .returns(TypeInfo::string()),
        )
}

fn printer_target() -> DynamicTarget {
    DynamicTarget::new().with_method("print", |method, args| {
        let arg = args.get(0).cloned().unwrap_or_default();
        Ok(Value::string(format!("{}:{}", method.parameters()[0].name, arg)))
    })
}

#[test]
fn test_contract_fidelity_for_many_sizes() {
    for n in [0, 1, 2, 7, 32] {
        let generator = ProxyGenerator::default();
        let proxy = generator
            .create_dynamic_proxy(
                &contract_with(n),
                Arc::new(target_for(n)),
                Arc::new(RecordingInterceptor::new()),
            )
            .unwrap();

        assert_eq!(proxy.descriptor().len(), n);
        for i in 0..n {
            let name = format!("m{}", i);
            let id = proxy.method(&name).unwrap();
            assert_eq!(proxy.invoke(id, (10_i64,)).unwrap(), Value::i64(10 + i as i64));
        }
    }
}

#[test]
fn test_call_by_name_runs_hooks() {
    let generator = ProxyGenerator::default();
    let recorder = Arc::new(RecordingInterceptor::new());
    let proxy = generator
        .create_dynamic_proxy(&contract_with(3), Arc::new(target_for(3)), recorder.clone())
        .unwrap();

    assert_eq!(proxy.call("m2", (1_i64,)).unwrap(), Value::i64(3));
    assert_eq!(recorder.events(), vec![HookEvent::Before, HookEvent::After]);

    let err = proxy.call("missing", ()).unwrap_err();
    assert!(matches!(err, ProxyError::UnknownMethod(name) if name == "missing"));
    // Name resolution fails before dispatch
    assert_eq!(recorder.events().len(), 2);
}

#[test]
fn test_overloads_dispatch_by_argument_shape() {
    let generator = ProxyGenerator::default();
    let proxy = generator
        .create_dynamic_proxy(
            &printer(),
            Arc::new(printer_target()),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap();

    assert_eq!(proxy.call("print", ("hi".to_string(),)).unwrap(), Value::string("s:hi"));
    assert_eq!(proxy.call("print", (5_i64,)).unwrap(), Value::string("n:5"));

    let ids: Vec<_> = proxy.descriptor().overloads("print").map(|m| m.id()).collect();
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_argument_mismatch_is_a_call_failure() {
    let generator = ProxyGenerator::default();
    let recorder = Arc::new(RecordingInterceptor::new());
    let proxy = generator
        .create_dynamic_proxy(&contract_with(1), Arc::new(target_for(1)), recorder.clone())
        .unwrap();

    let err = proxy.call("m0", ("not a number".to_string(),)).unwrap_err();
    assert!(matches!(err, ProxyError::MarshalTypeMismatch { .. }));

    let err = proxy.call("m0", (1_i64, 2_i64)).unwrap_err();
    assert!(matches!(err, ProxyError::MarshalTypeMismatch { .. }));

    // The hook pair still completes for a rejected call
    assert_eq!(recorder.count(HookEvent::Before), 2);
    assert_eq!(recorder.count(HookEvent::After), 2);

    // The proxy is unaffected
    assert_eq!(proxy.call("m0", (4_i64,)).unwrap(), Value::i64(4));
}

#[test]
fn test_unsupported_members_abort_creation() {
    let generator = ProxyGenerator::default();
    let with_property =
        contract_with(1).add_property(PropertyDefinition::new("size", int()));
    let with_event = contract_with(1).add_event("changed");
    let with_async = contract_with(1).add_method(MethodDefinition::new("load").as_async());

    for definition in [with_property, with_event, with_async] {
        let err = generator
            .create_dynamic_proxy(
                &definition,
                Arc::new(target_for(1)),
                Arc::new(RecordingInterceptor::new()),
            )
            .unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedContractKind { .. }));
    }
    assert!(generator.synthesizer().is_empty());
    assert!(generator.bindings().is_empty());
}

#[test]
fn test_sandboxed_rejects_runtime_contracts() {
    let generator = ProxyGenerator::new(EngineOptions::sandboxed());
    let definition = contract_with(1);
    let err = generator
        .create_dynamic_proxy(
            &definition,
            Arc::new(target_for(1)),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap_err();

    assert!(matches!(err, ProxyError::SynthesisFailure { .. }));
    let id = describe(&definition).unwrap().id();
    assert_eq!(generator.synthesizer().dynamic_state(id), SynthesisState::Unsynthesized);
}

#[test]
fn test_missing_handler_is_non_conforming() {
    let generator = ProxyGenerator::default();
    let err = generator
        .create_dynamic_proxy(
            &contract_with(3),
            Arc::new(target_for(2)),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap_err();

    assert!(matches!(err, ProxyError::NonConformingTarget { .. }));
    assert!(generator.bindings().is_empty());
}

#[test]
fn test_handler_failure_runs_after_hook() {
    let generator = ProxyGenerator::default();
    let recorder = Arc::new(RecordingInterceptor::new());
    let target = DynamicTarget::new().with_method("m0", |_, _| Err("backend down".into()));
    let proxy = generator
        .create_dynamic_proxy(&contract_with(1), Arc::new(target), recorder.clone())
        .unwrap();

    let err = proxy.call("m0", (1_i64,)).unwrap_err();
    assert!(err.is_target_failure());
    assert_eq!(recorder.events(), vec![HookEvent::Before, HookEvent::After]);
}

#[test]
fn test_before_hook_failure_skips_handler() {
    let generator = ProxyGenerator::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let target = DynamicTarget::new().with_method("m0", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Value::i64(0))
    });
    let recorder = Arc::new(RecordingInterceptor::new().fail_before("closed"));
    let proxy = generator
        .create_dynamic_proxy(&contract_with(1), Arc::new(target), recorder.clone())
        .unwrap();

    let err = proxy.call("m0", (1_i64,)).unwrap_err();
    assert!(err.is_hook_failure(Hook::Before));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.events(), vec![HookEvent::Before]);
}

#[test]
fn test_identical_definitions_share_a_factory() {
    let generator = ProxyGenerator::default();
    let a = generator.create_unbound_dynamic_proxy(&contract_with(2)).unwrap();
    let b = generator.create_unbound_dynamic_proxy(&contract_with(2)).unwrap();

    assert!(Arc::ptr_eq(a.proxy_handle().factory(), b.proxy_handle().factory()));
    assert_eq!(
        generator.synthesizer().dynamic_state(a.descriptor().id()),
        SynthesisState::Ready
    );

    let c = generator.create_unbound_dynamic_proxy(&contract_with(3)).unwrap();
    assert!(!Arc::ptr_eq(a.proxy_handle().factory(), c.proxy_handle().factory()));
}

#[test]
fn test_method_ids_stay_valid_across_resynthesis() {
    let generator = ProxyGenerator::default();
    let proxy = generator
        .create_dynamic_proxy(
            &contract_with(2),
            Arc::new(target_for(2)),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap();
    let id = proxy.method("m1").unwrap();

    // A second synthesis request returns the cached factory
    let _other = generator.create_unbound_dynamic_proxy(&contract_with(2)).unwrap();

    assert_eq!(proxy.invoke(id, (0_i64,)).unwrap(), Value::i64(1));
}

#[test]
fn test_foreign_method_id_is_unknown() {
    let generator = ProxyGenerator::default();
    let wide = generator
        .create_dynamic_proxy(
            &contract_with(1),
            Arc::new(target_for(1)),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap();
    let printer_proxy = generator
        .create_dynamic_proxy(
            &printer(),
            Arc::new(printer_target()),
            Arc::new(RecordingInterceptor::new()),
        )
        .unwrap();

    let foreign = printer_proxy.method("print").unwrap();
    let err = wide.invoke(foreign, ("x".to_string(),)).unwrap_err();
    assert!(matches!(err, ProxyError::UnknownMethod(_)));
}

fn single_param(kind: TypeKind) -> ContractDefinition {
    let type_info = TypeInfo {
        kind,
        name: "T".to_string(),
        element_type: None,
    };
    ContractDefinition::new("C").add_method(
        MethodDefinition::new("m")
            .with_param(ParameterDefinition::new("x", type_info))
            .returns(TypeInfo::string()),
    )
}

#[test]
fn test_contracts_differing_in_kind_get_distinct_factories() {
    let generator = ProxyGenerator::default();
    let target = Arc::new(DynamicTarget::new().with_method("m", |_, args| {
        Ok(Value::string(args.get(0).cloned().unwrap_or_default().to_string()))
    }));

    let text = generator
        .create_dynamic_proxy(&single_param(TypeKind::String), target.clone(), Arc::new(RecordingInterceptor::new()))
        .unwrap();
    let number = generator
        .create_dynamic_proxy(&single_param(TypeKind::Int), target, Arc::new(RecordingInterceptor::new()))
        .unwrap();

    assert!(!Arc::ptr_eq(text.proxy_handle().factory(), number.proxy_handle().factory()));
    assert_eq!(number.descriptor().methods()[0].parameters()[0].type_info.kind, TypeKind::Int);
    assert_eq!(number.call("m", (5_i32,)).unwrap(), Value::string("5"));
    assert_eq!(text.call("m", ("a".to_string(),)).unwrap(), Value::string("a"));
    assert_eq!(generator.synthesizer().len(), 2);
}

#[test]
fn test_out_of_range_argument_is_a_mismatch() {
    let generator = ProxyGenerator::default();
    let definition = ContractDefinition::new("Narrow").add_method(
        MethodDefinition::new("m")
            .with_param(ParameterDefinition::new("x", TypeInfo::primitive(TypeKind::Int, "i32")))
            .returns(int()),
    );
    let target = DynamicTarget::new().with_method("m", |_, mut args| {
        let x: i32 = args.take(0)?;
        Ok(Value::i64(i64::from(x)))
    });
    let recorder = Arc::new(RecordingInterceptor::new());
    let proxy = generator
        .create_dynamic_proxy(&definition, Arc::new(target), recorder.clone())
        .unwrap();

    let err = proxy.call("m", (5_000_000_000_i64,)).unwrap_err();
    assert!(matches!(err, ProxyError::MarshalTypeMismatch { .. }));
    assert!(!err.is_target_failure());
    assert_eq!(recorder.events(), vec![HookEvent::Before, HookEvent::After]);
    assert_eq!(proxy.call("m", (7_i64,)).unwrap(), Value::i64(7));
}

//! Native Backend Tests

use super::loader::{test_check, test_convert, test_marshal, validate_signature};
use super::*;
use crate::interop::{
    Arity, Bridge, Capability, ForeignCallable, ForeignValue, InteropError, SymbolRegistry,
};

#[test]
fn test_native_type_parsing() {
    assert_eq!(NativeType::from_str("u64"), Some(NativeType::U64));
    assert_eq!(NativeType::from_str("int"), Some(NativeType::I32));
    assert_eq!(NativeType::from_str("double"), Some(NativeType::F64));
    assert_eq!(NativeType::from_str("void*"), Some(NativeType::Ptr));
    assert_eq!(NativeType::from_str("const char*"), Some(NativeType::CStr));
    assert_eq!(NativeType::from_str("bool"), Some(NativeType::Bool));
    assert_eq!(NativeType::from_str("invalid"), None);
}

#[test]
fn test_native_type_properties() {
    assert!(NativeType::U64.is_integer());
    assert!(!NativeType::U64.is_pointer());
    assert!(NativeType::F32.is_float());
    assert!(NativeType::CStr.is_pointer());
    assert_eq!(NativeType::I16.size(), 2);
    assert_eq!(NativeType::Void.size(), 0);
}

#[test]
fn test_signature_parsing() {
    let sig = NativeSignature::parse("int add(int a, int b)").unwrap();
    assert_eq!(sig.name, "add");
    assert_eq!(sig.return_type, NativeType::I32);
    assert_eq!(sig.params, vec![NativeType::I32, NativeType::I32]);
    assert!(!sig.variadic);

    let sig = NativeSignature::parse("void print(cstr msg)").unwrap();
    assert_eq!(sig.return_type, NativeType::Void);
    assert_eq!(sig.params, vec![NativeType::CStr]);

    let sig = NativeSignature::parse("i32 getpid()").unwrap();
    assert_eq!(sig.name, "getpid");
    assert!(sig.params.is_empty());

    let sig = NativeSignature::parse("size_t strlen(const char *s);").unwrap();
    assert_eq!(sig.name, "strlen");
    assert_eq!(sig.return_type, NativeType::U64);
    assert_eq!(sig.params, vec![NativeType::CStr]);

    let sig = NativeSignature::parse("char *getenv(const char* name)").unwrap();
    assert_eq!(sig.return_type, NativeType::CStr);

    let sig = NativeSignature::parse("unsigned int sleep(unsigned int seconds)").unwrap();
    assert_eq!(sig.return_type, NativeType::U32);
    assert_eq!(sig.params, vec![NativeType::U32]);

    let sig = NativeSignature::parse("int abs(int)").unwrap();
    assert_eq!(sig.params, vec![NativeType::I32]);

    assert!(NativeSignature::parse("no parens").is_none());
    assert!(NativeSignature::parse("mystery f(int)").is_none());
}

#[test]
fn test_signature_variadic() {
    let sig = NativeSignature::parse("int printf(const char* fmt, ...)").unwrap();
    assert!(sig.variadic);
    assert_eq!(sig.params, vec![NativeType::CStr]);
    assert_eq!(sig.arity(), Arity::AtLeast(1));
    assert_eq!(sig.to_string(), "i32 printf(cstr, ...)");
}

#[test]
fn test_signature_display_and_arity() {
    let sig = NativeSignature::new("add", vec![NativeType::I32, NativeType::I32], NativeType::I32);
    assert_eq!(sig.to_string(), "i32 add(i32, i32)");
    assert_eq!(sig.arity(), Arity::Exact(2));
}

#[test]
fn test_marshal_arguments() {
    assert_eq!(test_marshal(&ForeignValue::Null, NativeType::CStr).unwrap(), 0);
    assert_eq!(test_marshal(&ForeignValue::Null, NativeType::Ptr).unwrap(), 0);
    assert_eq!(test_marshal(&ForeignValue::from(true), NativeType::Bool).unwrap(), 1);
    assert_eq!(test_marshal(&ForeignValue::from(true), NativeType::I32).unwrap(), 1);
    assert_eq!(
        test_marshal(&ForeignValue::from(-1i64), NativeType::I64).unwrap(),
        u64::MAX
    );
    assert_eq!(
        test_marshal(&ForeignValue::pointer(0x1000), NativeType::Ptr).unwrap(),
        0x1000
    );
    assert_ne!(test_marshal(&ForeignValue::from("hi"), NativeType::CStr).unwrap(), 0);
}

#[test]
fn test_argument_must_match_parameter_type() {
    // Integers never reach C as pointers
    let err = test_check(&ForeignValue::from(123i64), NativeType::CStr).unwrap_err();
    assert_eq!(err.index, 0);
    assert!(err.reason.contains("int"));
    assert!(err.reason.contains("cstr"));
    assert!(test_check(&ForeignValue::from(123i64), NativeType::Ptr).is_err());
    assert!(test_check(&ForeignValue::pointer(0x10), NativeType::CStr).is_err());

    assert!(test_check(&ForeignValue::from("12"), NativeType::I32).is_err());
    assert!(test_check(&ForeignValue::from(2.9f64), NativeType::I32).is_err());
    assert!(test_check(&ForeignValue::Null, NativeType::U64).is_err());
    assert!(test_check(&ForeignValue::pointer(0x10), NativeType::I64).is_err());

    let callable = ForeignValue::executable(Arity::Exact(0), |_| Ok(ForeignValue::Null));
    assert!(test_check(&callable, NativeType::Ptr).is_err());

    let err = test_check(&ForeignValue::from("a\0b"), NativeType::CStr).unwrap_err();
    assert!(err.reason.contains("NUL"));
}

#[test]
fn test_validate_signature() {
    let ok = NativeSignature::parse("size_t strlen(const char* s)").unwrap();
    assert!(validate_signature(&ok).is_ok());

    let printf = NativeSignature::parse("int printf(const char* fmt, ...)").unwrap();
    assert!(matches!(
        validate_signature(&printf),
        Err(NativeError::InvalidSignature(msg)) if msg.contains("variadic")
    ));

    let cos = NativeSignature::parse("double cos(double x)").unwrap();
    assert!(matches!(
        validate_signature(&cos),
        Err(NativeError::InvalidSignature(_))
    ));

    let void_param = NativeSignature::new("f", vec![NativeType::Void], NativeType::I32);
    assert!(matches!(
        validate_signature(&void_param),
        Err(NativeError::InvalidSignature(_))
    ));

    let wide = NativeSignature::new("f", vec![NativeType::I32; 7], NativeType::Void);
    assert!(matches!(
        validate_signature(&wide),
        Err(NativeError::TooManyParams(7))
    ));
}

#[test]
fn test_convert_results() {
    assert!(matches!(test_convert(123, NativeType::Void), ForeignValue::Null));
    assert_eq!(test_convert(0xFFFF_FFFF, NativeType::I32).as_int(), Some(-1));
    assert_eq!(test_convert(0xFFFF_FFFF, NativeType::U32).as_int(), Some(0xFFFF_FFFF));
    assert_eq!(test_convert(0x1FF, NativeType::U8).as_int(), Some(0xFF));
    assert!(matches!(
        test_convert(0x2000, NativeType::CStr),
        ForeignValue::Pointer(p) if p.0 == 0x2000
    ));
}

#[test]
fn test_loader_missing_library() {
    let mut loader = LibraryLoader::new();
    assert!(matches!(
        loader.load("nope", Some("/definitely/not/a/lib.so")),
        Err(NativeError::LoadError(_))
    ));
    assert!(loader.loaded_libraries().is_empty());
    assert!(matches!(
        loader.function("nope", NativeSignature::new("f", vec![], NativeType::Void)),
        Err(NativeError::LibraryNotLoaded(_))
    ));
}

#[test]
fn test_native_error_display() {
    let err = NativeError::TooManyParams(9);
    assert!(err.to_string().contains('9'));
    assert!(err.to_string().contains(&MAX_NATIVE_ARGS.to_string()));
}

#[cfg(target_os = "linux")]
#[test]
fn test_libc_through_bridge() {
    let mut loader = LibraryLoader::new();

    // libc.so.6 is resolved by the system loader on any glibc host
    if let Ok(_lib) = loader.load("c", Some("libc.so.6")) {
        let getpid = loader
            .function("c", NativeSignature::parse("i32 getpid()").unwrap())
            .expect("getpid should resolve");
        let strlen = loader
            .function("c", NativeSignature::parse("size_t strlen(const char* s)").unwrap())
            .expect("strlen should resolve");

        let mut registry = SymbolRegistry::new();
        registry.register("getpid", getpid.into_value());
        registry.register("strlen", strlen.into_value());
        let bridge = Bridge::new(registry);

        let handle = bridge.import("getpid").unwrap();
        assert!(bridge.probe(&handle, Capability::Executable));
        let pid = bridge.execute(&handle, &[]).unwrap();
        assert_eq!(pid.value().as_int(), Some(std::process::id() as i64));

        let handle = bridge.import("strlen").unwrap();
        let len = bridge.execute(&handle, &[ForeignValue::from("polyglot")]).unwrap();
        assert_eq!(len.value().as_int(), Some(8));

        assert!(matches!(
            bridge.execute(&handle, &[]),
            Err(InteropError::ArityMismatch {
                expected: 1,
                got: 0
            })
        ));

        // A wrongly typed argument is refused before control reaches C
        match bridge.execute(&handle, &[ForeignValue::from(123i64)]) {
            Err(InteropError::InvalidArgument(err)) => assert_eq!(err.index, 0),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        assert!(matches!(
            bridge.execute(&handle, &[ForeignValue::from("a\0b")]),
            Err(InteropError::InvalidArgument(_))
        ));

        // Direct calls outside the invoker are checked as well
        let strlen = loader
            .function("c", NativeSignature::parse("size_t strlen(const char* s)").unwrap())
            .expect("strlen should resolve");
        assert!(strlen.call(&[ForeignValue::from(123i64)]).is_err());
        assert!(strlen.call(&[]).is_err());

        let cos = loader.function("c", NativeSignature::parse("double cos(double x)").unwrap());
        assert!(matches!(cos, Err(NativeError::InvalidSignature(_))));

        let printf =
            loader.function("c", NativeSignature::parse("int printf(const char* f, ...)").unwrap());
        assert!(matches!(printf, Err(NativeError::InvalidSignature(_))));
    }
}

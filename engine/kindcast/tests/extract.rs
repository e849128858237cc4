use kindcast::capability::MethodSet;
use kindcast::{
    extract_bool, extract_complex, extract_float, extract_int, extract_string, extract_uint,
    get_int, try_extract, CastError, CastResult, Config, Handle, NamedType, RecordType, Type,
    Value,
};
use num_complex::Complex64;

fn cfg() -> Config {
    Config::default()
}

// ============================================================================
// Direct category matches
// ============================================================================

#[test]
fn int_from_every_integer_width() {
    assert_eq!(extract_int(&Handle::of(-5i8), &cfg()).expect("i8"), -5);
    assert_eq!(extract_int(&Handle::of(70_000i32), &cfg()).expect("i32"), 70_000);
    assert_eq!(extract_int(&Handle::of(9u16), &cfg()).expect("u16"), 9);
    assert_eq!(extract_int(&Handle::of(true), &cfg()).expect("bool"), 1);
}

#[test]
fn wide_uint_goes_through_text_and_may_overflow() {
    assert_eq!(extract_int(&Handle::of(42u64), &cfg()).expect("fits"), 42);
    let err = extract_int(&Handle::of(u64::MAX), &cfg()).expect_err("too wide");
    assert!(err.is_overflow());
}

#[test]
fn uint_rejects_negative_ints() {
    let err = extract_uint(&Handle::of(-3i64), &cfg()).expect_err("negative");
    assert!(err.is_overflow());
    assert_eq!(extract_uint(&Handle::of(3i64), &cfg()).expect("positive"), 3);
}

#[test]
fn float_from_ints_and_text() {
    assert_eq!(extract_float(&Handle::of(2i32), &cfg()).expect("i32"), 2.0);
    assert_eq!(extract_float(&Handle::of(2i64), &cfg()).expect("i64"), 2.0);
    assert_eq!(extract_float(&Handle::of("1e3"), &cfg()).expect("text"), 1000.0);
}

#[test]
fn complex_from_float_and_text() {
    assert_eq!(
        extract_complex(&Handle::of(1.5f64), &cfg()).expect("float"),
        Complex64::new(1.5, 0.0)
    );
    assert_eq!(
        extract_complex(&Handle::of("(1+2i)"), &cfg()).expect("text"),
        Complex64::new(1.0, 2.0)
    );
}

#[test]
fn bool_from_text() {
    assert!(extract_bool(&Handle::of("T"), &cfg()).expect("T"));
    assert!(!extract_bool(&Handle::of("false"), &cfg()).expect("false"));
    for text in ["yes", "banana"] {
        let err = extract_bool(&Handle::of(text), &cfg()).expect_err(text);
        assert!(matches!(err, CastError::ParseFailure { target: "bool", .. }));
    }
}

// ============================================================================
// String rendering
// ============================================================================

#[test]
fn string_renders_numbers_with_config() {
    assert_eq!(extract_string(&Handle::of(-10i64), &cfg()).expect("int"), "-10");
    assert_eq!(
        extract_string(&Handle::of(10u8), &cfg().with_base(2)).expect("binary"),
        "1010"
    );
    assert_eq!(extract_string(&Handle::of(0.1f64), &cfg()).expect("float"), "0.1");
    assert_eq!(
        extract_string(&Handle::of(3.14159f64), &cfg().with_float_format('f', 2))
            .expect("fixed"),
        "3.14"
    );
}

#[test]
fn float32_renders_at_single_precision() {
    assert_eq!(extract_string(&Handle::of(0.1f32), &cfg()).expect("f32"), "0.1");
}

#[test]
fn string_of_record_is_unimplemented() {
    let ty = RecordType::new("Point").field("X", Type::I64).into_type();
    let err = extract_string(&Handle::of(ty.zero()), &cfg()).expect_err("record");
    match err {
        CastError::UnimplementedCombination {
            operation,
            kind,
            value_ty,
            ..
        } => {
            assert_eq!(operation, "extraction");
            assert_eq!(kind, kindcast::Kind::String);
            assert_eq!(value_ty, "Point");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_int_extraction_reports_int_target() {
    let ty = RecordType::new("Point").into_type();
    let err = extract_int(&Handle::of(ty.zero()), &cfg()).expect_err("record");
    assert!(matches!(
        err,
        CastError::UnimplementedCombination {
            kind: kindcast::Kind::Int,
            ..
        }
    ));
}

// ============================================================================
// Indirection
// ============================================================================

#[test]
fn pointers_and_interfaces_are_unwrapped() {
    let nested = Value::pointer_to(Value::interface(Value::pointer_to(Value::from("17"))));
    assert_eq!(extract_int(&Handle::of(nested), &cfg()).expect("nested"), 17);
}

#[test]
fn null_pointer_source_is_not_extractable() {
    let err = extract_int(&Handle::of(Value::null_pointer(Type::I64)), &cfg())
        .expect_err("null pointer");
    assert!(matches!(err, CastError::UnimplementedCombination { .. }));
}

#[test]
fn invalid_handle_is_rejected() {
    let err = extract_int(&Handle::invalid(), &cfg()).expect_err("invalid");
    assert!(matches!(err, CastError::InvalidValue(_)));
    assert_eq!(get_int(&Handle::invalid(), &cfg()), 0);
}

#[test]
fn try_extract_widens_to_the_category() {
    assert_eq!(
        try_extract(&Handle::of(7u8), &cfg()).expect("uint"),
        Value::from(7u64)
    );
    assert_eq!(
        try_extract(&Handle::of(Value::pointer_to(Value::from(1.5f32))), &cfg())
            .expect("float"),
        Value::from(1.5f64)
    );
}

// ============================================================================
// Capabilities
// ============================================================================

fn celsius() -> Type {
    let methods = MethodSet::new().with_int64(|receiver: &Value| -> CastResult<i64> {
        Ok(receiver.as_f64().unwrap_or_default() as i64)
    });
    NamedType::new("Celsius", Type::F64).methods(methods).into_type()
}

fn labelled() -> Type {
    let methods = MethodSet::new().with_string(|_: &Value| -> CastResult<String> {
        Ok("custom".to_string())
    });
    RecordType::new("Labelled")
        .field("Id", Type::I64)
        .pointer_methods(methods)
        .into_type()
}

#[test]
fn value_capability_beats_text_round_trip() {
    let ty = celsius();
    let reading = Value::named(&ty, Value::from(21.7f64));
    assert_eq!(extract_int(&Handle::of(reading), &cfg()).expect("capability"), 21);
}

#[test]
fn declined_capability_falls_back() {
    let methods = MethodSet::new().with_int64(|_: &Value| -> CastResult<i64> {
        Err(CastError::Capability("declined".into()))
    });
    let ty = NamedType::new("Count", Type::STRING).methods(methods).into_type();
    let value = Value::named(&ty, Value::from("12"));
    assert_eq!(extract_int(&Handle::of(value), &cfg()).expect("fallback"), 12);
}

#[test]
fn pointer_capability_needs_addressable_value() {
    let ty = labelled();
    let detached = Handle::of(ty.zero());
    assert!(extract_string(&detached, &cfg()).is_err());

    let slot = Handle::slot(ty.zero());
    assert_eq!(extract_string(&slot, &cfg()).expect("addressable"), "custom");
}

#[test]
fn pointer_exposes_pointee_capabilities() {
    let ty = labelled();
    let pointer = Handle::of(Value::pointer_to(ty.zero()));
    assert_eq!(extract_string(&pointer, &cfg()).expect("through pointer"), "custom");
}

#[test]
fn pointer_receiver_wins_when_addressable() {
    let ty = RecordType::new("Badge")
        .field("Id", Type::I64)
        .methods(MethodSet::new().with_string(|_: &Value| -> CastResult<String> {
            Ok("by value".to_string())
        }))
        .pointer_methods(MethodSet::new().with_string(|_: &Value| -> CastResult<String> {
            Ok("by pointer".to_string())
        }))
        .into_type();

    let slot = Handle::slot(ty.zero());
    assert_eq!(extract_string(&slot, &cfg()).expect("addressable"), "by pointer");
    let detached = Handle::of(ty.zero());
    assert_eq!(extract_string(&detached, &cfg()).expect("detached"), "by value");
}

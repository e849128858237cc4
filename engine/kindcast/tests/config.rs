use kindcast::config::{
    DEFAULT_BASE, DEFAULT_BIT_SIZE, DEFAULT_COMPLEX_BIT_SIZE, DEFAULT_FLOAT_FORMAT,
    DEFAULT_FLOAT_PRECISION,
};
use kindcast::decode::FieldDecoder;
use kindcast::wellknown::default_time_layouts;
use kindcast::{
    assign, CastError, CastResult, Config, Handle, RecordType, StructuralDecoder, TimeLayout, Type,
    Value,
};

#[test]
fn defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.float_precision, DEFAULT_FLOAT_PRECISION);
    assert_eq!(cfg.float_format, DEFAULT_FLOAT_FORMAT);
    assert_eq!(cfg.bit_size, DEFAULT_BIT_SIZE);
    assert_eq!(cfg.complex_bit_size, DEFAULT_COMPLEX_BIT_SIZE);
    assert_eq!(cfg.base, DEFAULT_BASE);
    assert!(!cfg.ignore_errors && !cfg.recover_panics && !cfg.block_channel && !cfg.concurrent);
    assert_eq!(cfg.time_layouts().len(), default_time_layouts().len());
}

#[test]
fn out_of_range_fields_fall_back_to_defaults() {
    let cfg = Config {
        float_precision: -7,
        float_format: 'q',
        bit_size: 16,
        complex_bit_size: 32,
        base: 99,
        ..Config::default()
    }
    .normalized();
    assert_eq!(cfg.float_precision, DEFAULT_FLOAT_PRECISION);
    assert_eq!(cfg.float_format, DEFAULT_FLOAT_FORMAT);
    assert_eq!(cfg.bit_size, DEFAULT_BIT_SIZE);
    assert_eq!(cfg.complex_bit_size, DEFAULT_COMPLEX_BIT_SIZE);
    assert_eq!(cfg.base, DEFAULT_BASE);
}

#[test]
fn combinators_normalize() {
    assert_eq!(Config::new().with_base(1).base, DEFAULT_BASE);
    assert_eq!(Config::new().with_base(36).base, 36);

    let widths = Config::new().with_bit_size(32, 64);
    assert_eq!((widths.bit_size, widths.complex_bit_size), (32, 64));

    let float = Config::new().with_float_format('e', 3);
    assert_eq!((float.float_format, float.float_precision), ('e', 3));
    // zero precision is a valid request
    assert_eq!(Config::new().with_float_format('f', 0).float_precision, 0);
}

#[test]
fn merge_prefers_non_default_fields() {
    let base = Config::new().with_base(16).ignore_errors(true);
    let overlay = Config::new().with_bit_size(32, 128).concurrent(true);
    let merged = base.merge(overlay);
    assert_eq!(merged.base, 16);
    assert_eq!(merged.bit_size, 32);
    assert!(merged.ignore_errors);
    assert!(merged.concurrent);
}

#[test]
fn debug_hides_decoder_internals() {
    let cfg = Config::new().with_decoder(FieldDecoder);
    let text = format!("{cfg:?}");
    assert!(text.contains("decoder: true"));
}

#[test]
fn bit_size_governs_integer_parsing() {
    let dest = Handle::slot(0i64);
    let narrow = Config::new().with_bit_size(32, 128);
    let err = assign(&dest, &Handle::of("3000000000"), &narrow).expect_err("exceeds 32 bits");
    assert!(err.is_overflow());
    assign(&dest, &Handle::of("3000000000"), &Config::new()).expect("fits 64 bits");
    assert_eq!(dest.get(), Some(Value::from(3_000_000_000i64)));
}

#[test]
fn custom_time_layouts_replace_the_table() {
    let cfg = Config::new().with_time_layouts([TimeLayout::format("%d/%m/%Y")]);
    let dest = Handle::slot(Type::Time.zero());
    assign(&dest, &Handle::of("29/02/2020"), &cfg).expect("custom layout");
    let err = assign(&dest, &Handle::of("2020-02-29T00:00:00Z"), &cfg).expect_err("rfc3339");
    assert!(matches!(err, CastError::ParseFailure { target: "time", .. }));
}

struct Rejecting;

impl StructuralDecoder for Rejecting {
    fn decode(&self, _dst: &mut Value, _src: &Handle, _cfg: &Config) -> CastResult<()> {
        Err(CastError::Decode("rejected".into()))
    }
}

#[test]
fn custom_decoder_is_used_for_structures() {
    let ty = RecordType::new("Target").field("A", Type::I64).into_type();
    let src = Value::map(
        Type::STRING,
        Type::I64,
        vec![(Value::from("A"), Value::from(1i64))],
    );
    let dest = Handle::slot(ty.zero());
    let err = assign(&dest, &Handle::of(src.clone()), &Config::new().with_decoder(Rejecting))
        .expect_err("custom decoder");
    assert_eq!(err, CastError::Decode("rejected".into()));

    assign(&dest, &Handle::of(src), &Config::new()).expect("field decoder");
    assert_eq!(dest.get().expect("value").field("A"), Some(&Value::from(1i64)));
}

#[test]
fn recovered_panics_become_errors() {
    let methods = kindcast::MethodSet::new().with_int64(|_: &Value| -> CastResult<i64> {
        panic!("capability blew up")
    });
    let ty = kindcast::NamedType::new("Fragile", Type::STRING)
        .methods(methods)
        .into_type();
    let src = Handle::of(Value::named(&ty, Value::from("one")));

    let err = kindcast::extract_int(&src, &Config::new().recover_panics(true))
        .expect_err("recovered");
    assert_eq!(err, CastError::Panic("capability blew up".into()));
}

#[test]
#[should_panic(expected = "capability blew up")]
fn panics_propagate_by_default() {
    let methods = kindcast::MethodSet::new().with_int64(|_: &Value| -> CastResult<i64> {
        panic!("capability blew up")
    });
    let ty = kindcast::NamedType::new("Fragile", Type::STRING)
        .methods(methods)
        .into_type();
    let src = Handle::of(Value::named(&ty, Value::from("one")));
    let _ = kindcast::extract_int(&src, &Config::new());
}

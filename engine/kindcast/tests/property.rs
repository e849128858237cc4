use chrono::TimeDelta;
use proptest::prelude::*;

use kindcast::{
    assign, extract_string, format_duration, is_zero, parse_duration, CastResult, Config, Handle,
    Type, Value,
};

fn assign_into(dest: Value, src: Value, cfg: &Config) -> CastResult<Value> {
    let slot = Handle::slot(dest);
    assign(&slot, &Handle::of(src), cfg)?;
    Ok(slot.get().expect("slot holds a value"))
}

fn scalar_destination() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::BOOL),
        Just(Type::I8),
        Just(Type::I64),
        Just(Type::U16),
        Just(Type::U64),
        Just(Type::F32),
        Just(Type::F64),
        Just(Type::C128),
    ]
}

fn scalar_source() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-3i64..=3).prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u8>().prop_map(Value::from),
        Just(Value::from(0.0f64)),
        // negative zero renders as "-0", which parses back to plain zero
        (-1.0e6f64..1.0e6).prop_map(|v| Value::from(if v == 0.0 { 0.0 } else { v })),
        any::<bool>().prop_map(Value::from),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn integer_text_round_trips_in_any_base(value in any::<i64>(), base in 2u32..=36) {
        let cfg = Config::new().with_base(base);
        let text = extract_string(&Handle::of(value), &cfg).expect("render");
        let back = assign_into(Value::from(0i64), Value::from(text), &cfg).expect("parse");
        prop_assert_eq!(back, Value::from(value));
    }

    #[test]
    fn narrowing_fails_exactly_when_out_of_range(value in any::<i64>()) {
        let result = assign_into(Value::from(0i8), Value::from(value), &Config::new());
        match i8::try_from(value) {
            Ok(narrow) => prop_assert_eq!(result.expect("fits"), Value::from(narrow)),
            Err(_) => prop_assert!(result.expect_err("overflow").is_overflow()),
        }
    }

    #[test]
    fn concurrent_assignment_matches_sequential(
        items in prop::collection::vec(-70_000i64..70_000, 0..24),
    ) {
        let src = Value::slice(Type::I64, items.into_iter().map(Value::from).collect());
        let dest = Type::slice(Type::I16).zero();
        let sequential = assign_into(dest.clone(), src.clone(), &Config::new());
        let concurrent = assign_into(dest, src, &Config::new().concurrent(true));
        prop_assert_eq!(sequential, concurrent);
    }

    #[test]
    fn normalization_lands_in_range_and_is_stable(
        precision in any::<i32>(),
        format in any::<char>(),
        bit_size in any::<u32>(),
        complex_bit_size in any::<u32>(),
        base in any::<u32>(),
    ) {
        let cfg = Config {
            float_precision: precision,
            float_format: format,
            bit_size,
            complex_bit_size,
            base,
            ..Config::default()
        }
        .normalized();
        prop_assert!(cfg.float_precision >= -1);
        prop_assert!("beEfgGxX".contains(cfg.float_format));
        prop_assert!(cfg.bit_size == 32 || cfg.bit_size == 64);
        prop_assert!(cfg.complex_bit_size == 64 || cfg.complex_bit_size == 128);
        prop_assert!((2..=36).contains(&cfg.base));

        let again = cfg.clone().normalized();
        prop_assert_eq!(format!("{again:?}"), format!("{cfg:?}"));
    }

    #[test]
    fn duration_text_round_trips(nanos in any::<i64>()) {
        let duration = TimeDelta::nanoseconds(nanos);
        let text = format_duration(duration);
        prop_assert_eq!(parse_duration(&text).expect("parse"), duration);
    }

    #[test]
    fn successful_assignment_preserves_zeroness(ty in scalar_destination(), src in scalar_source()) {
        let src_zero = is_zero(&Handle::of(src.clone()));
        let dest = Handle::slot(ty.zero());
        if assign(&dest, &Handle::of(src), &Config::new()).is_ok() {
            prop_assert_eq!(is_zero(&dest), src_zero);
        }
    }
}

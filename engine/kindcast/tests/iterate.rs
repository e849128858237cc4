use parking_lot::Mutex;

use kindcast::{
    extract_int, CastError, Channel, Config, Handle, Iterable, Kind, RecordType, Type, Value,
};

fn numbers(n: i64) -> Value {
    Value::slice(Type::I64, (0..n).map(Value::from).collect())
}

// ============================================================================
// Fields
// ============================================================================

#[test]
fn fields_are_visited_in_declaration_order() {
    let ty = RecordType::new("User")
        .field("Name", Type::STRING)
        .field("Age", Type::I64)
        .hidden_field("secret", Type::STRING)
        .into_type();
    let user = Value::record(&ty, [("Name", Value::from("ann")), ("Age", Value::from(41i64))]);
    let seen = Mutex::new(Vec::new());

    Iterable::cast(&Handle::of(user), Config::new())
        .for_each_field(|record, def, field| {
            assert_eq!(record.kind(), Kind::Record);
            seen.lock().push((def.name.clone(), field.can_read()));
            Ok(())
        })
        .expect("walk fields");

    assert_eq!(
        seen.into_inner(),
        vec![
            ("Name".to_string(), true),
            ("Age".to_string(), true),
            ("secret".to_string(), false),
        ]
    );
}

#[test]
fn fields_through_pointer_and_interface() {
    let ty = RecordType::new("Pair")
        .field("A", Type::I64)
        .field("B", Type::I64)
        .into_type();
    let pair = Value::record(&ty, [("A", Value::from(2i64)), ("B", Value::from(3i64))]);
    let boxed = Value::interface(Value::pointer_to(pair));
    let total = Mutex::new(0i64);

    let iterable = Iterable::cast(&Handle::of(boxed), Config::new());
    assert_eq!(iterable.kind(), Kind::Record);
    iterable
        .for_each_field(|_, _, field| {
            *total.lock() += extract_int(field, &Config::new())?;
            Ok(())
        })
        .expect("walk fields");
    assert_eq!(total.into_inner(), 5);
}

// ============================================================================
// Elements and entries
// ============================================================================

#[test]
fn elements_carry_their_index() {
    let seen = Mutex::new(Vec::new());
    Iterable::cast(&Handle::of(numbers(4)), Config::new())
        .for_each_element(|idx, item| {
            let value = extract_int(item, &Config::new())?;
            seen.lock().push((idx, value));
            Ok(())
        })
        .expect("walk elements");
    assert_eq!(seen.into_inner(), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
}

#[test]
fn sequential_walk_stops_at_first_error() {
    let visited = Mutex::new(0usize);
    let err = Iterable::cast(&Handle::of(numbers(5)), Config::new())
        .for_each_element(|idx, _| {
            *visited.lock() += 1;
            if idx == 1 {
                Err(CastError::Capability("stop".into()))
            } else {
                Ok(())
            }
        })
        .expect_err("callback error");
    assert_eq!(err, CastError::Capability("stop".into()));
    assert_eq!(visited.into_inner(), 2);
}

#[test]
fn ignore_errors_visits_everything() {
    let visited = Mutex::new(0usize);
    Iterable::cast(&Handle::of(numbers(5)), Config::new().ignore_errors(true))
        .for_each_element(|_, _| {
            *visited.lock() += 1;
            Err(CastError::Capability("always".into()))
        })
        .expect("errors ignored");
    assert_eq!(visited.into_inner(), 5);
}

#[test]
fn concurrent_walk_visits_every_element() {
    let seen = Mutex::new(Vec::new());
    Iterable::cast(&Handle::of(numbers(64)), Config::new().concurrent(true))
        .for_each_element(|idx, _| {
            seen.lock().push(idx);
            Ok(())
        })
        .expect("walk elements");
    let mut seen = seen.into_inner();
    seen.sort_unstable();
    assert_eq!(seen, (0..64).collect::<Vec<_>>());
}

#[test]
fn concurrent_walk_reports_lowest_failing_index() {
    let err = Iterable::cast(&Handle::of(numbers(32)), Config::new().concurrent(true))
        .for_each_element(|idx, _| {
            if idx % 10 == 7 {
                Err(CastError::Capability(format!("failed at {idx}")))
            } else {
                Ok(())
            }
        })
        .expect_err("failures");
    assert_eq!(err, CastError::Capability("failed at 7".into()));
}

#[test]
fn entries_are_key_value_pairs() {
    let map = Value::map(
        Type::STRING,
        Type::I64,
        vec![
            (Value::from("a"), Value::from(1i64)),
            (Value::from("b"), Value::from(2i64)),
        ],
    );
    let seen = Mutex::new(Vec::new());
    Iterable::cast(&Handle::of(map), Config::new())
        .for_each_entry(|key, value| {
            seen.lock().push((key.get(), value.get()));
            Ok(())
        })
        .expect("walk entries");
    let mut seen = seen.into_inner();
    seen.sort_by_key(|(key, _)| key.as_ref().and_then(Value::as_str).map(str::to_owned));
    assert_eq!(
        seen,
        vec![
            (Some(Value::from("a")), Some(Value::from(1i64))),
            (Some(Value::from("b")), Some(Value::from(2i64))),
        ]
    );
}

#[test]
fn wrong_category_is_a_no_op() {
    let iterable = Iterable::cast(&Handle::of(7i64), Config::new());
    let fail = |_: &Handle| -> kindcast::CastResult<()> { panic!("never called") };
    iterable
        .for_each_field(|_, _, _| panic!("never called"))
        .expect("no fields");
    iterable
        .for_each_element(|_, _| panic!("never called"))
        .expect("no elements");
    iterable
        .for_each_entry(|_, _| panic!("never called"))
        .expect("no entries");
    iterable.for_each_received(fail).expect("no channel");

    let invalid = Iterable::cast(&Handle::invalid(), Config::new());
    invalid
        .for_each_element(|_, _| panic!("never called"))
        .expect("invalid");
}

// ============================================================================
// Channels
// ============================================================================

#[test]
fn received_values_until_empty() {
    let channel = Channel::unbounded();
    for n in 0..3i64 {
        channel.send(Value::from(n)).expect("send");
    }
    let mut seen = Vec::new();
    Iterable::cast(&Handle::of(Value::channel(Type::I64, channel)), Config::new())
        .for_each_received(|item| {
            seen.push(item.get());
            Ok(())
        })
        .expect("drain");
    assert_eq!(
        seen,
        vec![
            Some(Value::from(0i64)),
            Some(Value::from(1i64)),
            Some(Value::from(2i64))
        ]
    );
}

#[test]
fn blocking_receive_waits_for_close() {
    let channel = Channel::bounded(1);
    let producer = {
        let channel = channel.clone();
        std::thread::spawn(move || {
            for n in 0..4i64 {
                channel.send(Value::from(n)).expect("send");
            }
            channel.close();
        })
    };
    let mut total = 0i64;
    Iterable::cast(
        &Handle::of(Value::channel(Type::I64, channel)),
        Config::new().block_channel(true),
    )
    .for_each_received(|item| {
        total += extract_int(item, &Config::new())?;
        Ok(())
    })
    .expect("drain");
    producer.join().expect("producer");
    assert_eq!(total, 6);
}

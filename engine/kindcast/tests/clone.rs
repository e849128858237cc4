use std::sync::Arc;

use kindcast::value::Chan;
use kindcast::{
    deep_clone, deep_clone_value, init_new, resolve, Channel, Handle, RecordType, Type, Value,
};

fn pointer_target(value: &Value) -> Arc<parking_lot::RwLock<Value>> {
    match value {
        Value::Pointer(ptr) => ptr.target.clone().expect("bound pointer"),
        other => panic!("expected pointer, found {other}"),
    }
}

#[test]
fn copy_owns_its_pointees() {
    let original = Handle::slot(Value::pointer_to(Value::from(5i64)));
    let copy = deep_clone(&original);
    assert!(copy.can_set());

    resolve::elem(&original)
        .set(Value::from(9i64))
        .expect("mutate original pointee");

    assert_eq!(resolve::elem(&copy).get(), Some(Value::from(5i64)));
    assert_eq!(resolve::elem(&original).get(), Some(Value::from(9i64)));
}

#[test]
fn shared_targets_stay_shared_in_the_copy() {
    let shared = Value::pointer_to(Value::from("x"));
    let list = Value::slice(
        Type::pointer(Type::STRING),
        vec![shared.clone(), shared.clone()],
    );
    let copy = deep_clone_value(&list);
    let items = copy.as_list().expect("list");

    let first = pointer_target(&items[0]);
    let second = pointer_target(&items[1]);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &pointer_target(&shared)));
}

#[test]
fn cyclic_graph_is_copied() {
    let node = Handle::slot(Value::nil_interface());
    let pointer = node.addr().expect("address");
    node.set(Value::interface(pointer)).expect("close loop");

    let copy = deep_clone(&node);
    let copied = copy.get().expect("copy");
    let Some(Value::Pointer(inner)) = copied.deref() else {
        panic!("expected pointer inside interface");
    };
    let target = inner.target.expect("bound");
    let original = node.shared().expect("slot");
    assert!(!Arc::ptr_eq(&target, original));

    // the copied cell points back at itself
    let contents = target.read().clone();
    let Some(Value::Pointer(again)) = contents.deref() else {
        panic!("expected pointer inside copied interface");
    };
    assert!(Arc::ptr_eq(&again.target.expect("bound"), &target));
}

#[test]
fn hidden_fields_are_zeroed() {
    let ty = RecordType::new("Session")
        .field("User", Type::STRING)
        .hidden_field("token", Type::STRING)
        .into_type();
    let mut value = Value::record(&ty, [("User", Value::from("ann"))]);
    if let Value::Record(record) = &mut value {
        if let Some(token) = record.field_mut("token") {
            *token = Value::from("secret");
        }
    }

    let copy = deep_clone_value(&value);
    assert_eq!(copy.field("User"), Some(&Value::from("ann")));
    assert_eq!(copy.field("token"), Some(&Value::from("")));
}

#[test]
fn channels_are_shared() {
    let channel = Channel::unbounded();
    let value = Value::channel(Type::I64, channel.clone());
    let Value::Chan(Chan {
        endpoint: Some(copied),
        ..
    }) = deep_clone_value(&value)
    else {
        panic!("expected bound channel");
    };
    assert!(copied.same_channel(&channel));
}

#[test]
fn read_only_and_invalid_handles() {
    let copy = deep_clone(&Handle::of(Value::from(3u8)));
    assert!(!copy.can_set());
    assert_eq!(copy.get(), Some(Value::from(3u8)));

    assert!(!deep_clone(&Handle::invalid()).is_valid());
}

#[test]
fn init_new_builds_zero_slot() {
    let fresh = init_new(&Handle::of(Value::from("text")));
    assert!(fresh.can_set());
    assert_eq!(fresh.get(), Some(Value::from("")));
    assert!(!init_new(&Handle::invalid()).is_valid());
}

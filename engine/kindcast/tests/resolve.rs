use kindcast::kind::{child_elem_kind, child_elem_ptr_kind, elem_kind};
use kindcast::resolve::{
    child_elem, child_indirect, elem, indirect, init_child_indirect, init_elem, unwrap_interface,
};
use kindcast::{Handle, Kind, Type, Value};

fn boxed_int() -> Value {
    Value::interface(Value::pointer_to(Value::from(4i32)))
}

// ============================================================================
// Kind classification
// ============================================================================

#[test]
fn kind_predicates() {
    assert!(Kind::Pointer.is_indirection());
    assert!(Kind::Interface.is_indirection());
    assert!(!Kind::Slice.is_indirection());
    assert!(Kind::Array.is_list() && Kind::Slice.is_list());
    assert!(Kind::Complex.is_numeric());
    assert!(Kind::String.is_scalar() && !Kind::Map.is_scalar());
    assert!(Kind::Chan.is_type_elemable());
    assert!(!Kind::Interface.is_type_elemable());
    assert!(Kind::Interface.is_elemable() && Kind::Record.is_elemable());
}

#[test]
fn well_known_types_report_their_carrier_kind() {
    assert_eq!(Type::Duration.kind(), Kind::Int);
    assert_eq!(Type::Time.kind(), Kind::Record);
    assert_eq!(Type::Ip.kind(), Kind::Slice);
    assert_eq!(Kind::of(&Handle::invalid()), Kind::Invalid);
}

#[test]
fn element_kinds() {
    let nested = Handle::of(Type::slice(Type::pointer(Type::map(Type::STRING, Type::F64))).zero());
    assert_eq!(elem_kind(&nested), Kind::Pointer);
    assert_eq!(child_elem_kind(&nested), Kind::Float);

    let pointer = Handle::of(Value::null_pointer(Type::pointer(Type::BOOL)));
    assert_eq!(child_elem_ptr_kind(&pointer), Kind::Bool);
    assert_eq!(child_elem_ptr_kind(&Handle::of(1u8)), Kind::Uint);

    let boxed = Handle::of(boxed_int());
    assert_eq!(elem_kind(&boxed), Kind::Pointer);
    assert_eq!(child_elem_kind(&boxed), Kind::Int);
    assert_eq!(child_elem_kind(&Handle::invalid()), Kind::Invalid);
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn elem_steps_once() {
    let boxed = Handle::of(boxed_int());
    let step = elem(&boxed);
    assert_eq!(step.kind(), Kind::Pointer);
    assert_eq!(elem(&step).get(), Some(Value::from(4i32)));

    let plain = Handle::of(2i64);
    assert_eq!(elem(&plain).get(), plain.get());
}

#[test]
fn child_elem_unwraps_everything() {
    let resolved = child_elem(&Handle::of(Value::pointer_to(boxed_int())));
    assert_eq!(resolved.get(), Some(Value::from(4i32)));
    assert!(resolved.can_set());
}

#[test]
fn nil_indirections_stop_resolution() {
    let null = Handle::of(Value::null_pointer(Type::I64));
    assert_eq!(child_elem(&null).kind(), Kind::Pointer);

    let nil = Handle::of(Value::nil_interface());
    assert_eq!(child_elem(&nil).kind(), Kind::Interface);
}

#[test]
fn indirect_leaves_interfaces_alone() {
    let boxed = Handle::of(boxed_int());
    assert_eq!(indirect(&boxed).kind(), Kind::Interface);
    assert_eq!(child_indirect(&boxed).kind(), Kind::Interface);

    let pointer = Handle::of(Value::pointer_to(boxed_int()));
    assert_eq!(child_indirect(&pointer).kind(), Kind::Interface);
    assert_eq!(unwrap_interface(&child_indirect(&pointer)).kind(), Kind::Pointer);
}

#[test]
fn init_variants_allocate_only_settable_pointers() {
    let slot = Handle::slot(Value::null_pointer(Type::STRING));
    let pointee = init_elem(&slot);
    assert!(pointee.can_set());
    assert_eq!(pointee.get(), Some(Value::from("")));
    // the allocation is visible through the original slot
    assert!(!slot.get().expect("value").is_nil());

    let detached = Handle::of(Value::null_pointer(Type::STRING));
    assert_eq!(init_child_indirect(&detached).kind(), Kind::Pointer);
}

#[test]
fn resolution_of_a_cycle_terminates() {
    let node = Handle::slot(Value::nil_interface());
    let pointer = node.addr().expect("address");
    node.set(Value::interface(pointer)).expect("close loop");
    assert!(child_elem(&node).is_valid());
}

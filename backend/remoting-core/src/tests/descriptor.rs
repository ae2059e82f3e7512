use crate::descriptor::{OperationDescriptor, OperationHandle, ParamValue};

use std::collections::HashSet;

/// **VALUE**: Descriptors built from the same name and parameters are one cache key.
///
/// **BUG THIS CATCHES**: Would catch a Hash impl that disagrees with Eq, which
/// would make the registry register the same operation twice.
#[test]
fn given_identical_descriptors_when_hashed_then_collapse_to_one_entry() {
    // GIVEN: Two independently built but identical descriptors
    let a = OperationDescriptor::new("add-property")
        .with_param("key", "x")
        .with_param("value", 1);
    let b = OperationDescriptor::new("add-property")
        .with_param("key", "x")
        .with_param("value", 1);

    // WHEN: Inserting both into a set
    let set: HashSet<_> = [a.clone(), b].into_iter().collect();

    // THEN: Only one entry remains
    assert_eq!(set.len(), 1);
    assert!(set.contains(&a));
}

/// **VALUE**: A single differing parameter value yields a different key.
#[test]
fn given_different_param_value_when_compared_then_not_equal() {
    let a = OperationDescriptor::new("add-property").with_param("value", 1);
    let b = OperationDescriptor::new("add-property").with_param("value", 2);
    let c = OperationDescriptor::new("add-property").with_param("value", "1");

    assert_ne!(a, b);
    assert_ne!(a, c, "Integer and text parameters must not compare equal");
}

#[test]
fn given_same_params_in_different_order_when_compared_then_not_equal() {
    let a = OperationDescriptor::new("op")
        .with_param("a", true)
        .with_param("b", false);
    let b = OperationDescriptor::new("op")
        .with_param("b", false)
        .with_param("a", true);

    assert_ne!(a, b);
}

#[test]
fn given_existing_param_when_with_param_called_again_then_replaced_in_place() {
    // GIVEN: A descriptor with two parameters
    let descriptor = OperationDescriptor::new("op")
        .with_param("first", 1)
        .with_param("second", 2);

    // WHEN: Overriding the first one
    let descriptor = descriptor.with_param("first", 10);

    // THEN: Order is kept and only the value changed
    let names: Vec<_> = descriptor.params().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(descriptor.param("first"), Some(&ParamValue::Integer(10)));
}

/// **VALUE**: Floats participate in hashing by bit pattern.
///
/// **BUG THIS CATCHES**: Would catch NaN parameters making a descriptor unequal
/// to itself, which would leak a fresh registration on every call.
#[test]
fn given_nan_param_when_compared_to_itself_then_equal() {
    let descriptor = OperationDescriptor::new("op").with_param("ratio", f64::NAN);

    assert_eq!(descriptor, descriptor.clone());
}

#[test]
fn given_descriptor_when_displayed_then_lists_params_in_order() {
    let descriptor = OperationDescriptor::new("add-property")
        .with_param("key", "name")
        .with_param("enabled", true)
        .with_param(
            "tags",
            ParamValue::List(vec![ParamValue::from("a"), ParamValue::Null]),
        );

    assert_eq!(
        descriptor.to_string(),
        r#"add-property{key="name", enabled=true, tags=["a", null]}"#
    );
}

#[test]
fn given_handle_when_displayed_then_prefixed_with_hash() {
    assert_eq!(OperationHandle(7).to_string(), "#7");
}

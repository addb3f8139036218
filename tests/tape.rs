use std::panic::{catch_unwind, AssertUnwindSafe};

use gradix::prim::{head, sum};
use gradix::tape::Context;
use gradix::vector;

#[test]
fn test_scalar_add_backward() {
    let ctx = Context::new();
    let a = ctx.scalar(2.0);
    let b = ctx.scalar(3.0);
    let s = &a + &b;
    assert_eq!(s.value(), 5.0);
    s.backward();
    assert_eq!(a.adjoint(), 1.0);
    assert_eq!(b.adjoint(), 1.0);
}

#[test]
fn test_fan_out_accumulates() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0, 3.0]);
    let h2 = head(&v, 2).unwrap();
    let h3 = head(&v, 3).unwrap();
    let s = &sum(&h2) + &sum(&h3);
    s.backward();
    assert_eq!(v.adjoint().as_slice(), &[2.0, 2.0, 1.0]);
}

#[test]
fn test_clone_aliases_slot() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0]);
    let alias = v.clone();
    let s = sum(&v);
    s.backward();
    assert_eq!(alias.adjoint().as_slice(), &[1.0, 1.0]);
}

#[test]
fn test_one_node_per_primitive_call() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0, 3.0]);
    let h = head(&v, 2).unwrap();
    let _s = sum(&h);
    assert_eq!(ctx.node_count(), 2);
}

#[test]
fn test_append_after_backward_panics() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0]);
    let s = sum(&v);
    s.backward();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = sum(&v);
    }));
    assert!(result.is_err());
}

#[test]
fn test_reset_allows_reuse() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0]);
    let s = sum(&v);
    s.backward();
    ctx.reset();
    assert_eq!(ctx.node_count(), 0);
    let w = ctx.matrix(vector![4.0, 5.0]);
    let t = sum(&w);
    t.backward();
    assert_eq!(w.adjoint().as_slice(), &[1.0, 1.0]);
}

#[test]
fn test_truncate_reclaims_segment() {
    let ctx = Context::new();
    let v = ctx.matrix(vector![1.0, 2.0]);
    let mark = ctx.mark();
    let _inner = sum(&v);
    assert_eq!(ctx.node_count(), 1);
    ctx.truncate(mark);
    assert_eq!(ctx.node_count(), 0);
    let s = sum(&v);
    s.backward();
    assert_eq!(v.adjoint().as_slice(), &[1.0, 1.0]);
}

use std::fmt::Debug;

use futures::executor::block_on;
use futures::future::{BoxFuture, FutureExt};
use smallfn::space::{S1, S2};
use smallfn::{Error, Function, SboFunction, SmallFn, UniqueFunction};
use static_assertions::{assert_impl_all, assert_not_impl_any};

assert_impl_all!(Function<fn()>: Clone, Default, Debug);
assert_impl_all!(UniqueFunction<fn() -> u8>: Default, Debug);
assert_not_impl_any!(UniqueFunction<fn()>: Clone);
assert_not_impl_any!(Function<fn()>: Send, Sync);
assert_not_impl_any!(UniqueFunction<fn()>: Send, Sync);

#[test]
fn move_only_callable() {
    let buffer = vec![1u8, 2, 3];
    let mut drain: UniqueFunction<fn() -> Option<u8>> = UniqueFunction::empty();
    let mut iter = buffer.into_iter();
    drain.set(move || iter.next());

    assert_eq!(drain.call(), Ok(Some(1)));
    let mut moved = drain.take();
    assert_eq!(drain.call(), Err(Error::EmptyCall));
    assert_eq!(moved.call(), Ok(Some(2)));
    assert_eq!(moved.call(), Ok(Some(3)));
    assert_eq!(moved.call(), Ok(None));
}

#[test]
fn move_only_external() {
    struct Ledger {
        entries: Vec<i64>,
        padding: [i64; 4],
    }

    let mut ledger = Ledger {
        entries: Vec::new(),
        padding: [0; 4],
    };
    let mut record: UniqueFunction<fn(i64) -> i64, S1> = UniqueFunction::new(move |x: i64| {
        ledger.entries.push(x);
        ledger.entries.iter().sum::<i64>() + ledger.padding.iter().sum::<i64>()
    });
    assert!(record.is_external());
    assert_eq!(record.call(4), Ok(4));
    assert_eq!(record.call(-1), Ok(3));

    let mut other: UniqueFunction<fn(i64) -> i64, S1> = UniqueFunction::new(|x: i64| x);
    record.swap(&mut other).unwrap();
    assert_eq!(record.call(7), Ok(7));
    assert_eq!(other.call(7), Ok(10));
}

#[test]
fn async_callable() {
    let base = 40u32;
    let mut f: SboFunction<fn(u32) -> BoxFuture<'static, u32>, S2> =
        SboFunction::new(move |x: u32| async move { base + x }.boxed());
    assert!(f.is_inline());

    let mut copy = f.clone();
    assert_eq!(block_on(f.call(2).unwrap()), 42);
    assert_eq!(block_on(copy.call(1).unwrap()), 41);
}

#[test]
fn callback_chain() {
    let mut steps: Vec<SmallFn<fn(u32) -> u32>> = Vec::new();
    steps.push(SmallFn::new(|x: u32| x + 1));
    steps.push(SmallFn::from_fn(u32::reverse_bits));
    steps.push(SmallFn::new(|x: u32| x.rotate_left(1)));
    steps.push(SmallFn::default());

    let mut value = 0u32;
    let mut errors = 0;
    for step in &mut steps {
        match step.call(value) {
            Ok(next) => value = next,
            Err(Error::EmptyCall) => errors += 1,
            Err(other) => panic!("unexpected {other}"),
        }
    }
    assert_eq!(value, 1);
    assert_eq!(errors, 1);
}

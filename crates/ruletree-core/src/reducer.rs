//! Ordered left-fold with deferred steps and early exit.
//!
//! Items are evaluated strictly in order. While every evaluation is ready the
//! fold stays synchronous. The first pending evaluation switches modes: every
//! remaining item is evaluated (dispatched, not awaited), all outstanding
//! results are awaited together, and `combine` is replayed over them in the
//! original order. Early exit and result order are the same in both modes.

use futures::future::join_all;
use std::ops::ControlFlow;

use crate::deferred::Deferred;

/// Fold `items` into an accumulator.
///
/// - `evaluate(acc, item, index)` produces the per-item value, ready or pending.
/// - `combine(acc, value, index)` folds a value in; `ControlFlow::Break(exit)`
///   stops the fold and makes `exit` the result without evaluating further items
///   (in synchronous mode) or combining further values (after a switch).
/// - `finalize(acc)` maps the accumulator to the result when no exit happened.
pub fn reduce<T, K, A, O, Ev, Co, Fin>(
    items: impl IntoIterator<Item = T>,
    mut evaluate: Ev,
    mut combine: Co,
    initial: A,
    finalize: Fin,
) -> Deferred<O>
where
    Ev: FnMut(&A, T, usize) -> Deferred<K>,
    Co: FnMut(A, K, usize) -> ControlFlow<O, A> + Send + 'static,
    Fin: FnOnce(A) -> O + Send + 'static,
    K: Send + 'static,
    A: Send + 'static,
    O: Send + 'static,
{
    let mut acc = initial;
    let mut items = items.into_iter().enumerate();

    while let Some((index, item)) = items.next() {
        match evaluate(&acc, item, index) {
            Deferred::Ready(value) => match combine(acc, value, index) {
                ControlFlow::Continue(next) => acc = next,
                ControlFlow::Break(exit) => return Deferred::Ready(exit),
            },
            Deferred::Pending(first) => {
                let mut indices = vec![index];
                let mut outstanding = vec![first];
                for (index, item) in items.by_ref() {
                    indices.push(index);
                    outstanding.push(evaluate(&acc, item, index).into_future());
                }

                return Deferred::pending(async move {
                    let values = join_all(outstanding).await;
                    let mut acc = acc;
                    for (index, value) in indices.into_iter().zip(values) {
                        match combine(acc, value, index) {
                            ControlFlow::Continue(next) => acc = next,
                            ControlFlow::Break(exit) => return exit,
                        }
                    }
                    finalize(acc)
                });
            }
        }
    }

    Deferred::Ready(finalize(acc))
}

/// `reduce` without a finalizer: the accumulator is the result.
pub fn fold<T, K, A, Ev, Co>(
    items: impl IntoIterator<Item = T>,
    evaluate: Ev,
    combine: Co,
    initial: A,
) -> Deferred<A>
where
    Ev: FnMut(&A, T, usize) -> Deferred<K>,
    Co: FnMut(A, K, usize) -> ControlFlow<A, A> + Send + 'static,
    K: Send + 'static,
    A: Send + 'static,
{
    reduce(items, evaluate, combine, initial, |acc| acc)
}

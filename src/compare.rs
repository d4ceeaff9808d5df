/*! Comparators as values

# About
Every heap in this crate is polymorphic over *how* its elements are ordered, not just over
what they contain. Instead of a `T: Ord` bound (which forces one blessed ordering per type
and pushes callers toward wrapper types like [`std::cmp::Reverse`]), a heap owns a value
implementing [`Compare`] and consults it for every decision.

A comparator can be a zero-sized marker like [`NaturalOrder`], an adapter like [`Reverse`],
or any closure of the right shape, so call sites stay light:

```rust
    use heapred::compare::{Compare, NaturalOrder, Reverse};
    use std::cmp::Ordering;

    let natural = NaturalOrder;
    assert_eq!(natural.compare(&1, &2), Ordering::Less);

    let backwards = Reverse(NaturalOrder);
    assert_eq!(backwards.compare(&1, &2), Ordering::Greater);

    // Closures work too, e.g. ordering jobs by priority field only
    let by_len = |a: &&str, b: &&str| a.len().cmp(&b.len());
    assert_eq!(by_len.compare(&"ox", &"owl"), Ordering::Less);
```
*/

use std::cmp::Ordering;

/// A total order over `T`, owned by the structure that sorts with it.
pub trait Compare<T> {
    fn compare(&self, first: &T, second: &T) -> Ordering;
}

/// Orders elements by their `Ord` implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<T: Ord> Compare<T> for NaturalOrder {
    fn compare(&self, first: &T, second: &T) -> Ordering {
        first.cmp(second)
    }
}

/// Inverts another comparator, turning a min-heap into a max-heap and vice versa.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reverse<C>(pub C);

impl<T, C: Compare<T>> Compare<T> for Reverse<C> {
    fn compare(&self, first: &T, second: &T) -> Ordering {
        self.0.compare(second, first)
    }
}

// Any ordering closure is a comparator.
impl<T, F> Compare<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, first: &T, second: &T) -> Ordering {
        self(first, second)
    }
}

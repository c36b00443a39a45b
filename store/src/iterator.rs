//! Ordered merge over two table generations.
//!
//! Epoch-0 and epoch-1 tables coexist; callers that want "all accounts" or
//! "all pending" need one pass in combined key order. The merge is
//! restartable from any key by seeding both sides with `iter_from`.

use std::iter::Peekable;

/// Merge two key-ordered iterators into one, preferring the second
/// generation when both carry the same key.
pub struct MergeIter<'a, A, B>
where
    A: Iterator<Item = (&'a [u8], &'a [u8])>,
    B: Iterator<Item = (&'a [u8], &'a [u8])>,
{
    v0: Peekable<A>,
    v1: Peekable<B>,
}

/// Which generation an entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    V0,
    V1,
}

impl<'a, A, B> MergeIter<'a, A, B>
where
    A: Iterator<Item = (&'a [u8], &'a [u8])>,
    B: Iterator<Item = (&'a [u8], &'a [u8])>,
{
    pub fn new(v0: A, v1: B) -> Self {
        Self {
            v0: v0.peekable(),
            v1: v1.peekable(),
        }
    }
}

impl<'a, A, B> Iterator for MergeIter<'a, A, B>
where
    A: Iterator<Item = (&'a [u8], &'a [u8])>,
    B: Iterator<Item = (&'a [u8], &'a [u8])>,
{
    type Item = (&'a [u8], &'a [u8], Generation);

    fn next(&mut self) -> Option<Self::Item> {
        match (self.v0.peek(), self.v1.peek()) {
            (None, None) => None,
            (Some(_), None) => {
                let (k, v) = self.v0.next().expect("peeked");
                Some((k, v, Generation::V0))
            }
            (None, Some(_)) => {
                let (k, v) = self.v1.next().expect("peeked");
                Some((k, v, Generation::V1))
            }
            (Some((k0, _)), Some((k1, _))) => {
                if k0 < k1 {
                    let (k, v) = self.v0.next().expect("peeked");
                    Some((k, v, Generation::V0))
                } else {
                    if k0 == k1 {
                        // A key can only live in one generation; drop the stale side.
                        self.v0.next();
                    }
                    let (k, v) = self.v1.next().expect("peeked");
                    Some((k, v, Generation::V1))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&'static [u8], &'static [u8])]) -> Vec<(&'static [u8], &'static [u8])> {
        items.to_vec()
    }

    #[test]
    fn interleaves_in_key_order() {
        let v0 = pairs(&[(b"a", b"0"), (b"c", b"0"), (b"e", b"0")]);
        let v1 = pairs(&[(b"b", b"1"), (b"d", b"1")]);
        let merged: Vec<&[u8]> = MergeIter::new(v0.into_iter(), v1.into_iter())
            .map(|(k, _, _)| k)
            .collect();
        assert_eq!(merged, vec![&b"a"[..], b"b", b"c", b"d", b"e"]);
    }

    #[test]
    fn duplicate_key_prefers_v1() {
        let v0 = pairs(&[(b"a", b"old")]);
        let v1 = pairs(&[(b"a", b"new")]);
        let merged: Vec<(&[u8], &[u8], Generation)> =
            MergeIter::new(v0.into_iter(), v1.into_iter()).collect();
        assert_eq!(merged, vec![(&b"a"[..], &b"new"[..], Generation::V1)]);
    }

    #[test]
    fn either_side_may_be_empty() {
        let v0 = pairs(&[(b"x", b"0")]);
        let empty = pairs(&[]);
        assert_eq!(
            MergeIter::new(v0.clone().into_iter(), empty.clone().into_iter()).count(),
            1
        );
        assert_eq!(
            MergeIter::new(empty.clone().into_iter(), v0.into_iter()).count(),
            1
        );
        assert_eq!(
            MergeIter::new(empty.clone().into_iter(), empty.into_iter()).count(),
            0
        );
    }
}

/*! Delimiter scanning and the per-chunk token store

# About
The map half of the word-frequency pipeline. A *token* is a maximal run of non-delimiter
bytes; a [`TokenStore`] is the ordered, deduplicated set of `(token, rate)` pairs one
worker produced from its chunk, ready to be pairwise merged with its siblings during the
reduce phase.

Tokens never copy input bytes. A [`Token`] borrows its slice straight out of the mapped
input buffer, so a store is just bookkeeping around `(&[u8], count)` pairs — the only
allocations are the list nodes and the dedup tree, and the dedup tree dies as soon as
tokenization finishes.

# Design
A byte is a delimiter when it is ASCII whitespace or ASCII punctuation, the same class C's
`isspace`/`ispunct` carve out in the default locale (including vertical tab, which Rust's
`is_ascii_whitespace` alone would miss). A NUL byte terminates scanning: the scan
primitives stop at it, and [`TokenStore::tokenize`] gives up on the rest of the chunk.

Tokenization alternates skip-delimiters / consume-token, registering each token into an
[`AvlTree`](crate::hierarchies::avl_tree::AvlTree) keyed on the byte slice — lookup hit
bumps the rate, miss inserts. Flattening is just the tree's inorder walk queued into a
[singly-linked list](crate::sequences::singly_linked_list::SList), which comes out sorted
by construction.

Merging two stores leans on the list's O(1) splice: walk the result list, splice in the
longest source prefix that fits before each position, and fold the rates of equal tokens.
Linear in the sum of both store sizes, no per-token allocation, and the source ends up
empty — which is exactly the shape the reduce phase wants.

# Example
```rust
    use heapred::mapred::token::TokenStore;

    let input = b"foo bar foo. baz";
    let mut store = TokenStore::new();
    store.tokenize(input);

    let tokens: Vec<(&[u8], u32)> = store.iter().map(|t| (t.data, t.rate)).collect();
    assert_eq!(tokens, [(&b"bar"[..], 1), (&b"baz"[..], 1), (&b"foo"[..], 2)]);
    assert_eq!(store.unique(), 3);
    assert_eq!(store.total(), 4);
```
*/

use crate::compare::NaturalOrder;
use crate::hierarchies::avl_tree::AvlTree;
use crate::sequences::singly_linked_list::SList;
use std::cmp::Ordering;
use std::io::{self, Write};

/// Returns `true` for the bytes that separate tokens: ASCII whitespace
/// (including vertical tab, as C's `isspace`) or ASCII punctuation.
pub fn is_delim(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0x0b || byte.is_ascii_punctuation()
}

/// Length of the delimiter run at the front of `data`; a NUL byte stops the
/// scan early.
pub fn forward_delim_len(data: &[u8]) -> usize {
    data.iter()
        .position(|&b| b == 0 || !is_delim(b))
        .unwrap_or(data.len())
}

/// Length of the token at the front of `data`; a NUL byte stops the scan
/// early.
pub fn forward_token_len(data: &[u8]) -> usize {
    data.iter()
        .position(|&b| b == 0 || is_delim(b))
        .unwrap_or(data.len())
}

/// Length of the (possibly partial) token hanging off the back of `data`; a
/// NUL byte stops the scan early.
pub fn backward_token_len(data: &[u8]) -> usize {
    data.iter()
        .rev()
        .position(|&b| b == 0 || is_delim(b))
        .unwrap_or(data.len())
}

/// One unique token: a byte slice borrowed from the input and its occurrence
/// count. Ordering and equality consider the bytes only.
#[derive(Clone, Copy, Debug)]
pub struct Token<'a> {
    pub data: &'a [u8],
    pub rate: u32,
}

impl PartialEq for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}
impl Eq for Token<'_> {}

impl PartialOrd for Token<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Token<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Bytewise lexicographic with the shorter-is-less tie break, i.e.
        // memcmp of the common prefix then the length difference
        self.data.cmp(other.data)
    }
}

/// # About
/// An ordered, deduplicated sequence of [`Token`]s with their counts.
///
/// See the [module-level documentation](crate::mapred::token) for more
/// information.
#[derive(Debug, Default)]
pub struct TokenStore<'a> {
    list: SList<Token<'a>>,
    unique: usize,
}

impl<'a> TokenStore<'a> {
    /// Creates an empty store.
    pub fn new() -> Self {
        TokenStore {
            list: SList::new(),
            unique: 0,
        }
    }

    /// Returns the number of unique tokens.
    pub fn unique(&self) -> usize {
        self.unique
    }

    /// Returns `true` if the store holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.unique == 0
    }

    /// Returns the total number of token occurrences (the sum of all rates).
    pub fn total(&self) -> u32 {
        self.list.iter().map(|token| token.rate).sum()
    }

    /// Returns an iterator over the tokens in byte-lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Token<'a>> {
        self.list.iter()
    }

    /// Scans `data` into this (empty) store: skip a delimiter run, consume a
    /// token, register it, repeat. A NUL byte abandons the rest of the chunk.
    ///
    /// Registration dedups through an AVL tree keyed on the token bytes; the
    /// final flatten walks the tree inorder into the sorted token list.
    pub fn tokenize(&mut self, data: &'a [u8]) {
        assert!(self.is_empty(), "tokenize into a non-empty store");

        let mut index: AvlTree<Token<'a>> = AvlTree::new();
        let mut rest = data;

        while !rest.is_empty() {
            let delims = forward_delim_len(rest);
            rest = &rest[delims..];

            let len = forward_token_len(rest);
            if len > 0 {
                let probe = Token {
                    data: &rest[..len],
                    rate: 1,
                };
                match index.get_mut(&probe) {
                    Some(token) => token.rate += 1,
                    None => {
                        index.insert(probe);
                    }
                }
            }
            rest = &rest[len..];

            if delims == 0 && len == 0 {
                // Neither scan advanced: a NUL terminated the chunk
                break;
            }
        }

        // Flatten: the inorder walk hands the tokens over already sorted
        for token in index.iter() {
            self.list.push_back(*token);
        }
        self.unique = index.len();
    }

    /// Merges `source` into this store in O(n + m) time, folding the rates of
    /// tokens present in both and leaving `source` empty.
    pub fn merge(&mut self, source: &mut TokenStore<'a>) {
        if source.is_empty() {
            return;
        }
        if self.is_empty() {
            std::mem::swap(self, source);
            return;
        }

        let moved = self.list.merge_dedup(&mut source.list, &NaturalOrder, |kept, dropped| {
            kept.rate += dropped.rate;
        });

        self.unique += moved;
        source.unique = 0;
    }

    /// Writes one `token: rate` line per token plus the totals trailer.
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        let mut total = 0u32;

        for token in self.list.iter() {
            total += token.rate;
            writeln!(
                out,
                "{}: {}",
                String::from_utf8_lossy(token.data),
                token.rate
            )?;
        }

        writeln!(
            out,
            "Total number of tokens: {} unique out of {}",
            self.unique, total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries<'a>(store: &TokenStore<'a>) -> Vec<(&'a [u8], u32)> {
        store.iter().map(|t| (t.data, t.rate)).collect()
    }

    fn store_from(pairs: &[(&'static [u8], u32)]) -> TokenStore<'static> {
        let mut store = TokenStore::new();
        for &(data, rate) in pairs {
            store.list.push_back(Token { data, rate });
            store.unique += 1;
        }
        store
    }

    #[test]
    fn delimiter_class_matches_c_locale() {
        assert!(is_delim(b' '));
        assert!(is_delim(b'\t'));
        assert!(is_delim(b'\n'));
        assert!(is_delim(0x0b)); // vertical tab
        assert!(is_delim(b'\r'));
        assert!(is_delim(b'.'));
        assert!(is_delim(b'!'));
        assert!(is_delim(b'~'));

        assert!(!is_delim(b'a'));
        assert!(!is_delim(b'Z'));
        assert!(!is_delim(b'0'));
        assert!(!is_delim(0x00)); // NUL terminates, it does not delimit
        assert!(!is_delim(0x80)); // non-ASCII is token material
    }

    #[test]
    fn scan_primitives() {
        assert_eq!(forward_delim_len(b"  , foo"), 4);
        assert_eq!(forward_delim_len(b"foo"), 0);
        assert_eq!(forward_delim_len(b"  \0  "), 2);

        assert_eq!(forward_token_len(b"foo bar"), 3);
        assert_eq!(forward_token_len(b" foo"), 0);
        assert_eq!(forward_token_len(b"foo\0bar"), 3);

        assert_eq!(backward_token_len(b"foo bar"), 3);
        assert_eq!(backward_token_len(b"foo bar "), 0);
        assert_eq!(backward_token_len(b"foobar"), 6);
        assert_eq!(backward_token_len(b"foo\0bar"), 3);
    }

    #[test]
    fn tokenize_counts_and_sorts() {
        let mut store = TokenStore::new();
        store.tokenize(b"the quick brown fox, the lazy dog; the end.");

        assert_eq!(
            entries(&store),
            [
                (&b"brown"[..], 1),
                (&b"dog"[..], 1),
                (&b"end"[..], 1),
                (&b"fox"[..], 1),
                (&b"lazy"[..], 1),
                (&b"quick"[..], 1),
                (&b"the"[..], 3),
            ]
        );
        assert_eq!(store.unique(), 7);
        assert_eq!(store.total(), 9);
    }

    #[test]
    fn nul_terminates_the_chunk() {
        let mut store = TokenStore::new();
        store.tokenize(b"foo bar\0baz qux");

        assert_eq!(entries(&store), [(&b"bar"[..], 1), (&b"foo"[..], 1)]);
    }

    #[test]
    fn delimiter_only_chunk_is_empty() {
        let mut store = TokenStore::new();
        store.tokenize(b" .,;! \t\n");
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn merge_accumulates_and_drains() {
        // The reference merge scenario: equal tokens fold, the rest splice in
        let mut result = store_from(&[(b"0", 1), (b"5", 1)]);
        let mut source = store_from(&[(b"0", 1), (b"2", 1)]);

        result.merge(&mut source);

        assert_eq!(
            entries(&result),
            [(&b"0"[..], 2), (&b"2"[..], 1), (&b"5"[..], 1)]
        );
        assert_eq!(result.unique(), 3);
        assert_eq!(source.unique(), 0);
        assert!(source.is_empty());
    }

    #[test]
    fn merge_agrees_with_single_pass() {
        let left = b"foo bar foo. baz";
        let right = b"bar foo! qux bar";
        let both = b"foo bar foo. baz bar foo! qux bar";

        let mut a = TokenStore::new();
        a.tokenize(left);
        let mut b = TokenStore::new();
        b.tokenize(right);
        a.merge(&mut b);

        let mut expect = TokenStore::new();
        expect.tokenize(both);

        assert_eq!(entries(&a), entries(&expect));
        assert_eq!(a.unique(), expect.unique());
        assert_eq!(a.total(), expect.total());
    }

    #[test]
    fn merge_into_empty_adopts_source() {
        let mut result = TokenStore::new();
        let mut source = store_from(&[(b"a", 2), (b"b", 1)]);

        result.merge(&mut source);
        assert_eq!(entries(&result), [(&b"a"[..], 2), (&b"b"[..], 1)]);
        assert!(source.is_empty());
    }

    #[test]
    fn dump_format() {
        let store = store_from(&[(b"bar", 2), (b"baz", 1), (b"foo", 3)]);

        let mut out = Vec::new();
        store.dump(&mut out).expect("writing to a Vec cannot fail");

        let text = String::from_utf8(out).expect("ascii output");
        assert_eq!(
            text,
            "bar: 2\nbaz: 1\nfoo: 3\nTotal number of tokens: 3 unique out of 6\n"
        );
    }
}

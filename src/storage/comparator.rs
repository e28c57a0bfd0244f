//! Composite key comparator for ordered stores.
//!
//! Keys are byte strings made of comma-joined segments. The comparator
//! decides segment-by-segment, left to right, with an independently
//! configured direction per segment position. One implementation serves
//! every ordered table in the crate: postings and words-per-post are all
//! ascending, tag entries are tag ascending + post id descending.
//!
//! The comparator carries an identity name derived from its direction list.
//! The name is persisted alongside the data so that a store created with one
//! ordering can never be reopened with another (scan order would silently
//! corrupt otherwise).
//!
//! # Examples
//!
//! ```
//! use std::cmp::Ordering;
//! use sedge::storage::comparator::{CompositeComparator, Direction};
//!
//! let cmp = CompositeComparator::new(vec![Direction::Asc, Direction::Desc]);
//! // First segment ascending, second descending: newest post id first.
//! assert_eq!(cmp.compare(b"rust,20", b"rust,10"), Ordering::Less);
//! assert_eq!(cmp.compare(b"go,99", b"rust,10"), Ordering::Less);
//! ```

use std::cmp::Ordering;

/// Sort direction for one segment position of a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smaller segment bytes sort first; a segment boundary sorts before any byte.
    Asc,
    /// Larger segment bytes sort first; a segment boundary sorts after any byte.
    Desc,
}

/// A total order over comma-joined composite keys.
///
/// Segment positions past the configured direction list default to
/// ascending, so keys with differing segment counts still compare under a
/// strict total order.
#[derive(Debug, Clone)]
pub struct CompositeComparator {
    directions: Vec<Direction>,
    name: String,
}

impl CompositeComparator {
    /// Create a comparator with the given per-segment directions.
    pub fn new(directions: Vec<Direction>) -> Self {
        let name = format!(
            "comma({})",
            directions
                .iter()
                .map(|d| match d {
                    Direction::Asc => "asc",
                    Direction::Desc => "desc",
                })
                .collect::<Vec<_>>()
                .join(",")
        );
        CompositeComparator { directions, name }
    }

    /// Create a comparator that orders every segment ascending.
    pub fn ascending() -> Self {
        CompositeComparator::new(Vec::new())
    }

    /// Identity name of this ordering, persisted with the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured per-segment directions.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Direction configured for segment position `index`.
    fn direction(&self, index: usize) -> Direction {
        self.directions.get(index).copied().unwrap_or(Direction::Asc)
    }

    /// Compare two composite keys segment-by-segment.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let mut a_segs = a.split(|&byte| byte == b',');
        let mut b_segs = b.split(|&byte| byte == b',');

        let mut position = 0;
        loop {
            let ordering = match (a_segs.next(), b_segs.next()) {
                (Some(sa), Some(sb)) => sa.cmp(sb),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => return Ordering::Equal,
            };

            if ordering != Ordering::Equal {
                return match self.direction(position) {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
            }

            position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_is_lexicographic_per_segment() {
        let cmp = CompositeComparator::ascending();
        assert_eq!(cmp.compare(b"alpha,1", b"alpha,2"), Ordering::Less);
        assert_eq!(cmp.compare(b"alpha,2", b"beta,1"), Ordering::Less);
        assert_eq!(cmp.compare(b"beta", b"beta"), Ordering::Equal);
    }

    #[test]
    fn test_descending_second_segment() {
        let cmp = CompositeComparator::new(vec![Direction::Asc, Direction::Desc]);
        assert_eq!(cmp.compare(b"tag,9", b"tag,8"), Ordering::Less);
        assert_eq!(cmp.compare(b"tag,10", b"tag,9"), Ordering::Greater);
        // First segment still decides ascending.
        assert_eq!(cmp.compare(b"atag,1", b"btag,9"), Ordering::Less);
    }

    #[test]
    fn test_segment_boundary_ordering() {
        let asc = CompositeComparator::ascending();
        // A shorter segment (boundary) sorts before any continuation byte.
        assert_eq!(asc.compare(b"ab,x", b"abc,x"), Ordering::Less);

        let desc = CompositeComparator::new(vec![Direction::Desc]);
        assert_eq!(desc.compare(b"ab,x", b"abc,x"), Ordering::Greater);
    }

    #[test]
    fn test_missing_trailing_segments() {
        let cmp = CompositeComparator::ascending();
        assert_eq!(cmp.compare(b"word", b"word,42"), Ordering::Less);
        assert_eq!(cmp.compare(b"word,42", b"word"), Ordering::Greater);
    }

    #[test]
    fn test_directions_past_configured_list_default_ascending() {
        let cmp = CompositeComparator::new(vec![Direction::Desc]);
        assert_eq!(cmp.compare(b"z,1,5", b"z,1,6"), Ordering::Less);
    }

    #[test]
    fn test_name_identity() {
        let cmp = CompositeComparator::new(vec![Direction::Asc, Direction::Desc]);
        assert_eq!(cmp.name(), "comma(asc,desc)");
        assert_eq!(CompositeComparator::ascending().name(), "comma()");
    }
}

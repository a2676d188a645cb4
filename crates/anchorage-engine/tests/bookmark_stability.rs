//! Bookmarks keep pointing at the same text while the document is edited

use std::ops::Range;

use anchorage_engine::{AnchorBuffer, BookmarkError, BookmarkId, BookmarkStore, TextBuffer};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_insert_before_bookmark_shifts_range() {
    let mut buffer = TextBuffer::from("hello world");
    let mut store = BookmarkStore::new();
    store.add(&mut buffer, 0, 5, "greet", None).unwrap();

    buffer.insert(0, "XYZ").unwrap();

    let id = store.find_by_name("greet").unwrap().id;
    let (start, end) = store.navigate(&buffer, id).unwrap();
    assert_eq!((start, end), (3, 8));
    assert_eq!(buffer.slice(start..end).unwrap(), "hello");
}

#[rstest]
#[case::cursor(4, 4)]
#[case::word(6, 11)]
#[case::whole(0, 11)]
fn test_add_then_navigate_round_trips(#[case] start: usize, #[case] end: usize) {
    let mut buffer = TextBuffer::from("hello world");
    let mut store = BookmarkStore::new();

    let id = store.add(&mut buffer, start, end, "mark", None).unwrap();

    assert_eq!(store.navigate(&buffer, id).unwrap(), (start, end));
}

#[test]
fn test_start_after_end_is_invalid() {
    let mut buffer = TextBuffer::from("hello world");
    let mut store = BookmarkStore::new();

    let result = store.add(&mut buffer, 6, 2, "bad", None);

    assert_eq!(result, Err(BookmarkError::InvalidRange { start: 6, end: 2 }));
    assert!(store.is_empty());
}

#[test]
fn test_navigate_after_delete_is_not_found() {
    let mut buffer = TextBuffer::from("hello world");
    let mut store = BookmarkStore::new();
    let id = store.add(&mut buffer, 0, 5, "greet", None).unwrap();

    store.delete(id).unwrap();

    assert_eq!(store.navigate(&buffer, id), Err(BookmarkError::NotFound(id)));
    assert_eq!(store.rename(id, "x"), Err(BookmarkError::NotFound(id)));
    assert_eq!(store.reparent(id, None), Err(BookmarkError::NotFound(id)));
}

#[test]
fn test_reparent_into_self_or_descendant_is_rejected() {
    let mut buffer = TextBuffer::from("0123456789");
    let mut store = BookmarkStore::new();
    let top = store.add(&mut buffer, 0, 9, "top", None).unwrap();
    let middle = store.add(&mut buffer, 1, 8, "middle", Some(top)).unwrap();
    let leaf = store.add(&mut buffer, 2, 7, "leaf", Some(middle)).unwrap();
    let before: Vec<_> = store.iter().map(|(depth, b)| (depth, b.id)).collect();

    assert_eq!(
        store.reparent(top, Some(top)),
        Err(BookmarkError::CycleDetected {
            id: top,
            parent: top
        })
    );
    assert_eq!(
        store.reparent(top, Some(leaf)),
        Err(BookmarkError::CycleDetected {
            id: top,
            parent: leaf
        })
    );

    let after: Vec<_> = store.iter().map(|(depth, b)| (depth, b.id)).collect();
    assert_eq!(before, after);
}

#[test]
fn test_zero_width_bookmark_survives_insert_at_cursor() {
    let mut buffer = TextBuffer::from("hello world");
    let mut store = BookmarkStore::new();
    let id = store.add(&mut buffer, 5, 5, "cursor", None).unwrap();

    buffer.insert(5, ",").unwrap();

    let (start, end) = store.navigate(&buffer, id).unwrap();
    assert!(start <= end);
    assert_eq!((start, end), (6, 6));
}

#[test]
fn test_deleting_bookmarked_text_collapses_range() {
    let mut buffer = TextBuffer::from("keep this, drop that, keep rest");
    let mut store = BookmarkStore::new();
    let id = store.add(&mut buffer, 11, 20, "doomed", None).unwrap();

    buffer.delete(9..21).unwrap();

    assert_eq!(store.navigate(&buffer, id).unwrap(), (9, 9));
    assert_eq!(buffer.text(), "keep this keep rest");
}

#[test]
fn test_collapsed_bookmark_does_not_swallow_text_inserted_at_its_point() {
    let mut buffer = TextBuffer::from("abcdef");
    let mut store = BookmarkStore::new();
    let id = store.add(&mut buffer, 2, 4, "cd", None).unwrap();
    let bookmark = store.get(id).unwrap();
    let (start_anchor, end_anchor) = (bookmark.start, bookmark.end);

    buffer.delete(1..5).unwrap();
    buffer.insert(1, "XYZ").unwrap();

    assert_eq!(buffer.text(), "aXYZf");
    assert!(buffer.resolve(start_anchor).unwrap() <= buffer.resolve(end_anchor).unwrap());
    assert_eq!(store.navigate(&buffer, id).unwrap(), (1, 1));
    let saved = store.to_saved(&buffer).unwrap();
    assert_eq!((saved[0].start, saved[0].end), (1, 1));
}

/// Small deterministic generator so the edit sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

/// Character ranges of the runs of letters in `text`
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (offset, c) in text.chars().chain(std::iter::once(' ')).enumerate() {
        match (c.is_alphabetic(), start) {
            (true, None) => start = Some(offset),
            (false, Some(run_start)) => {
                runs.push((run_start, offset));
                start = None;
            }
            _ => {}
        }
    }
    runs
}

/// Whether an edit of `range` leaves every bookmarked range untouched;
/// touching a bookmark's edge is allowed
fn outside(bookmarked: &[(usize, usize)], range: Range<usize>) -> bool {
    bookmarked
        .iter()
        .all(|&(start, end)| range.end <= start || range.start >= end)
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(42)]
#[case(1234)]
#[case(98765)]
fn test_interleaved_edits_and_bookmarks_preserve_content(#[case] seed: u64) {
    let mut buffer = TextBuffer::from("alpha bravo | charlie, delta; echo foxtrot");
    let mut store = BookmarkStore::new();
    let mut expected: Vec<(BookmarkId, String)> = Vec::new();
    let mut rng = Lcg(seed);

    for step in 0..300 {
        let bookmarked = expected
            .iter()
            .map(|(id, _)| store.range(&buffer, *id).unwrap())
            .collect::<Vec<_>>();
        let len = buffer.len_chars();

        match rng.next(5) {
            0 => {
                let words = words(&buffer.text());
                if let Some(&(start, end)) = words.get(rng.next(words.len())) {
                    let parent = expected.last().filter(|_| step % 2 == 0).map(|(id, _)| *id);
                    let id = store.add(&mut buffer, start, end, "word", parent).unwrap();
                    expected.push((id, buffer.slice(start..end).unwrap().into_owned()));
                }
            }
            1 | 2 => {
                let at = rng.next(len + 1);
                if outside(&bookmarked, at..at) {
                    let text = ["~", " ", "new ", "|x"][rng.next(4)];
                    buffer.insert(at, text).unwrap();
                }
            }
            _ => {
                let start = rng.next(len + 1);
                let end = (start + 1 + rng.next(4)).min(len);
                if start < end && outside(&bookmarked, start..end) {
                    buffer.delete(start..end).unwrap();
                }
            }
        }

        for (id, text) in &expected {
            let (start, end) = store.range(&buffer, *id).unwrap();
            assert!(start <= end, "step {step}: {start} > {end}");
            assert_eq!(buffer.slice(start..end).unwrap(), text.as_str(), "step {step}");
        }
    }

    assert!(!expected.is_empty());
}

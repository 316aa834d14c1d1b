//! Chunk splitting for record lists and staged-file row ranges

/// A contiguous row range within a staged relation file.
///
/// `skip` rows precede the range; the range covers `limit` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub skip: u64,
    pub limit: u64,
}

/// Split an owned collection into contiguous chunks of `chunk_size`.
///
/// Chunks come out in input order; concatenating them reproduces the input
/// exactly. Every chunk has `chunk_size` elements except possibly the last.
/// An empty input yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero; that is a caller error, not a data error.
pub fn split<T>(items: Vec<T>, chunk_size: usize) -> ChunkSplit<T> {
    assert!(chunk_size > 0, "chunk size must be positive");
    ChunkSplit {
        items: items.into_iter(),
        chunk_size,
    }
}

/// Iterator returned by [`split`].
pub struct ChunkSplit<T> {
    items: std::vec::IntoIter<T>,
    chunk_size: usize,
}

impl<T> Iterator for ChunkSplit<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(self.items.len()));
        for _ in 0..self.chunk_size {
            match self.items.next() {
                Some(item) => chunk.push(item),
                None => break,
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

/// Compute the row windows covering `total_rows` rows in chunks of
/// `chunk_size`, in file order.
///
/// Concatenating the windows covers `0..total_rows` exactly. Zero rows yield
/// no windows.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn row_windows(total_rows: u64, chunk_size: u64) -> Vec<RowWindow> {
    assert!(chunk_size > 0, "chunk size must be positive");
    let mut windows = Vec::new();
    let mut skip = 0;
    while skip < total_rows {
        let limit = chunk_size.min(total_rows - skip);
        windows.push(RowWindow { skip, limit });
        skip += limit;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_concatenation_reproduces_input() {
        let input: Vec<u32> = (0..10).collect();
        let chunks: Vec<Vec<u32>> = split(input.clone(), 3).collect();

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.len(), 3);
        }
        assert_eq!(chunks.last().map(Vec::len), Some(1));

        let rejoined: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn test_split_exact_multiple() {
        let chunks: Vec<Vec<u32>> = split((0..6).collect(), 2).collect();
        assert_eq!(chunks, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_split_empty_input_yields_no_chunks() {
        let chunks: Vec<Vec<u32>> = split(Vec::new(), 4).collect();
        assert!(chunks.is_empty());
    }

    #[test]
    #[should_panic(expected = "chunk size must be positive")]
    fn test_split_zero_chunk_size_panics() {
        let _ = split(vec![1], 0);
    }

    #[test]
    fn test_row_windows_cover_all_rows_in_order() {
        let windows = row_windows(7, 3);
        assert_eq!(
            windows,
            vec![
                RowWindow { skip: 0, limit: 3 },
                RowWindow { skip: 3, limit: 3 },
                RowWindow { skip: 6, limit: 1 },
            ]
        );
    }

    #[test]
    fn test_row_windows_empty() {
        assert!(row_windows(0, 10).is_empty());
    }
}

use crate::Result;

/// One page of packed 1-bpp raster rows
pub struct Page<I> {
    /// Resolution along the label length
    pub vertical_dpi: u32,
    /// Rows the page declares
    pub line_count: u32,
    pub lines: I,
}

impl<I: Iterator<Item = Vec<u8>>> Page<I> {
    pub fn new(vertical_dpi: u32, line_count: u32, lines: I) -> Self {
        Page {
            vertical_dpi,
            line_count,
            lines,
        }
    }
}

/// Rows held in memory.
pub type RasterRows = std::vec::IntoIter<Vec<u8>>;

impl Page<RasterRows> {
    pub fn from_rows(vertical_dpi: u32, rows: Vec<Vec<u8>>) -> Self {
        let line_count = rows.len() as u32;
        Page::new(vertical_dpi, line_count, rows.into_iter())
    }
}

/// Supplier of pages for a print job.
///
/// Pages own their rows: the driver fetches the following page before it
/// has finished sending the current one.
pub trait PageSource {
    type Lines: Iterator<Item = Vec<u8>>;

    fn next_page(&mut self) -> Result<Option<Page<Self::Lines>>>;
}

impl<I: Iterator<Item = Vec<u8>>> PageSource for std::vec::IntoIter<Page<I>> {
    type Lines = I;

    fn next_page(&mut self) -> Result<Option<Page<I>>> {
        Ok(self.next())
    }
}

/// Blank rows sent around the content of a short page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlankPadding {
    pub before: u32,
    pub after: u32,
}

impl BlankPadding {
    /// Split the shortfall below `min_lines` around the content; an odd
    /// remainder line goes after it.
    pub fn new(line_count: u32, min_lines: u32) -> Self {
        let blanks = min_lines.saturating_sub(line_count);
        BlankPadding {
            before: blanks / 2,
            after: blanks / 2 + blanks % 2,
        }
    }

    pub fn total(&self) -> u32 {
        self.before + self.after
    }
}

/// Copy `src` into `dst`, truncating a wider row and zero-filling the
/// rest of a narrower one.
pub fn fit_line(src: &[u8], dst: &mut [u8]) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0x00);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_reaches_minimum() {
        for n in 0..150 {
            let padding = BlankPadding::new(n, 150);
            assert_eq!(padding.total() + n, 150, "line count {}", n);
            assert!(padding.after >= padding.before);
            assert!(padding.after - padding.before <= 1);
        }
    }

    #[test]
    fn test_padding_odd_remainder_goes_after() {
        assert_eq!(
            BlankPadding::new(149, 150),
            BlankPadding { before: 0, after: 1 }
        );
        assert_eq!(
            BlankPadding::new(47, 150),
            BlankPadding { before: 51, after: 52 }
        );
        assert_eq!(
            BlankPadding::new(50, 150),
            BlankPadding { before: 50, after: 50 }
        );
    }

    #[test]
    fn test_no_padding_at_or_above_minimum() {
        for n in [150, 151, 1000] {
            assert_eq!(BlankPadding::new(n, 150).total(), 0);
        }
    }

    #[test]
    fn test_fit_line_truncates() {
        let mut dst = [0u8; 4];
        fit_line(&[1, 2, 3, 4, 5, 6], &mut dst);
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn test_fit_line_pads_and_clears_stale_bytes() {
        let mut dst = [9u8; 4];
        fit_line(&[1, 2], &mut dst);
        assert_eq!(dst, [1, 2, 0, 0]);

        fit_line(&[], &mut dst);
        assert_eq!(dst, [0, 0, 0, 0]);
    }

    #[test]
    fn test_vec_of_pages_is_a_source() {
        let mut source = vec![
            Page::from_rows(300, vec![vec![0xFF]]),
            Page::from_rows(600, vec![]),
        ]
        .into_iter();

        let first = source.next_page().unwrap().unwrap();
        assert_eq!(first.line_count, 1);
        let second = source.next_page().unwrap().unwrap();
        assert_eq!(second.vertical_dpi, 600);
        assert!(source.next_page().unwrap().is_none());
    }
}

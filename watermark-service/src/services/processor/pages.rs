use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid page selection '{0}'")]
pub struct PageSelectionError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageRange {
    start: u32,
    /// `None` runs to the last page.
    end: Option<u32>,
}

impl PageRange {
    fn contains(&self, page: u32) -> bool {
        page >= self.start && self.end.is_none_or(|end| page <= end)
    }
}

/// Which pages a watermark applies to. The empty selection means every page.
///
/// Parsed from comma separated items: `3`, `2-5`, `4-` (to the end) and `-2` (from the
/// first page). Page numbers are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<PageRange>,
}

impl PageSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, page: u32) -> bool {
        self.is_all() || self.ranges.iter().any(|r| r.contains(page))
    }

    /// Selected page numbers of a document with `page_count` pages, ascending.
    pub fn resolve(&self, page_count: u32) -> Vec<u32> {
        (1..=page_count).filter(|p| self.contains(*p)).collect()
    }
}

fn parse_page(item: &str, raw: &str) -> Result<u32, PageSelectionError> {
    match raw.trim().parse::<u32>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(PageSelectionError(item.to_string())),
    }
}

impl FromStr for PageSelection {
    type Err = PageSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();

        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let range = match item.split_once('-') {
                None => {
                    let page = parse_page(item, item)?;
                    PageRange {
                        start: page,
                        end: Some(page),
                    }
                }
                Some((start, end)) => {
                    let start = if start.trim().is_empty() {
                        1
                    } else {
                        parse_page(item, start)?
                    };
                    let end = if end.trim().is_empty() {
                        None
                    } else {
                        Some(parse_page(item, end)?)
                    };
                    if end.is_some_and(|end| end < start) {
                        return Err(PageSelectionError(item.to_string()));
                    }
                    PageRange { start, end }
                }
            };
            ranges.push(range);
        }

        Ok(Self { ranges })
    }
}

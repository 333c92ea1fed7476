use crate::parse::{self, QueryParams};

/// Address bar state: path plus the raw search string (with leading `?`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub pathname: String,
    pub search: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        Location {
            pathname: pathname.into(),
            search: search.into(),
        }
    }

    pub fn params(&self) -> QueryParams {
        parse::parse(&self.search)
    }
}

/// Routing context the search store reads from and rewrites
pub trait History {
    fn location(&self) -> &Location;

    /// Replace the current entry without adding a new one
    fn replace(&mut self, location: Location);

    /// Replace only the search string, keeping the current path
    fn replace_search(&mut self, params: &QueryParams) {
        let pathname = self.location().pathname.clone();
        self.replace(Location::new(pathname, parse::to_search(params)));
    }
}

/// History kept in memory, used by the browser bindings and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    current: Location,
    replaced: usize,
}

impl MemoryHistory {
    pub fn new(location: Location) -> Self {
        MemoryHistory {
            current: location,
            replaced: 0,
        }
    }

    /// Parse a `/path?query` string
    pub fn at(url: &str) -> Self {
        let (pathname, search) = match url.find('?') {
            Some(pos) => url.split_at(pos),
            None => (url, ""),
        };
        Self::new(Location::new(pathname, search))
    }

    /// Number of replacements made so far
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    /// Current location as `/path?query`
    pub fn url(&self) -> String {
        format!("{}{}", self.current.pathname, self.current.search)
    }
}

impl History for MemoryHistory {
    fn location(&self) -> &Location {
        &self.current
    }

    fn replace(&mut self, location: Location) {
        self.current = location;
        self.replaced += 1;
    }
}

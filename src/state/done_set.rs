use std::collections::HashSet;

/// Set of post ids that have been fully processed
///
/// A post is added only once its detail page has been handled and every file
/// link has been attempted. It can be pre-populated, e.g. from a previous
/// run's storage.
#[derive(Debug, Clone, Default)]
pub struct DoneSet {
    ids: HashSet<String>,
}

impl DoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the post has already been processed
    pub fn contains(&self, post_id: &str) -> bool {
        self.ids.contains(post_id)
    }

    /// Marks a post as done
    ///
    /// Returns false if the id was already present.
    pub fn mark_done(&mut self, post_id: impl Into<String>) -> bool {
        self.ids.insert(post_id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DoneSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for DoneSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.ids.extend(iter.into_iter().map(Into::into));
    }
}

//! Ordered rule evaluation.

use std::sync::Arc;

use url::Url;

use crate::rewrite::Rewrite;

/// Ordered list of rewrite rules.
///
/// Rules are tried in insertion order and evaluation stops at the first
/// rule that changes the URL.
#[derive(Debug, Clone, Default)]
pub struct RewriteSet {
    rules: Vec<Arc<dyn Rewrite>>,
}

impl RewriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl Rewrite + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies the first rule that changes `url`. Returns true if one did.
    pub fn apply(&self, url: &mut Url) -> bool {
        self.rules.iter().any(|rule| rule.apply(url))
    }
}

impl<R: Rewrite + 'static> FromIterator<R> for RewriteSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.push(rule);
        }
        set
    }
}

use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use lru::LruCache;
use parking_lot::Mutex;

struct CachedPage {
    html: Arc<str>,
    rendered_at: Instant,
}

/// Rendered HTML of published pages, kept for `revalidate` before the next
/// request renders it again. Preview requests never go through here.
#[derive(Clone)]
pub struct PageCache {
    entries: Option<Arc<Mutex<LruCache<String, CachedPage>>>>,
    revalidate: Duration,
}

impl PageCache {
    /// A zero capacity or zero revalidate window disables caching.
    pub fn new(capacity: usize, revalidate: Duration) -> Self {
        let entries = NonZeroUsize::new(capacity)
            .filter(|_| !revalidate.is_zero())
            .map(|capacity| Arc::new(Mutex::new(LruCache::new(capacity))));
        Self {
            entries,
            revalidate,
        }
    }

    pub fn get(&self, path: &str) -> Option<Arc<str>> {
        let entries = self.entries.as_ref()?;
        let mut entries = entries.lock();
        let fresh = entries
            .get(path)
            .map(|page| page.rendered_at.elapsed() < self.revalidate)?;
        if fresh {
            entries.get(path).map(|page| page.html.clone())
        } else {
            entries.pop(path);
            None
        }
    }

    pub fn insert(&self, path: &str, html: &str) {
        if let Some(entries) = self.entries.as_ref() {
            entries.lock().put(
                path.to_string(),
                CachedPage {
                    html: Arc::from(html),
                    rendered_at: Instant::now(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map(|entries| entries.lock().len())
            .unwrap_or(0)
    }
}

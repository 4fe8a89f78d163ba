use std::sync::RwLock;

use autoscale_cuckoo_filter::CuckooFilter;

/// Expected capacity and false-positive rate.
/// Tune these based on real headcount.
const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of active employee names. A miss means the name
/// certainly has no active employee; a hit must still be confirmed against
/// the store.
pub struct NameFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl NameFilter {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }

    pub fn might_exist(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&name.to_string())
    }

    pub fn insert(&self, name: &str) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add(&name.to_string());
    }

    /// Drops one occurrence; names shared by several employees stay present
    /// until every one is removed.
    pub fn remove(&self, name: &str) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name.to_string());
    }

    /// Loads a batch of names under a single write lock.
    pub fn warmup<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut total = 0usize;
        for name in names {
            filter.add(&name.as_ref().to_string());
            total += 1;
        }
        log::info!("Name filter warmup complete: {} employees", total);
        total
    }
}

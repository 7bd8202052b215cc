//! # IDs
//! Process-unique ids namespaced by a marker type, via [`UniqueId<T>`]. Strokes use these so a copied
//! stroke can be told apart from its source in the undo history.
//!
//! Ids are never persisted: they only mean something within one run of the program.

use std::sync::atomic::{AtomicU64, Ordering};

// Next free id per namespace.
static ID_SERVER: parking_lot::RwLock<std::collections::BTreeMap<std::any::TypeId, AtomicU64>> =
    parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// Id unique among all `UniqueId<T>` of this process. Ids of different namespaces may share a value.
pub struct UniqueId<T: std::any::Any> {
    id: u64,
    _phantom: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for UniqueId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for UniqueId<T> {}
impl<T: std::any::Any> PartialEq for UniqueId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for UniqueId<T> {}
impl<T: std::any::Any> PartialOrd for UniqueId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for UniqueId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: std::any::Any> std::hash::Hash for UniqueId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> UniqueId<T> {
    /// The raw value. Starts at 1 and rises, though callers shouldn't rely on the order.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
    /// Reserve `count` ids at once.
    pub fn many(count: usize) -> impl ExactSizeIterator<Item = Self> {
        let count_u64 = count as u64;
        let start = {
            let read = ID_SERVER.upgradable_read();
            let ty = std::any::TypeId::of::<T>();
            if let Some(next) = read.get(&ty) {
                next.fetch_add(count_u64, Ordering::Relaxed)
            } else {
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                // Another thread may have raced us to the insert.
                let next = write.entry(ty).or_insert_with(|| AtomicU64::new(1));
                next.fetch_add(count_u64, Ordering::Relaxed)
            }
        };
        (0..count).map(move |idx| Self {
            id: start + idx as u64,
            _phantom: std::marker::PhantomData,
        })
    }
}
impl<T: std::any::Any> Default for UniqueId<T> {
    fn default() -> Self {
        let mut ids = Self::many(1);
        ids.next().unwrap_or(Self {
            id: 0,
            _phantom: std::marker::PhantomData,
        })
    }
}
impl<T: std::any::Any> std::fmt::Display for UniqueId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for UniqueId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::UniqueId;

    // Ids are global state shared by every test in the process, so each test has its own namespace.

    #[test]
    fn first_id_is_one() {
        struct Namespace;
        let _ = UniqueId::<Namespace>::many(0);
        assert_eq!(UniqueId::<Namespace>::default().id(), 1);
        assert_eq!(UniqueId::<Namespace>::default().id(), 2);
    }
    #[test]
    fn unique() {
        struct Namespace;
        let mut ids: Vec<_> = UniqueId::<Namespace>::many(500).collect();
        ids.extend(UniqueId::<Namespace>::many(20));
        ids.push(UniqueId::default());
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(before, ids.len());
    }
    #[test]
    fn display() {
        struct Brush;
        let id = UniqueId::<Brush>::default();
        assert_eq!(id.to_string(), "Brush#1");
    }
}

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique address of an object confined to one thread.
///
/// Ids are never reused, so a lookup through a stale id finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry of the thread-confined objects owned by one [`crate::TaskRunner`].
#[derive(Default)]
pub struct ThreadScope {
    objects: RefCell<HashMap<ObjectId, Rc<dyn Any>>>,
    globals: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl ThreadScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: 'static>(&self, id: ObjectId, object: Rc<T>) {
        self.objects.borrow_mut().insert(id, object);
    }

    /// `None` when nothing is registered under `id` or it holds another type.
    pub fn get<T: 'static>(&self, id: ObjectId) -> Option<Rc<T>> {
        let object = self.objects.borrow().get(&id).cloned()?;
        object.downcast::<T>().ok()
    }

    pub fn remove(&self, id: ObjectId) -> bool {
        let removed = self.objects.borrow_mut().remove(&id);
        removed.is_some()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    /// Installs the per-thread singleton of type `T`, replacing any previous one.
    pub fn set_global<T: 'static>(&self, value: Rc<T>) {
        self.globals.borrow_mut().insert(TypeId::of::<T>(), value);
    }

    pub fn global<T: 'static>(&self) -> Option<Rc<T>> {
        let value = self.globals.borrow().get(&TypeId::of::<T>()).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Drops every object and singleton. Destructors run after the registry
    /// is released, so they may touch the scope again.
    pub fn clear(&self) {
        let objects = std::mem::take(&mut *self.objects.borrow_mut());
        let globals = std::mem::take(&mut *self.globals.borrow_mut());
        drop(objects);
        drop(globals);
    }
}

impl fmt::Debug for ThreadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadScope")
            .field("objects", &self.objects.borrow().len())
            .field("globals", &self.globals.borrow().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod scope_test;

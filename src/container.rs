//! Dependency-injection container.
//!
//! A registry of factories keyed by type. Each service is built lazily the
//! first time it is resolved and the same `Arc` is handed out afterwards.
//! Factories receive the container, so a service can resolve its own
//! dependencies:
//!
//! ```rust
//! use std::sync::Arc;
//! use capsule::Container;
//!
//! struct Database { url: String }
//! struct Articles { db: Arc<Database> }
//!
//! let mut container = Container::new();
//! container.singleton(Database { url: "memory://".into() });
//! container.register::<Articles, _>(|c| Ok(Arc::new(Articles { db: c.resolve()? })));
//!
//! let articles = container.resolve::<Articles>().unwrap();
//! assert_eq!(articles.db.url, "memory://");
//! ```
//!
//! Trait objects are registered under the unsized type:
//! `container.instance::<dyn Repository>(Arc::new(InMemory::default()))`.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::Error;

type Erased = Box<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&Container) -> Result<Erased, Error> + Send + Sync>;

thread_local! {
    /// Services currently being built on this thread, innermost last.
    static RESOLVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Registry of singleton services.
pub struct Container {
    factories: HashMap<TypeId, Factory>,
    // Each value is an `Arc<T>` boxed as `Any`, so unsized `T` works too.
    instances: Mutex<HashMap<TypeId, Erased>>,
    // Held while a factory runs. Reentrant so factories can resolve their
    // own dependencies on the same thread.
    building: ReentrantMutex<()>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
            building: ReentrantMutex::new(()),
        }
    }

    /// Registers a factory for `T`. It runs at most once, on first resolve.
    /// A later registration for the same type replaces the earlier one.
    pub fn register<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>, Error> + Send + Sync + 'static,
    {
        let id = TypeId::of::<T>();
        self.instances.get_mut().remove(&id);
        self.factories.insert(id, Box::new(move |c| factory(c).map(|svc| Box::new(svc) as Erased)));
        self
    }

    /// Registers an already-built service.
    pub fn instance<T>(&mut self, service: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = TypeId::of::<T>();
        self.factories.remove(&id);
        self.instances.get_mut().insert(id, Box::new(service));
        self
    }

    /// Registers an owned value as a singleton.
    pub fn singleton<T: Send + Sync + 'static>(&mut self, service: T) -> &mut Self {
        self.instance(Arc::new(service))
    }

    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.factories.contains_key(&id) || self.instances.lock().contains_key(&id)
    }

    /// Returns the singleton for `T`, building it on first use.
    pub fn resolve<T>(&self) -> Result<Arc<T>, Error>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = TypeId::of::<T>();
        if let Some(svc) = self.cached::<T>(id) {
            return Ok(svc);
        }

        let factory = self.factories.get(&id).ok_or(Error::ServiceNotFound(type_name::<T>()))?;

        let _guard = ResolveGuard::enter(id).ok_or(Error::CircularDependency(type_name::<T>()))?;
        let _building = self.building.lock();
        // Another thread may have built it while this one waited.
        if let Some(svc) = self.cached::<T>(id) {
            return Ok(svc);
        }

        let built = factory(self)?;
        let svc = built
            .downcast_ref::<Arc<T>>()
            .map(Arc::clone)
            .ok_or_else(|| Error::ServiceBuild { service: type_name::<T>(), reason: "type mismatch".into() })?;
        self.instances.lock().insert(id, built);
        Ok(svc)
    }

    fn cached<T: ?Sized + Send + Sync + 'static>(&self, id: TypeId) -> Option<Arc<T>> {
        self.instances.lock().get(&id).and_then(|v| v.downcast_ref::<Arc<T>>()).map(Arc::clone)
    }
}

impl Default for Container {
    fn default() -> Self { Self::new() }
}

/// Marks a type as "being built" for the lifetime of the guard.
struct ResolveGuard;

impl ResolveGuard {
    fn enter(id: TypeId) -> Option<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&id) {
                return None;
            }
            stack.push(id);
            Some(ResolveGuard)
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Breton;

    impl Greeter for Breton {
        fn greet(&self) -> String { "Demat".into() }
    }

    #[test]
    fn factory_runs_once() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        struct Counter;

        let mut c = Container::new();
        c.register::<Counter, _>(|_| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Counter))
        });
        let a = c.resolve::<Counter>().unwrap();
        let b = c.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_resolves_build_once() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        struct Pool;

        let mut c = Container::new();
        c.register::<Pool, _>(|_| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Arc::new(Pool))
        });

        let pools: Vec<Arc<Pool>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8).map(|_| s.spawn(|| c.resolve::<Pool>().unwrap())).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(pools.iter().all(|p| Arc::ptr_eq(p, &pools[0])));
    }

    #[test]
    fn resolves_trait_objects() {
        let mut c = Container::new();
        c.register::<dyn Greeter, _>(|_| {
            let greeter: Arc<dyn Greeter> = Arc::new(Breton);
            Ok(greeter)
        });
        assert!(c.has::<dyn Greeter>());
        assert_eq!(c.resolve::<dyn Greeter>().unwrap().greet(), "Demat");
    }

    #[test]
    fn resolves_dependencies_through_the_container() {
        struct Config(&'static str);
        struct Service(Arc<Config>);

        let mut c = Container::new();
        c.register::<Service, _>(|c| Ok(Arc::new(Service(c.resolve()?))));
        c.singleton(Config("fr"));
        assert_eq!(c.resolve::<Service>().unwrap().0.0, "fr");
    }

    #[test]
    fn unknown_service() {
        struct Missing;
        let c = Container::new();
        assert!(matches!(c.resolve::<Missing>(), Err(Error::ServiceNotFound(_))));
        assert!(!c.has::<Missing>());
    }

    #[test]
    fn detects_cycles() {
        struct A;
        struct B;

        let mut c = Container::new();
        c.register::<A, _>(|c| {
            c.resolve::<B>()?;
            Ok(Arc::new(A))
        });
        c.register::<B, _>(|c| {
            c.resolve::<A>()?;
            Ok(Arc::new(B))
        });
        assert!(matches!(c.resolve::<A>(), Err(Error::CircularDependency(_))));
        // The resolution stack unwinds even on failure.
        RESOLVING.with(|s| assert!(s.borrow().is_empty()));
    }
}

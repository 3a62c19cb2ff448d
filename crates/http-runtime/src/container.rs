use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::ContainerError;

type AnyArc = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> AnyArc + Send + Sync>;

enum Binding {
    /// `bind(id, factory)` — invoked on every resolve (§4.4).
    Transient(Factory),
    /// `singleton(id, factory)` — first invocation memoized (§4.4).
    Singleton {
        factory: Factory,
        instance: Mutex<Option<AnyArc>>,
    },
}

/// Per-worker dependency injection container (§4.4).
///
/// Rust has no runtime reflection, so spec.md's "autowire by reflection"
/// (flagged in §9 DESIGN NOTES as a redesign target) becomes compile-time
/// typed registration keyed by `TypeId`: `bind::<T>`/`singleton::<T>`/
/// `get::<T>`. Cycle detection happens at `get::<T>()` time via a
/// currently-resolving set, matching spec.md's "fail with a diagnostic
/// naming the cycle" — not a general reflective autowire, since Rust's
/// constructors aren't introspectable at runtime.
///
/// Not `Sync` across workers by design (§4.4: "not thread-safe across
/// workers; each worker owns its own") — every worker constructs its own
/// `Container`.
#[derive(Default)]
pub struct Container {
    bindings: Mutex<HashMap<TypeId, Binding>>,
    resolving: Mutex<HashSet<TypeId>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        let boxed: Factory = Arc::new(move |c| Arc::new(factory(c)) as AnyArc);
        self.bindings
            .lock()
            .expect("container mutex poisoned")
            .insert(TypeId::of::<T>(), Binding::Transient(boxed));
    }

    pub fn singleton<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        let boxed: Factory = Arc::new(move |c| Arc::new(factory(c)) as AnyArc);
        self.bindings.lock().expect("container mutex poisoned").insert(
            TypeId::of::<T>(),
            Binding::Singleton {
                factory: boxed,
                instance: Mutex::new(None),
            },
        );
    }

    /// `has(id)` (§4.4). Rust has no `class_exists` fallback — a type is
    /// resolvable here iff it was explicitly bound.
    pub fn has<T: Any + Send + Sync + 'static>(&self) -> bool {
        self.bindings
            .lock()
            .expect("container mutex poisoned")
            .contains_key(&TypeId::of::<T>())
    }

    /// `get(id)` (§4.4): resolve the bound/singleton instance. Fails with
    /// `ContainerError::Unbound` if nothing was registered for `T`
    /// (spec.md's `InstantiationError` for a non-instantiable class), or
    /// `ContainerError::Cycle` if resolving `T` re-enters its own
    /// resolution.
    pub fn get<T: Any + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        {
            let mut resolving = self.resolving.lock().expect("container mutex poisoned");
            if !resolving.insert(type_id) {
                return Err(ContainerError::Cycle(type_name));
            }
        }

        let result = self.resolve::<T>(type_id, type_name);

        self.resolving
            .lock()
            .expect("container mutex poisoned")
            .remove(&type_id);

        result
    }

    fn resolve<T: Any + Send + Sync + 'static>(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Arc<T>, ContainerError> {
        // Check (and for singletons, short-circuit on) an already-memoized
        // instance first, without holding the bindings lock across the
        // factory call below — factories may themselves call `get`.
        enum Action {
            Cached(AnyArc),
            CallTransient(Factory),
            CallSingleton(Factory),
            Missing,
        }

        let action = {
            let bindings = self.bindings.lock().expect("container mutex poisoned");
            match bindings.get(&type_id) {
                None => Action::Missing,
                Some(Binding::Transient(f)) => Action::CallTransient(Arc::clone(f)),
                Some(Binding::Singleton { factory, instance }) => {
                    let cached = instance.lock().expect("instance mutex poisoned").clone();
                    match cached {
                        Some(v) => Action::Cached(v),
                        None => Action::CallSingleton(Arc::clone(factory)),
                    }
                }
            }
        };

        let any = match action {
            Action::Missing => return Err(ContainerError::Unbound(type_name)),
            Action::Cached(v) => v,
            Action::CallTransient(factory) => factory(self),
            Action::CallSingleton(factory) => {
                let built = factory(self);
                let bindings = self.bindings.lock().expect("container mutex poisoned");
                if let Some(Binding::Singleton { instance, .. }) = bindings.get(&type_id) {
                    *instance.lock().expect("instance mutex poisoned") = Some(Arc::clone(&built));
                }
                built
            }
        };

        any.downcast::<T>().map_err(|_| ContainerError::TypeMismatch(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A(u32);
    struct B(u32);

    #[test]
    fn bind_invokes_factory_on_every_resolve() {
        let container = Container::new();
        container.bind::<A, _>(|_| A(std::process::id()));
        let a1 = container.get::<A>().unwrap();
        let a2 = container.get::<A>().unwrap();
        // Both resolved independently (not memoized); same process id either way.
        assert_eq!(a1.0, a2.0);
    }

    #[test]
    fn singleton_memoizes_first_construction() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNT: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container.singleton::<B, _>(|_| B(COUNT.fetch_add(1, Ordering::SeqCst)));

        let b1 = container.get::<B>().unwrap();
        let b2 = container.get::<B>().unwrap();
        assert_eq!(b1.0, b2.0);
        assert_eq!(COUNT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unbound_type_fails_with_unbound_error() {
        let container = Container::new();
        assert!(matches!(container.get::<A>(), Err(ContainerError::Unbound(_))));
    }

    #[test]
    fn has_reports_registered_bindings() {
        let container = Container::new();
        assert!(!container.has::<A>());
        container.bind::<A, _>(|_| A(1));
        assert!(container.has::<A>());
    }

    #[test]
    fn reentrant_resolution_is_detected_as_a_cycle() {
        let container = Container::new();
        let captured: Arc<Mutex<Option<Result<(), String>>>> = Arc::new(Mutex::new(None));
        let captured_for_factory = Arc::clone(&captured);

        container.singleton::<A, _>(move |c| {
            // A factory that resolves its own type re-enters `get::<A>`
            // while the outer call is still resolving it.
            let inner = c.get::<A>().map(|_| ()).map_err(|e| e.to_string());
            *captured_for_factory.lock().unwrap() = Some(inner);
            A(1)
        });

        let _ = container.get::<A>();
        let inner = captured.lock().unwrap().clone().unwrap();
        assert!(inner.is_err());
    }
}

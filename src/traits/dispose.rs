//! Disposal trait for resource cleanup.

use crate::error::BoxError;

/// Result of a single disposal.
pub type DisposeResult = Result<(), BoxError>;

/// Trait for instances that need deterministic teardown.
///
/// Exports built with `.disposable()` are tracked by the disposal scope that
/// was active when they were created and disposed in reverse creation order
/// when that scope ends. A failing or panicking disposer does not stop the
/// rest; every failure is reported once, aggregated.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Dispose, DisposeResult, ExportStrategy, InjectionScope, Locator};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Connection {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) -> DisposeResult {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let root = InjectionScope::new();
/// root.register(
///     ExportStrategy::construct(|_| Ok(Connection::default()))
///         .disposable()
///         .build(),
/// );
///
/// let child = root.create_child_scope();
/// let conn = child.locate::<Connection>().unwrap();
/// child.dispose().unwrap();
/// assert!(conn.closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release resources held by this instance.
    fn dispose(&self) -> DisposeResult;
}

// src/graph/task.rs

//! Task nodes: a unit of work, an optional compensating action, edges to
//! other tasks and the resources the work needs exclusively.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio_util::sync::CancellationToken;

use crate::errors::Error;
use crate::graph::{Graph, Resource};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Cooperative stop signal handed to every work function.
///
/// The scheduler never kills a worker; work functions are expected to watch
/// this token and return promptly once it is cancelled.
pub type Interrupt = CancellationToken;

/// Boxed future returned by work functions and compensating actions.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

type WorkFn = Arc<dyn Fn(Interrupt) -> TaskFuture + Send + Sync>;
type RevertFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Process-unique identity of a [`Task`].
///
/// Ids are handed out in creation order, which the supervisor relies on to
/// re-check pending tasks deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Edges {
    /// Weak so that a graph does not keep itself alive through its own edges.
    upstream: Vec<Weak<TaskInner>>,
    downstream: Vec<Task>,
    resources: Vec<Resource>,
}

struct TaskInner {
    id: TaskId,
    name: String,
    work: WorkFn,
    revert: RwLock<Option<RevertFn>>,
    edges: RwLock<Edges>,
    interrupt: Interrupt,
}

/// Handle to a graph node.
///
/// Cloning is cheap and yields another handle to the *same* node; equality
/// and hashing go by [`TaskId`]. Edges, resources and the compensating action
/// must only be changed before the owning supervisor is dispatched.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Create a task from an async work function.
    pub fn new<F, Fut>(name: impl Into<String>, work: F) -> Self
    where
        F: Fn(Interrupt) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let work: WorkFn = Arc::new(move |interrupt: Interrupt| -> TaskFuture {
            Box::pin(work(interrupt))
        });
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                work,
                revert: RwLock::new(None),
                edges: RwLock::new(Edges::default()),
                interrupt: CancellationToken::new(),
            }),
        }
    }

    /// Create a task from a blocking closure, run on Tokio's blocking pool.
    pub fn blocking<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Fn(&Interrupt) -> Result<(), Error> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        Self::new(name, move |interrupt: Interrupt| {
            let work = Arc::clone(&work);
            async move {
                tokio::task::spawn_blocking(move || work(&interrupt))
                    .await
                    .map_err(Error::from)?
            }
        })
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Make every leaf of `graph` a prerequisite of this task.
    pub fn after<G: Graph + ?Sized>(self, graph: &G) -> Self {
        self.add_upstream(graph);
        self
    }

    /// Require `resource` to be free (and hold it) while this task runs.
    pub fn uses(self, resource: &Resource) -> Self {
        {
            let mut edges = write(&self.inner.edges);
            if !edges.resources.contains(resource) {
                edges.resources.push(resource.clone());
            }
        }
        self
    }

    /// Attach a compensating action, replacing any previous one.
    pub fn revert_with<F, Fut>(self, revert: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let revert: RevertFn = Arc::new(move || -> TaskFuture { Box::pin(revert()) });
        *write(&self.inner.revert) = Some(revert);
        self
    }

    /// Start the work function with this task's interrupt signal.
    pub fn run(&self) -> TaskFuture {
        (self.inner.work)(self.inner.interrupt.clone())
    }

    /// Ask the running work function to stop. Idempotent.
    pub fn interrupt(&self) {
        self.inner.interrupt.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupt.is_cancelled()
    }

    pub fn is_revertible(&self) -> bool {
        read(&self.inner.revert).is_some()
    }

    /// Run the compensating action; a task without one reverts trivially.
    pub fn revert(&self) -> TaskFuture {
        let revert = read(&self.inner.revert).clone();
        match revert {
            Some(revert) => revert(),
            None => Box::pin(async { Ok(()) }),
        }
    }

    /// Live upstream tasks.
    pub fn upstream(&self) -> Vec<Task> {
        read(&self.inner.edges)
            .upstream
            .iter()
            .filter_map(|weak| weak.upgrade().map(|inner| Task { inner }))
            .collect()
    }

    pub fn downstream(&self) -> Vec<Task> {
        read(&self.inner.edges).downstream.clone()
    }

    pub fn resources(&self) -> Vec<Resource> {
        read(&self.inner.edges).resources.clone()
    }

    /// All upstream tasks, or `None` if any of them has already been dropped
    /// (such a prerequisite can never finish).
    pub(crate) fn upstream_handles(&self) -> Option<Vec<Task>> {
        read(&self.inner.edges)
            .upstream
            .iter()
            .map(|weak| weak.upgrade().map(|inner| Task { inner }))
            .collect()
    }

    pub(crate) fn add_upstream<G: Graph + ?Sized>(&self, graph: &G) {
        for leaf in graph.leaves() {
            // Never hold two node locks at once: a self edge would deadlock.
            {
                let mut edges = write(&self.inner.edges);
                let known = edges
                    .upstream
                    .iter()
                    .any(|weak| weak.upgrade().is_some_and(|t| t.id == leaf.id()));
                if known {
                    continue;
                }
                edges.upstream.push(Arc::downgrade(&leaf.inner));
            }
            write(&leaf.inner.edges).downstream.push(self.clone());
        }
    }

    /// Depth-first walk over this task and its downstream closure.
    ///
    /// Nodes reachable along several paths are visited once per path, and a
    /// cyclic graph makes this walk run forever.
    pub(crate) fn visit(&self, visitor: &mut dyn FnMut(&Task)) {
        visitor(self);
        for task in self.downstream() {
            task.visit(visitor);
        }
    }
}

impl Graph for Task {
    fn roots(&self) -> Vec<Task> {
        vec![self.clone()]
    }

    fn leaves(&self) -> Vec<Task> {
        vec![self.clone()]
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// src/graph/resource.rs

//! Named mutual-exclusion tokens that tasks can require.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

/// Misuse of a resource lock.
///
/// These indicate that the scheduler's own bookkeeping is broken (or that a
/// resource is shared between concurrently running supervisors); they are
/// never produced by well-formed runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceFault {
    #[error("resource \"{0}\" is already locked")]
    AlreadyLocked(String),

    #[error("resource \"{0}\" is already unlocked")]
    AlreadyUnlocked(String),
}

#[derive(Debug)]
struct ResourceInner {
    id: ResourceId,
    name: String,
    locked: AtomicBool,
}

/// A named exclusive-use token.
///
/// Cloning yields another handle to the *same* resource. Locking is only
/// ever performed by the supervisor's dispatch core, so the atomic flag is
/// there for `Sync`, not for arbitration between threads.
#[derive(Debug, Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                id: ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                locked: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `true` iff nobody currently holds the resource.
    pub fn is_available(&self) -> bool {
        !self.inner.locked.load(Ordering::Acquire)
    }

    /// Take the resource. Fails if it is already held.
    pub fn lock(&self) -> Result<(), ResourceFault> {
        self.inner
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ResourceFault::AlreadyLocked(self.inner.name.clone()))
    }

    /// Release the resource. Fails if it is not held.
    pub fn unlock(&self) -> Result<(), ResourceFault> {
        self.inner
            .locked
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ResourceFault::AlreadyUnlocked(self.inner.name.clone()))
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Resource {}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

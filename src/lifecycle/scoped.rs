//! Scoped resource acquisition.
//!
//! [`with_resource`] runs a body against a resource and releases the resource
//! exactly once afterwards, whether the body succeeds, fails or panics.

use tracing::warn;

/// Something that must be released when its user is done with it.
pub trait Release {
    type Error: std::fmt::Display;

    fn release(&mut self) -> Result<(), Self::Error>;
}

/// Guard that releases the wrapped resource exactly once.
///
/// Call [`finish`](Self::finish) to release explicitly and observe the
/// result. If the guard is dropped first (early return, panic) the resource
/// is released from `Drop` and a failure is logged.
#[derive(Debug)]
pub struct ScopedResource<R: Release> {
    resource: Option<R>,
}

impl<R: Release> ScopedResource<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource: Some(resource),
        }
    }

    /// A guard with nothing to release.
    pub fn empty() -> Self {
        Self { resource: None }
    }

    pub fn get(&self) -> Option<&R> {
        self.resource.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.resource.as_mut()
    }

    /// Releases the resource now. Releasing an empty guard is a no-op.
    pub fn finish(mut self) -> Result<(), R::Error> {
        match self.resource.take() {
            Some(mut resource) => resource.release(),
            None => Ok(()),
        }
    }
}

impl<R: Release> From<Option<R>> for ScopedResource<R> {
    fn from(resource: Option<R>) -> Self {
        Self { resource }
    }
}

impl<R: Release> Drop for ScopedResource<R> {
    fn drop(&mut self) {
        if let Some(mut resource) = self.resource.take() {
            if let Err(err) = resource.release() {
                warn!(error = %err, "release failed while unwinding scoped resource");
            }
        }
    }
}

/// Runs `body` with the resource, then releases it.
///
/// A body error is returned after release completes. A release error takes
/// precedence over the body's result. With `None` the body still runs and
/// nothing is released.
pub fn with_resource<R, T, E, F>(resource: Option<R>, body: F) -> Result<T, E>
where
    R: Release,
    E: From<R::Error>,
    F: FnOnce(Option<&mut R>) -> Result<T, E>,
{
    let mut guard = ScopedResource::from(resource);
    let outcome = body(guard.get_mut());
    guard.finish()?;
    outcome
}

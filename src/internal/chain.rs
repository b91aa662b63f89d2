//! In-flight resolution chain for circular dependency detection.
//!
//! The chain lives on the activation scope, not in thread-local storage, so
//! a scope handed to another task keeps its cycle state, and independent
//! scopes never see each other's in-progress resolutions.

use std::sync::Mutex;

use crate::error::{DiError, DiResult};
use crate::key::ServiceType;

const MAX_DEPTH: usize = 256;

/// Ordered set of types currently being resolved within one scope.
///
/// Entries are pushed on entry to a type's resolution and popped by a guard
/// when that resolution exits, whether it succeeded or failed, so siblings
/// in a DAG never falsely trigger cycle detection.
#[derive(Default)]
pub(crate) struct ResolutionChain {
    frames: Mutex<Vec<ServiceType>>,
}

impl ResolutionChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enters resolution of `ty`, failing if `ty` is already in flight.
    ///
    /// The returned guard pops the frame on drop. The lock is not held by
    /// the guard, only for the duration of the push, so the guard may live
    /// across await points.
    pub(crate) fn enter(&self, ty: ServiceType) -> DiResult<ChainGuard<'_>> {
        let mut frames = self.frames.lock().unwrap();
        if frames.iter().any(|f| f.id() == ty.id()) {
            let mut path: Vec<&'static str> = frames.iter().map(|f| f.name()).collect();
            path.push(ty.name());
            return Err(DiError::CircularDependency { path });
        }
        if frames.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(frames.len()));
        }
        frames.push(ty);
        Ok(ChainGuard { chain: self, ty })
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

/// Guard that removes a frame from the chain on exit.
pub(crate) struct ChainGuard<'a> {
    chain: &'a ResolutionChain,
    ty: ServiceType,
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self.chain.frames.lock().unwrap();
        if let Some(last) = frames.pop() {
            debug_assert_eq!(last.id(), self.ty.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_reentry() {
        let chain = ResolutionChain::new();
        let _a = chain.enter(ServiceType::of::<u32>()).unwrap();
        let _b = chain.enter(ServiceType::of::<u64>()).unwrap();
        let reentry = chain.enter(ServiceType::of::<u32>());
        match reentry {
            Err(DiError::CircularDependency { path }) => {
                assert_eq!(path, vec!["u32", "u64", "u32"]);
            }
            other => panic!("expected CircularDependency, got {:?}", other.err()),
        };
    }

    #[test]
    fn guard_pops_on_drop() {
        let chain = ResolutionChain::new();
        {
            let _a = chain.enter(ServiceType::of::<u32>()).unwrap();
            assert_eq!(chain.depth(), 1);
        }
        assert_eq!(chain.depth(), 0);
        // The same type may be entered again once the first frame is gone.
        let _again = chain.enter(ServiceType::of::<u32>()).unwrap();
    }

    #[test]
    fn guard_pops_on_failure_path() {
        let chain = ResolutionChain::new();
        let result: DiResult<()> = (|| {
            let _guard = chain.enter(ServiceType::of::<String>())?;
            Err(DiError::TypeUnresolvable("missing".into()))
        })();
        assert!(result.is_err());
        assert_eq!(chain.depth(), 0);
    }
}

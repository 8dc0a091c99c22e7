use std::sync::atomic::{AtomicU64, Ordering};

/// Captured generation of a `Liveness` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessToken(u64);

/// Generation counter used to cancel scheduled work.
///
/// Work captures a token when it is scheduled and checks it before every
/// side effect. `revoke` invalidates every outstanding token at once.
#[derive(Debug, Default)]
pub struct Liveness {
    generation: AtomicU64,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken(self.generation.load(Ordering::Acquire))
    }

    pub fn is_current(&self, token: LivenessToken) -> bool {
        self.generation.load(Ordering::Acquire) == token.0
    }

    pub fn revoke(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

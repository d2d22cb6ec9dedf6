//! User hooks and the boundary that guards them.
//!
//! Hook failures are logged and handed back to the host. Panics are caught
//! long enough for the overlay to finish its own bookkeeping, then resumed
//! so the host's error reporting still sees them.

use super::{OverlayError, ViewportSize};
use crate::geo::GeoPoint;
use crate::scene::Scene;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Result returned by user hooks.
pub type HookResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) type LifecycleHook = Box<dyn FnMut(&mut Scene) -> HookResult>;
pub(crate) type UpdateHook = Box<dyn FnMut(&mut FrameContext<'_>) -> HookResult>;

/// Identifies a user hook in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Runs when the overlay is added to the map
    Add,
    /// Runs after the overlay was removed from the map
    Remove,
    /// Runs once per rendered frame
    Update,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookKind::Add => write!(f, "add"),
            HookKind::Remove => write!(f, "remove"),
            HookKind::Update => write!(f, "update"),
        }
    }
}

/// What the update hook sees of the frame being drawn.
pub struct FrameContext<'a> {
    /// Scene about to be rendered; changes show up in this frame
    pub scene: &'a mut Scene,
    pub viewport: ViewportSize,
    pub reference_point: GeoPoint,
    redraw_requested: bool,
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(
        scene: &'a mut Scene,
        viewport: ViewportSize,
        reference_point: GeoPoint,
    ) -> Self {
        Self {
            scene,
            viewport,
            reference_point,
            redraw_requested: false,
        }
    }

    /// Asks for another frame after this one, e.g. to keep an animation running.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }
}

/// Registered hooks; an empty slot is a no-op.
#[derive(Default)]
pub(crate) struct Hooks {
    pub on_add: Option<LifecycleHook>,
    pub on_remove: Option<LifecycleHook>,
    pub update: Option<UpdateHook>,
}

pub(crate) enum HookOutcome {
    Completed,
    Failed(OverlayError),
    Panicked(Box<dyn Any + Send>),
}

impl HookOutcome {
    /// Hands the outcome to the host, resuming a caught panic.
    pub(crate) fn into_result(self) -> Result<(), OverlayError> {
        match self {
            HookOutcome::Completed => Ok(()),
            HookOutcome::Failed(error) => Err(error),
            HookOutcome::Panicked(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Runs a hook, catching both returned errors and panics.
pub(crate) fn invoke(kind: HookKind, hook: impl FnOnce() -> HookResult) -> HookOutcome {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => HookOutcome::Completed,
        Ok(Err(source)) => {
            log::error!("{} hook failed: {}", kind, source);
            HookOutcome::Failed(OverlayError::Hook { kind, source })
        }
        Err(payload) => {
            log::error!("{} hook panicked: {}", kind, panic_message(&*payload));
            HookOutcome::Panicked(payload)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_hook() {
        let outcome = invoke(HookKind::Add, || Ok(()));

        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn test_failed_hook_carries_kind() {
        let outcome = invoke(HookKind::Remove, || Err("boom".into()));

        match outcome.into_result() {
            Err(OverlayError::Hook { kind, source }) => {
                assert_eq!(kind, HookKind::Remove);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_panic_is_caught_then_resumed() {
        let outcome = invoke(HookKind::Update, || panic!("update exploded"));
        assert!(matches!(outcome, HookOutcome::Panicked(_)));

        let resumed = panic::catch_unwind(AssertUnwindSafe(|| outcome.into_result()));
        let payload = resumed.unwrap_err();
        assert_eq!(panic_message(&*payload), "update exploded");
    }
}

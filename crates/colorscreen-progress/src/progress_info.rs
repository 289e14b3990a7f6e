use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One entry in the nested task stack: a human-readable name and the
/// fraction of that task's work completed so far, in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub fraction_done: f64,
}

/// Tracks a stack of nested sub-tasks (e.g. "detect screen" containing
/// "fit mesh" containing "solve") and a single cooperative-cancellation
/// flag checked by solvers, deconvolution tile loops and the detector.
///
/// Cloning shares the same underlying state (`Arc` semantics via
/// `std::sync::Arc` at the call site) — `ProgressInfo` itself just owns
/// the `Mutex`/`AtomicBool`, so callers pass it behind an `Arc`.
#[derive(Debug, Default)]
pub struct ProgressInfo {
    stack: Mutex<Vec<Task>>,
    cancelled: AtomicBool,
}

impl ProgressInfo {
    pub fn new() -> Self {
        ProgressInfo {
            stack: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn push(&self, name: impl Into<String>) {
        self.stack.lock().unwrap().push(Task {
            name: name.into(),
            fraction_done: 0.0,
        });
    }

    pub fn pop(&self) {
        self.stack.lock().unwrap().pop();
    }

    /// Updates the fraction-done of the currently innermost task.
    pub fn set_progress(&self, fraction_done: f64) {
        if let Some(top) = self.stack.lock().unwrap().last_mut() {
            top.fraction_done = fraction_done.clamp(0.0, 1.0);
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// A human-readable snapshot of the task stack, innermost last, e.g.
    /// `"detect screen > fit mesh > solve (42%)"`.
    pub fn status(&self) -> String {
        let stack = self.stack.lock().unwrap();
        stack
            .iter()
            .map(|t| format!("{} ({:.0}%)", t.name, t.fraction_done * 100.0))
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_nests_correctly() {
        let p = ProgressInfo::new();
        p.push("outer");
        p.push("inner");
        p.set_progress(0.5);
        assert_eq!(p.status(), "outer (0%) > inner (50%)");
        p.pop();
        assert_eq!(p.status(), "outer (0%)");
        p.pop();
        assert_eq!(p.status(), "");
    }

    #[test]
    fn cancel_is_visible_across_clones_of_the_flag() {
        let p = ProgressInfo::new();
        assert!(!p.is_cancelled());
        p.cancel();
        assert!(p.is_cancelled());
    }
}

use std::cell::Cell;

thread_local! {
    static DRY_RUN: Cell<bool> = const { Cell::new(false) };
}

/// True while inside [`with_dry_run_enabled`] with `enabled = true`.
pub fn is_dry_run() -> bool {
    DRY_RUN.with(Cell::get)
}

/// Runs `f` with the dry-run switch set, restoring the previous value afterwards
/// (also on unwind).
pub fn with_dry_run_enabled<R>(enabled: bool, f: impl FnOnce() -> R) -> R {
    struct Restore(bool);
    impl Drop for Restore {
        fn drop(&mut self) {
            DRY_RUN.with(|c| c.set(self.0));
        }
    }

    let _restore = Restore(DRY_RUN.with(|c| c.replace(enabled)));
    f()
}

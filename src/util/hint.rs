/// Run `f` on a path the optimizer should treat as unlikely (invalid frees,
/// lazy setup, that kind of thing).
#[cold]
#[inline(never)]
pub fn cold<R, F: FnOnce() -> R>(f: F) -> R {
    f()
}

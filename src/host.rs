//! Host object-model collaborators.
//!
//! The view core does not own the memory it looks into and does not know how
//! the host runtime manages object lifetimes or element formats. Both
//! concerns are injected behind small traits:
//!
//! - [`HostRuntime`]: the ownership handle of a buffer's exporting host
//!   object (retain/release) plus the host's global exclusivity section,
//!   entered around the 0→1 and 1→0 acquisition transitions.
//! - [`FormatMatcher`]: validates an opaque buffer format tag against an
//!   expected [`ElementType`].

/// Ownership and exclusivity hooks for the host object backing a buffer.
///
/// `retain` is called exactly once when the first view of a buffer is
/// acquired, `release` exactly once when the last view is released.
///
/// `enter_exclusive`/`leave_exclusive` bracket those two calls when the
/// calling context does not already hold the host's exclusivity token. They
/// must have *ensure* semantics: calling `enter_exclusive` while the token is
/// already held must be safe.
pub trait HostRuntime: Send + Sync {
    /// Take an owning reference on the exporting host object.
    fn retain(&self);

    /// Drop the owning reference on the exporting host object.
    fn release(&self);

    /// Enter the host's global exclusive section.
    fn enter_exclusive(&self) {}

    /// Leave the host's global exclusive section.
    fn leave_exclusive(&self) {}
}

/// Scoped host exclusivity.
///
/// Enters the exclusive section on construction unless the caller already
/// holds it, and leaves on drop, so the section is released on every exit
/// path including early returns.
pub(crate) struct HostAccess<'a> {
    runtime: &'a dyn HostRuntime,
    entered: bool,
}

impl<'a> HostAccess<'a> {
    pub(crate) fn ensure(runtime: &'a dyn HostRuntime, holds_exclusive: bool) -> Self {
        if !holds_exclusive {
            runtime.enter_exclusive();
        }
        Self {
            runtime,
            entered: !holds_exclusive,
        }
    }
}

impl Drop for HostAccess<'_> {
    fn drop(&mut self) {
        if self.entered {
            self.runtime.leave_exclusive();
        }
    }
}

/// Host runtime for self-owned buffers with no external exporting object.
///
/// Used for buffers allocated by the contiguous copier: their storage is
/// freed when the buffer's last shared handle drops, so the ownership hooks
/// have nothing to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl HostRuntime for NoHost {
    fn retain(&self) {}
    fn release(&self) {}
}

/// Expected element layout for buffer validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementType {
    /// Human-readable type name, used in mismatch reports.
    pub name: String,
    /// Format tag the buffer must carry for this type.
    pub format: String,
    /// Element size in bytes.
    pub size: usize,
}

impl ElementType {
    pub fn new(name: impl Into<String>, format: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            size,
        }
    }
}

/// Validates an opaque buffer format tag against an expected element type.
pub trait FormatMatcher {
    /// Whether the buffer's format tag describes the expected element layout.
    fn matches(&self, format: &str, expected: &ElementType) -> bool;

    /// Human-readable description of a format tag for mismatch reports.
    fn describe(&self, format: &str) -> String {
        format.to_owned()
    }
}

/// Trivial matcher requiring the format tag to equal the expected one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactFormat;

impl FormatMatcher for ExactFormat {
    fn matches(&self, format: &str, expected: &ElementType) -> bool {
        format == expected.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        enters: AtomicUsize,
        leaves: AtomicUsize,
    }

    impl HostRuntime for Tracking {
        fn retain(&self) {}
        fn release(&self) {}
        fn enter_exclusive(&self) {
            self.enters.fetch_add(1, Ordering::SeqCst);
        }
        fn leave_exclusive(&self) {
            self.leaves.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_host_access_enters_and_leaves() {
        let host = Tracking::default();
        {
            let _access = HostAccess::ensure(&host, false);
            assert_eq!(host.enters.load(Ordering::SeqCst), 1);
            assert_eq!(host.leaves.load(Ordering::SeqCst), 0);
        }
        assert_eq!(host.leaves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_host_access_skipped_when_already_held() {
        let host = Tracking::default();
        {
            let _access = HostAccess::ensure(&host, true);
        }
        assert_eq!(host.enters.load(Ordering::SeqCst), 0);
        assert_eq!(host.leaves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exact_format() {
        let dtype = ElementType::new("double", "d", 8);
        assert!(ExactFormat.matches("d", &dtype));
        assert!(!ExactFormat.matches("f", &dtype));
    }
}

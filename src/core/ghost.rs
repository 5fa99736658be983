//! Ghost-suggestion guard.
//!
//! Address bars and search fields often show an inline autocomplete that is
//! selected and sits right after the caret. Deleting `n` characters there
//! first eats the selection, so the edit lands one character short. When
//! such a suggestion is detected, one extra backspace is sent first.

use std::time::Duration;

/// Selection state of the focused text element, in UTF-16 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionContext {
    pub location: usize,
    pub length: usize,
    /// Length of the element's full value, when readable
    pub value_length: Option<usize>,
    /// Length of the selected text, when readable
    pub selected_text_length: Option<usize>,
}

impl SelectionContext {
    /// A non-empty selection that ends exactly at the end of the value.
    ///
    /// An unreadable value is never a suggestion. An unreadable selected
    /// text is not held against the selection.
    pub fn is_ghost_suggestion(&self) -> bool {
        if self.length == 0 {
            return false;
        }
        match self.value_length {
            Some(value_length) if self.location + self.length == value_length => {}
            _ => return false,
        }
        if let Some(selected) = self.selected_text_length {
            if selected != self.length {
                return false;
            }
        }
        true
    }
}

/// Read access to the focused UI element.
pub trait FocusInspector: Send {
    /// Whether the process holds accessibility permission.
    fn is_trusted(&self) -> bool;

    /// Read the focused element's selection, waiting at most `timeout`.
    ///
    /// `None` covers every failure: no focused element, no selection API,
    /// wrong attribute types, or a timeout.
    fn read_selection(&self, timeout: Duration) -> Option<SelectionContext>;
}

/// Inspector for environments without accessibility support.
pub struct NoFocusInspector;

impl FocusInspector for NoFocusInspector {
    fn is_trusted(&self) -> bool {
        false
    }

    fn read_selection(&self, _timeout: Duration) -> Option<SelectionContext> {
        None
    }
}

pub struct GhostGuard {
    inspector: Box<dyn FocusInspector>,
}

impl GhostGuard {
    pub fn new(inspector: Box<dyn FocusInspector>) -> Self {
        Self { inspector }
    }

    /// Whether to send one extra backspace before applying an edit.
    pub fn should_add_extra_delete(&self, enabled: bool, timeout: Duration) -> bool {
        if !enabled || !self.inspector.is_trusted() {
            return false;
        }
        self.inspector
            .read_selection(timeout)
            .is_some_and(|selection| selection.is_ghost_suggestion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(location: usize, length: usize) -> SelectionContext {
        SelectionContext {
            location,
            length,
            value_length: None,
            selected_text_length: None,
        }
    }

    #[test]
    fn test_empty_selection_is_not_ghost() {
        let ctx = SelectionContext {
            value_length: Some(5),
            ..selection(5, 0)
        };
        assert!(!ctx.is_ghost_suggestion());
    }

    #[test]
    fn test_selection_at_end_is_ghost() {
        // "goo|gle.com" with "gle.com" selected
        let ctx = SelectionContext {
            value_length: Some(10),
            selected_text_length: Some(7),
            ..selection(3, 7)
        };
        assert!(ctx.is_ghost_suggestion());
    }

    #[test]
    fn test_selection_in_middle_is_not_ghost() {
        let ctx = SelectionContext {
            value_length: Some(20),
            ..selection(3, 7)
        };
        assert!(!ctx.is_ghost_suggestion());
    }

    #[test]
    fn test_selected_text_mismatch_is_not_ghost() {
        let ctx = SelectionContext {
            value_length: Some(10),
            selected_text_length: Some(6),
            ..selection(3, 7)
        };
        assert!(!ctx.is_ghost_suggestion());
    }

    #[test]
    fn test_unreadable_value_is_not_ghost() {
        assert!(!selection(3, 7).is_ghost_suggestion());
        assert!(!selection(0, 3).is_ghost_suggestion());
    }

    #[test]
    fn test_unreadable_selected_text_is_tolerated() {
        let ctx = SelectionContext {
            value_length: Some(10),
            ..selection(3, 7)
        };
        assert!(ctx.is_ghost_suggestion());
    }

    struct FixedInspector {
        trusted: bool,
        selection: Option<SelectionContext>,
    }

    impl FocusInspector for FixedInspector {
        fn is_trusted(&self) -> bool {
            self.trusted
        }
        fn read_selection(&self, _timeout: Duration) -> Option<SelectionContext> {
            self.selection
        }
    }

    #[test]
    fn test_guard_requires_enable_and_trust() {
        let ghost = Some(SelectionContext {
            value_length: Some(10),
            ..selection(3, 7)
        });
        let timeout = Duration::from_millis(10);

        let guard = GhostGuard::new(Box::new(FixedInspector {
            trusted: true,
            selection: ghost,
        }));
        assert!(guard.should_add_extra_delete(true, timeout));
        assert!(!guard.should_add_extra_delete(false, timeout));

        let untrusted = GhostGuard::new(Box::new(FixedInspector {
            trusted: false,
            selection: ghost,
        }));
        assert!(!untrusted.should_add_extra_delete(true, timeout));
    }

    #[test]
    fn test_unreadable_selection_adds_nothing() {
        let guard = GhostGuard::new(Box::new(FixedInspector {
            trusted: true,
            selection: None,
        }));
        assert!(!guard.should_add_extra_delete(true, Duration::from_millis(10)));
        assert!(!GhostGuard::new(Box::new(NoFocusInspector))
            .should_add_extra_delete(true, Duration::from_millis(10)));
    }

    #[test]
    fn test_unreadable_value_adds_nothing() {
        let guard = GhostGuard::new(Box::new(FixedInspector {
            trusted: true,
            selection: Some(selection(0, 3)),
        }));
        assert!(!guard.should_add_extra_delete(true, Duration::from_millis(10)));
    }
}

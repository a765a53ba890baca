//! Observer seams for the store and the formatter.
//!
//! Observers are supplied at construction and invoked synchronously in
//! registration order.

use std::path::Path;

use crate::domain::{pages::Page, symbols::Symbol};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    CommentAdded { name: String },
    CommentUpdated { name: String },
    SymbolUpdated { unique_name: String },
}

pub trait StoreObserver {
    fn notify(&mut self, event: &StoreEvent);
}

impl<F> StoreObserver for F
where
    F: FnMut(&StoreEvent),
{
    fn notify(&mut self, event: &StoreEvent) {
        self(event)
    }
}

/// Outcome of a symbol formatting notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Skip,
}

pub trait FormattingObserver {
    fn formatting_page(&mut self, _page: &Page) {}

    /// Returning [`Flow::Skip`] vetoes detail rendering for `symbol`.
    fn formatting_symbol(&mut self, _symbol: &Symbol) -> Flow {
        Flow::Continue
    }

    fn page_written(&mut self, _page: &Page, _path: &Path) {}
}

/// Run the veto chain; the first observer asking to skip wins.
pub(crate) fn formatting_symbol_flow(
    observers: &mut [Box<dyn FormattingObserver>],
    symbol: &Symbol,
) -> Flow {
    for observer in observers.iter_mut() {
        if observer.formatting_symbol(symbol) == Flow::Skip {
            return Flow::Skip;
        }
    }
    Flow::Continue
}

/// Cancellation token for in-flight model loads
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct TokenState {
    cancelled: Cell<bool>,
    callbacks: RefCell<Vec<Callback>>,
}

/// Shared cancellation flag. Clones observe the same state.
///
/// Callbacks registered with [`CancelToken::on_cancel`] run exactly once, when
/// the token is first cancelled (or immediately if it already is).
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Rc<TokenState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.state.callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    pub fn on_cancel(&self, callback: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            callback();
        } else {
            self.state.callbacks.borrow_mut().push(Box::new(callback));
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

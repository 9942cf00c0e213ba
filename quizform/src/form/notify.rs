use std::{collections::VecDeque, fmt, rc::Rc};

use crate::data::Model;

/// Callback run after a leaf field changed the model.
///
/// One callback value is shared by every renderer of a form tree.
pub type OnChange = Rc<dyn Fn(&Model)>;

/// Wrap a closure as an [`OnChange`] callback.
pub fn on_change(f: impl Fn(&Model) + 'static) -> OnChange {
    Rc::new(f)
}

/// Callback that ignores changes.
pub fn ignore_changes() -> OnChange {
    Rc::new(|_: &Model| {})
}

/// Notifications waiting for the next UI tick.
///
/// Edits push here instead of calling their callback inline, so observers
/// only ever see the model after every edit of the current handler is done.
#[derive(Default)]
pub struct ChangeQueue {
    pending: VecDeque<OnChange>,
}

impl fmt::Debug for ChangeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` for the next flush.
    pub fn defer(&mut self, callback: OnChange) {
        self.pending.push_back(callback);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every pending callback in order against the settled model.
    ///
    /// Returns the number of callbacks run.
    pub fn flush(&mut self, model: &Model) -> usize {
        let mut count = 0;
        while let Some(callback) = self.pending.pop_front() {
            callback(model);
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_flush_runs_in_order_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut queue = ChangeQueue::new();
        for n in 0..3 {
            let seen = seen.clone();
            queue.defer(on_change(move |_| seen.borrow_mut().push(n)));
        }
        assert_eq!(queue.len(), 3);
        assert!(seen.borrow().is_empty());

        assert_eq!(queue.flush(&Model::new()), 3);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);

        assert_eq!(queue.flush(&Model::new()), 0);
        assert!(queue.is_empty());
    }
}

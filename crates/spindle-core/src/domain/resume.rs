/// Payload handed to a suspended task by `resume`.
///
/// `Cancel` is the termination request: the task's pending `suspend`
/// fails with `TaskError::Terminated` instead of returning a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume<V> {
    Value(V),
    Cancel,
}

impl<V> Resume<V> {
    pub fn is_cancel(&self) -> bool {
        matches!(self, Resume::Cancel)
    }
}

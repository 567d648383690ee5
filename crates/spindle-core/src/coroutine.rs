//! Coroutine primitive.
//!
//! A coroutine wraps an `async` body and drives it by hand: every `resume`
//! polls the body once with a no-op waker, and the body hands control back
//! by awaiting [`Yielder::suspend`]. Values travel both ways at every switch
//! (`Y` out of the body, `R` into it), which is all the task layer needs.
//!
//! The body must not await anything except its own yielder. A body that
//! parks elsewhere has no way to be woken and is reported as
//! [`CoroutineError::Stalled`].

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::CoroutineError;

type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Result of one `resume`.
#[derive(Debug, PartialEq, Eq)]
pub enum CoroutineState<Y, T> {
    /// The body suspended with this value.
    Yielded(Y),
    /// The body returned.
    Complete(T),
}

/// Handoff slots shared by the coroutine and its yielder.
struct Channel<Y, R> {
    yielded: Option<Y>,
    resumed: Option<R>,
}

/// Handle the body uses to suspend itself.
pub struct Yielder<Y, R> {
    channel: Rc<RefCell<Channel<Y, R>>>,
}

impl<Y, R> Yielder<Y, R> {
    /// Hand `value` to the resumer and wait for the next resume value.
    pub fn suspend(&self, value: Y) -> Suspend<'_, Y, R> {
        Suspend {
            yielder: self,
            value: Some(value),
        }
    }
}

/// Future returned by [`Yielder::suspend`].
///
/// First poll publishes the yielded value and parks; the next poll (driven
/// by the following `resume`) picks up the resume value.
#[must_use = "suspend does nothing unless awaited"]
pub struct Suspend<'a, Y, R> {
    yielder: &'a Yielder<Y, R>,
    value: Option<Y>,
}

// No field is ever pinned.
impl<Y, R> Unpin for Suspend<'_, Y, R> {}

impl<Y, R> Future for Suspend<'_, Y, R> {
    type Output = R;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<R> {
        let this = &mut *self;
        let mut channel = this.yielder.channel.borrow_mut();
        if let Some(value) = this.value.take() {
            channel.yielded = Some(value);
            return Poll::Pending;
        }
        match channel.resumed.take() {
            Some(resumed) => Poll::Ready(resumed),
            None => Poll::Pending,
        }
    }
}

/// A resumable body yielding `Y`, receiving `R`, and finishing with `T`.
pub struct Coroutine<Y, R, T> {
    channel: Rc<RefCell<Channel<Y, R>>>,
    future: Option<LocalFuture<T>>,
    started: bool,
}

impl<Y: 'static, R: 'static, T: 'static> Coroutine<Y, R, T> {
    /// Build a coroutine around `body`. Nothing runs until the first resume.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Yielder<Y, R>) -> Fut,
        Fut: Future<Output = T> + 'static,
    {
        let channel = Rc::new(RefCell::new(Channel {
            yielded: None,
            resumed: None,
        }));
        let yielder = Yielder {
            channel: Rc::clone(&channel),
        };
        Self {
            channel,
            future: Some(Box::pin(body(yielder))),
            started: false,
        }
    }
}

impl<Y, R, T> Coroutine<Y, R, T> {
    pub fn is_alive(&self) -> bool {
        self.future.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Transfer control into the body.
    ///
    /// The first resume starts the body and its value is discarded; every
    /// later value becomes the result of the pending `suspend`.
    pub fn resume(&mut self, value: R) -> Result<CoroutineState<Y, T>, CoroutineError> {
        let Some(future) = self.future.as_mut() else {
            return Err(CoroutineError::Dead);
        };

        if self.started {
            self.channel.borrow_mut().resumed = Some(value);
        } else {
            self.started = true;
        }

        let mut cx = Context::from_waker(Waker::noop());
        let polled = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        let (yielded, _unclaimed) = {
            let mut channel = self.channel.borrow_mut();
            (channel.yielded.take(), channel.resumed.take())
        };

        match polled {
            Ok(Poll::Ready(output)) => {
                self.future = None;
                Ok(CoroutineState::Complete(output))
            }
            Ok(Poll::Pending) => match yielded {
                Some(value) => Ok(CoroutineState::Yielded(value)),
                None => {
                    self.future = None;
                    Err(CoroutineError::Stalled)
                }
            },
            Err(payload) => {
                self.future = None;
                Err(CoroutineError::Panicked(panic_message(payload.as_ref())))
            }
        }
    }

    /// Drop the body without running it further. Idempotent.
    pub fn close(&mut self) {
        self.future = None;
    }
}

impl<Y, R, T> fmt::Debug for Coroutine<Y, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("alive", &self.is_alive())
            .field("started", &self.started)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

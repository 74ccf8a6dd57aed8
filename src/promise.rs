//! Binding a toast to the outcome of a future.
//!
//! A tracked future shows a loading toast right away and turns that same
//! toast into a success or error toast once it settles. The future's output
//! is handed back unchanged.
//!
//! Each message is either fixed up front or computed from the outcome:
//!
//! ```ignore
//! let user = toasts
//!     .promise(
//!         fetch_user(),
//!         PromiseMessages::new("Loading user")
//!             .success_with(|user: &User| format!("Hi {}", user.name))
//!             .error("Failed"),
//!     )
//!     .await?;
//! ```

use crate::manager::ToastManager;
use crate::types::{Renderable, ToastId, ToastKind, ToastOptions};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Message content: a bare title or a full options bag.
#[derive(Clone, Debug)]
pub enum Message {
    Title(Renderable),
    Options(ToastOptions),
}

impl Message {
    /// Normalize into options. A bare title becomes `{ title }`.
    pub fn into_options(self) -> ToastOptions {
        match self {
            Message::Title(title) => ToastOptions::new().title(title),
            Message::Options(options) => options,
        }
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Title(s.into())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Title(s.into())
    }
}

impl From<Renderable> for Message {
    fn from(r: Renderable) -> Self {
        Message::Title(r)
    }
}

impl From<ToastOptions> for Message {
    fn from(options: ToastOptions) -> Self {
        Message::Options(options)
    }
}

/// Message for a settled outcome of type `T`.
pub enum Descriptor<T> {
    Fixed(Message),
    /// Computed from the outcome once the future settles.
    Lazy(Box<dyn FnOnce(&T) -> Message>),
}

impl<T> Descriptor<T> {
    pub fn lazy<F, M>(f: F) -> Self
    where
        F: FnOnce(&T) -> M + 'static,
        M: Into<Message>,
    {
        Descriptor::Lazy(Box::new(move |value: &T| f(value).into()))
    }

    /// Resolve against the outcome. Panics in a lazy descriptor propagate.
    pub fn resolve(self, value: &T) -> ToastOptions {
        match self {
            Descriptor::Fixed(message) => message.into_options(),
            Descriptor::Lazy(f) => f(value).into_options(),
        }
    }
}

impl<T> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Fixed(message) => f.debug_tuple("Fixed").field(message).finish(),
            Descriptor::Lazy(_) => write!(f, "Lazy(..)"),
        }
    }
}

impl<T> From<Message> for Descriptor<T> {
    fn from(message: Message) -> Self {
        Descriptor::Fixed(message)
    }
}

impl<T> From<&str> for Descriptor<T> {
    fn from(s: &str) -> Self {
        Descriptor::Fixed(s.into())
    }
}

impl<T> From<String> for Descriptor<T> {
    fn from(s: String) -> Self {
        Descriptor::Fixed(s.into())
    }
}

impl<T> From<Renderable> for Descriptor<T> {
    fn from(r: Renderable) -> Self {
        Descriptor::Fixed(r.into())
    }
}

impl<T> From<ToastOptions> for Descriptor<T> {
    fn from(options: ToastOptions) -> Self {
        Descriptor::Fixed(options.into())
    }
}

/// The three messages of a tracked future plus an optional `finally` hook.
///
/// Without a `success` (or `error`) descriptor the loading toast is simply
/// dismissed when the future succeeds (or fails).
pub struct PromiseMessages<T, E> {
    loading: Message,
    success: Option<Descriptor<T>>,
    error: Option<Descriptor<E>>,
    finally: Option<Box<dyn FnOnce()>>,
}

impl<T, E> PromiseMessages<T, E> {
    pub fn new(loading: impl Into<Message>) -> Self {
        Self {
            loading: loading.into(),
            success: None,
            error: None,
            finally: None,
        }
    }

    pub fn success(mut self, descriptor: impl Into<Descriptor<T>>) -> Self {
        self.success = Some(descriptor.into());
        self
    }

    /// Compute the success message from the resolved value.
    pub fn success_with<F, M>(mut self, f: F) -> Self
    where
        F: FnOnce(&T) -> M + 'static,
        M: Into<Message>,
    {
        self.success = Some(Descriptor::lazy(f));
        self
    }

    pub fn error(mut self, descriptor: impl Into<Descriptor<E>>) -> Self {
        self.error = Some(descriptor.into());
        self
    }

    /// Compute the error message from the error.
    pub fn error_with<F, M>(mut self, f: F) -> Self
    where
        F: FnOnce(&E) -> M + 'static,
        M: Into<Message>,
    {
        self.error = Some(Descriptor::lazy(f));
        self
    }

    /// Run after the toast has been updated, whatever the outcome.
    pub fn finally(mut self, f: impl FnOnce() + 'static) -> Self {
        self.finally = Some(Box::new(f));
        self
    }
}

impl<T, E> fmt::Debug for PromiseMessages<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseMessages")
            .field("loading", &self.loading)
            .field("success", &self.success)
            .field("error", &self.error)
            .field("finally", &self.finally.is_some())
            .finish()
    }
}

/// A tracked future. Resolves to the wrapped future's output.
#[must_use = "the toast only leaves the loading state once this future is awaited"]
pub struct PromiseToast<'a, T, E> {
    id: ToastId,
    future: LocalBoxFuture<'a, Result<T, E>>,
}

impl<T, E> PromiseToast<'_, T, E> {
    /// Id of the toast driven by this future.
    pub fn id(&self) -> &ToastId {
        &self.id
    }
}

impl<T, E> Future for PromiseToast<'_, T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl<T, E> fmt::Debug for PromiseToast<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseToast").field("id", &self.id).finish_non_exhaustive()
    }
}

impl ToastManager {
    /// Track `future` with a single toast.
    ///
    /// The loading toast is shown immediately. When the future settles the
    /// same toast is updated exactly once to the success or error message
    /// (or dismissed if that message is absent). The returned future yields
    /// the original output. If a lazy message panics the loading toast is
    /// dismissed and the panic continues out of the returned future.
    ///
    /// Neither `future` nor the lazy messages need to be `Send`, so the
    /// returned future is not `Send` either: await it on the thread that
    /// created it (`futures::executor::block_on`, a `LocalPool` or a
    /// runtime's local task set). The manager can still be cloned onto other
    /// threads and used from there.
    pub fn promise<'a, T, E, F>(&self, future: F, messages: PromiseMessages<T, E>) -> PromiseToast<'a, T, E>
    where
        F: Future<Output = Result<T, E>> + 'a,
        T: 'a,
        E: 'a,
    {
        let PromiseMessages {
            loading,
            success,
            error,
            finally,
        } = messages;

        let mut options = loading.into_options();
        options.kind = Some(ToastKind::Loading);
        let id = self.submit(options);

        let manager = self.clone();
        let tracked = id.clone();
        let future = async move {
            let outcome = future.await;

            let resolved = panic::catch_unwind(AssertUnwindSafe(|| match &outcome {
                Ok(value) => success.map(|d| settle(d.resolve(value), ToastKind::Success)),
                Err(err) => error.map(|d| settle(d.resolve(err), ToastKind::Error)),
            }));
            let patch = match resolved {
                Ok(patch) => patch,
                Err(payload) => {
                    tracing::warn!(id = %tracked, "promise message panicked, dismissing toast");
                    manager.dismiss(&tracked);
                    panic::resume_unwind(payload);
                }
            };
            match patch {
                Some(patch) => {
                    manager.update(&tracked, patch);
                }
                None => {
                    manager.dismiss(&tracked);
                }
            }
            tracing::debug!(id = %tracked, ok = outcome.is_ok(), "tracked future settled");

            if let Some(finally) = finally {
                finally();
            }
            outcome
        };

        PromiseToast {
            id,
            future: future.boxed_local(),
        }
    }
}

/// Terminal patch: always targets the tracked id, kind defaults to the
/// outcome's kind.
fn settle(mut options: ToastOptions, kind: ToastKind) -> ToastOptions {
    options.id = None;
    options.kind.get_or_insert(kind);
    options
}

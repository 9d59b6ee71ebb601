//! Runs blocking-from-the-UI's-point-of-view network work on the tokio runtime and
//! hands the outcome back to the presentation thread.
//!
//! Workers never call presentation code. They build a completion event and send it on
//! a channel; the presentation thread receives events one at a time and handles them
//! inline, so all UI state is mutated from that single thread.

use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, error};
use tokio::runtime::Handle;

use crate::error::AppError;

pub struct Dispatcher<E> {
    handle: Handle,
    tx: Sender<E>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Dispatcher {
            handle: self.handle.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> Dispatcher<E> {
    /// Creates a dispatcher spawning on `handle` and the receiving end of its queue.
    pub fn new(handle: Handle) -> (Self, Receiver<E>) {
        let (tx, rx) = mpsc::channel();
        (Dispatcher { handle, tx }, rx)
    }

    /// Another producer for the same queue, e.g. for a terminal input thread.
    pub fn sender(&self) -> Sender<E> {
        self.tx.clone()
    }

    /// Runs `task` on a detached worker and enqueues `wrap(outcome)`.
    ///
    /// Exactly one event is enqueued per call, even if `task` panics.
    pub fn dispatch<T, Fut, W>(&self, task: Fut, wrap: W)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        W: FnOnce(Result<T, AppError>) -> E + Send + 'static,
    {
        let tx = self.tx.clone();
        let worker = self.handle.spawn(task);

        self.handle.spawn(async move {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    error!("Background task did not finish: {}", join_error);
                    Err(AppError::Task(join_error.to_string()))
                }
            };

            if tx.send(wrap(outcome)).is_err() {
                debug!("Presentation loop is gone, dropping completion.");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct Done {
        index: usize,
        outcome: Result<usize, AppError>,
    }

    #[test]
    fn every_dispatch_yields_one_completion_on_the_receiving_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (dispatcher, rx) = Dispatcher::<(Done, thread::ThreadId)>::new(runtime.handle().clone());
        let n = 16;

        for index in 0..n {
            dispatcher.dispatch(
                async move {
                    tokio::time::sleep(Duration::from_millis((n - index) as u64)).await;
                    if index % 4 == 0 {
                        Err(AppError::Transport(format!("failure {}", index)))
                    } else {
                        Ok(index * 2)
                    }
                },
                move |outcome| (Done { index, outcome }, thread::current().id()),
            );
        }

        let presentation_thread = thread::current().id();
        let mut seen = HashSet::new();
        for _ in 0..n {
            let (done, producer_thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            // Handling happens here, on the thread that owns the receiver.
            assert_ne!(producer_thread, presentation_thread);
            match done.outcome {
                Ok(value) => assert_eq!(value, done.index * 2),
                Err(e) => assert!(!e.to_string().is_empty()),
            }
            assert!(seen.insert(done.index));
        }

        assert_eq!(seen.len(), n);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn panicking_task_still_completes() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (dispatcher, rx) = Dispatcher::<Result<(), AppError>>::new(runtime.handle().clone());

        dispatcher.dispatch(
            async {
                if true {
                    panic!("boom");
                }
                Ok(())
            },
            |outcome| outcome,
        );

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, Err(AppError::Task(_))));
    }
}

//! Serialized access to the presentation layer.
//!
//! A single task owns the [`Presenter`]. Requests are sent to it over a channel and handled one at
//! a time, so the "is a paywall presented?" check and the presentation that follows it can't
//! interleave with another request.
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::{
    presentation::{PresentationError, PresentationRequest, Presenter},
    Error, Result,
};

/// How the queue handled a presentation request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueueResult {
    Presented,
    AlreadyPresented,
    Failed(PresentationError),
}

enum Command {
    Present {
        request: PresentationRequest,
        dismiss_first: bool,
        reply: oneshot::Sender<QueueResult>,
    },
    IsPresented {
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Clone)]
pub(crate) struct PresentationQueue {
    sender: mpsc::UnboundedSender<Command>,
}

impl PresentationQueue {
    /// Spawn the queue task. Must be called from within a Tokio runtime.
    pub fn start(presenter: Arc<dyn Presenter>) -> PresentationQueue {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run(presenter, receiver));
        PresentationQueue { sender }
    }

    /// Submit a request and wait for the presentation layer to finish with it.
    ///
    /// If a paywall is already presented, the request is dropped unless `dismiss_first` is set,
    /// in which case the current paywall is dismissed before presenting.
    pub async fn submit(
        &self,
        request: PresentationRequest,
        dismiss_first: bool,
    ) -> Result<QueueResult> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Present {
                request,
                dismiss_first,
                reply,
            })
            .map_err(|_| Error::PresentationQueueClosed)?;
        response.await.map_err(|_| Error::PresentationQueueClosed)
    }

    /// Returns `true` if the queue task is gone, e.g. because its runtime shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn is_presented(&self) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::IsPresented { reply })
            .map_err(|_| Error::PresentationQueueClosed)?;
        response.await.map_err(|_| Error::PresentationQueueClosed)
    }
}

async fn run(presenter: Arc<dyn Presenter>, mut receiver: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Present {
                request,
                dismiss_first,
                reply,
            } => {
                let result = present(presenter.as_ref(), &request, dismiss_first).await;
                // The submitter may have gone away. The paywall is on screen regardless.
                let _ = reply.send(result);
            }
            Command::IsPresented { reply } => {
                let _ = reply.send(presenter.is_presented().await);
            }
        }
    }
    log::debug!(target: "paywall", "presentation queue stopped");
}

async fn present(
    presenter: &dyn Presenter,
    request: &PresentationRequest,
    dismiss_first: bool,
) -> QueueResult {
    if presenter.is_presented().await {
        if !dismiss_first {
            log::debug!(target: "paywall",
                        event_name = request.presentation_info.event_name();
                        "paywall already presented, dropping request");
            return QueueResult::AlreadyPresented;
        }
        log::debug!(target: "paywall", "dismissing presented paywall");
        presenter.dismiss().await;
    }

    match presenter.present(request).await {
        Ok(()) => QueueResult::Presented,
        Err(err) => {
            log::warn!(target: "paywall",
                       request:serde = request;
                       "failed to present paywall: {}", err);
            QueueResult::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{PresentationQueue, QueueResult};
    use crate::{
        event::EventData,
        presentation::{
            testing::{Call, RecordingPresenter},
            PresentationError, PresentationInfo, PresentationRequest,
        },
    };

    fn request(name: &str) -> PresentationRequest {
        PresentationRequest {
            presentation_info: PresentationInfo::ImplicitTrigger {
                event: EventData::new(name),
            },
            experiment: None,
            paywall_identifier: None,
            user_id: "user".to_owned(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn presents_when_nothing_is_shown() {
        let presenter = RecordingPresenter::default();
        let queue = PresentationQueue::start(Arc::new(presenter.clone()));

        assert!(!queue.is_presented().await.unwrap());
        let result = queue.submit(request("a"), false).await.unwrap();

        assert_eq!(result, QueueResult::Presented);
        assert!(queue.is_presented().await.unwrap());
        assert_eq!(presenter.presentations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_is_dropped_while_presented() {
        let presenter = RecordingPresenter::default();
        let queue = Arc::new(PresentationQueue::start(Arc::new(presenter.clone())));

        let (first, second) = tokio::join!(
            queue.submit(request("a"), false),
            queue.submit(request("b"), false)
        );

        assert_eq!(first.unwrap(), QueueResult::Presented);
        assert_eq!(second.unwrap(), QueueResult::AlreadyPresented);
        assert_eq!(presenter.presentations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dismisses_before_presenting_when_asked() {
        let presenter = RecordingPresenter::default().presented();
        let queue = PresentationQueue::start(Arc::new(presenter.clone()));

        let result = queue.submit(request("a"), true).await.unwrap();

        assert_eq!(result, QueueResult::Presented);
        let calls = presenter.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], Call::Dismiss);
        assert!(matches!(calls[1], Call::Present(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn reports_presenter_failure() {
        let presenter = RecordingPresenter::default();
        *presenter.fail_with.lock().unwrap() = Some(PresentationError::from("no window"));
        let queue = PresentationQueue::start(Arc::new(presenter.clone()));

        let result = queue.submit(request("a"), false).await.unwrap();

        assert_eq!(
            result,
            QueueResult::Failed(PresentationError::from("no window"))
        );
        assert!(!queue.is_presented().await.unwrap());
    }
}

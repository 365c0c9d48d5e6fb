use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::models::LicenseResult;

/// Results in completion order. Ends once the dispatcher has closed it,
/// which happens only after every launched worker has delivered.
#[derive(Debug)]
pub struct ResultStream {
    rx: mpsc::Receiver<LicenseResult>,
}

impl ResultStream {
    pub(crate) fn new(rx: mpsc::Receiver<LicenseResult>) -> Self {
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<LicenseResult> {
        self.rx.recv().await
    }
}

impl Stream for ResultStream {
    type Item = LicenseResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

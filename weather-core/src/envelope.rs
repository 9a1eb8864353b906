//! Tri-state result wrapper and the channel it is published on.

use std::sync::Mutex;

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

/// State of one asynchronous request as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Loading,
    Success(T),
    Error { data: Option<T>, message: String },
}

impl<T> Envelope<T> {
    pub fn error<S: Into<String>>(data: Option<T>, message: S) -> Self {
        Self::Error {
            data,
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// `true` once the request has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Error { data, .. } => data.as_ref(),
            Self::Loading => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A multi-reader value holder: keeps the latest value and broadcasts every
/// published value, in order, to current subscribers.
#[derive(Debug)]
pub struct Observable<T> {
    latest: Mutex<Option<T>>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            latest: Mutex::new(None),
            tx,
        }
    }

    pub fn publish(&self, value: T) {
        // Held across the send so `latest` and the broadcast order agree.
        let mut latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *latest = Some(value.clone());
        // No subscribers is not an error for an observable.
        let _ = self.tx.send(value);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<T> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl<T: Clone> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

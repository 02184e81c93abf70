//! Notification outbox: the queue request handlers feed, and the worker draining it.
//!
//! Delivery rows are written together with the inquiry, so the queue is only a wake-up
//! signal. Anything it drops is found again by the periodic sweep.

use crate::core::notifier::Outcome;
use crate::core::traits::Notifier;
use crate::infrastructure::entities::{Channel, Delivery};
use crate::infrastructure::settings::{DeliverySettings, Settings};
use crate::infrastructure::traits::{DbResult, DeliveryRepository, InquiryRepository};
use chrono::{DateTime, Utc};
use di::{Ref, inject, injectable};
use log::{debug, error, info, warn};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

const QUEUE_CAPACITY: usize = 256;
const SWEEP_BATCH: u32 = 50;

pub struct NotificationQueue {
    sender: mpsc::Sender<Uuid>,
    receiver: Mutex<Option<mpsc::Receiver<Uuid>>>,
}

#[injectable]
impl NotificationQueue {
    #[inject]
    pub fn create() -> NotificationQueue {
        NotificationQueue::with_capacity(QUEUE_CAPACITY)
    }
}

impl NotificationQueue {
    pub fn with_capacity(capacity: usize) -> NotificationQueue {
        let (sender, receiver) = mpsc::channel(capacity);

        NotificationQueue {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Never blocks the caller.
    pub fn enqueue(&self, inquiry_id: Uuid) {
        match self.sender.try_send(inquiry_id) {
            Ok(()) => debug!("queued notifications for inquiry {inquiry_id}"),
            Err(TrySendError::Full(_)) => {
                warn!("notification queue full, inquiry {inquiry_id} waits for the next sweep")
            }
            Err(TrySendError::Closed(_)) => {
                warn!("notification worker is gone, inquiry {inquiry_id} waits for the next sweep")
            }
        }
    }

    /// The receiving end, handed out once to the worker.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<Uuid>> {
        self.receiver.lock().ok()?.take()
    }
}

pub struct OutboxWorker {
    deliveries: Ref<dyn DeliveryRepository>,
    inquiries: Ref<dyn InquiryRepository>,
    notifier: Ref<dyn Notifier>,
    policy: DeliverySettings,
}

#[injectable]
impl OutboxWorker {
    #[inject]
    pub fn create(
        settings: Ref<Settings>,
        deliveries: Ref<dyn DeliveryRepository>,
        inquiries: Ref<dyn InquiryRepository>,
        notifier: Ref<dyn Notifier>,
    ) -> OutboxWorker {
        OutboxWorker::new(deliveries, inquiries, notifier, settings.delivery)
    }
}

impl OutboxWorker {
    pub fn new(
        deliveries: Ref<dyn DeliveryRepository>,
        inquiries: Ref<dyn InquiryRepository>,
        notifier: Ref<dyn Notifier>,
        policy: DeliverySettings,
    ) -> OutboxWorker {
        OutboxWorker {
            deliveries,
            inquiries,
            notifier,
            policy,
        }
    }

    fn stale_before(&self) -> DateTime<Utc> {
        let lease = chrono::Duration::from_std(self.policy.lease)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        Utc::now() - lease
    }

    /// Attempts every claimable delivery of the inquiry once. Returns how many were attempted.
    pub async fn process(&self, inquiry_id: Uuid) -> DbResult<usize> {
        let Some(inquiry) = self.inquiries.find_inquiry(inquiry_id).await? else {
            debug!("inquiry {inquiry_id} is gone, nothing to notify");
            return Ok(0);
        };

        let pending: Vec<Delivery> = self
            .deliveries
            .list_deliveries(inquiry_id)
            .await?
            .into_iter()
            .filter(|delivery| !delivery.status.is_terminal())
            .collect();

        let mut attempted = 0;
        for delivery in pending {
            let claimed = self
                .deliveries
                .claim_delivery(
                    inquiry_id,
                    delivery.channel,
                    self.policy.max_attempts,
                    self.stale_before(),
                )
                .await?;
            if !claimed {
                continue;
            }

            let outcome = match delivery.channel {
                Channel::Email => self.notifier.notify_email(&inquiry).await,
                Channel::Sms => self.notifier.notify_sms(&inquiry).await,
                Channel::ReplyEmail => self.notifier.notify_reply(&inquiry).await,
            };
            log_outcome(inquiry_id, delivery.channel, &outcome);

            let message_id = match &outcome {
                Outcome::Sent { message_id } => message_id.clone(),
                _ => None,
            };
            self.deliveries
                .record_delivery(
                    inquiry_id,
                    delivery.channel,
                    outcome.delivery_status(),
                    outcome.detail(),
                    message_id,
                )
                .await?;

            attempted += 1;
        }

        Ok(attempted)
    }

    /// Picks up deliveries nobody is working on: failed retryably, dropped from the queue, or
    /// abandoned mid-send. Rows abandoned on their last attempt are marked failed instead.
    pub async fn sweep(&self) -> DbResult<usize> {
        let stale_before = self.stale_before();

        let expired = self
            .deliveries
            .expire_exhausted_deliveries(self.policy.max_attempts, stale_before)
            .await?;
        if expired > 0 {
            warn!("{expired} notification(s) interrupted on their final attempt, marked failed");
        }

        let due = self
            .deliveries
            .due_inquiries(self.policy.max_attempts, stale_before, SWEEP_BATCH)
            .await?;

        let mut attempted = 0;
        for inquiry_id in due {
            attempted += self.process(inquiry_id).await?;
        }

        if attempted > 0 {
            info!("sweep attempted {attempted} notification(s)");
        }

        Ok(attempted)
    }

    /// Runs until the queue is closed.
    pub async fn run(&self, mut receiver: mpsc::Receiver<Uuid>) {
        let mut ticker = tokio::time::interval(self.policy.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "notification worker started, sweeping every {:?}",
            self.policy.sweep_interval
        );

        loop {
            tokio::select! {
                queued = receiver.recv() => match queued {
                    Some(inquiry_id) => {
                        if let Err(e) = self.process(inquiry_id).await {
                            error!("failed to process notifications for inquiry {inquiry_id}: {e}");
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!("notification sweep failed: {e}");
                    }
                }
            }
        }

        info!("notification worker stopped");
    }
}

fn log_outcome(inquiry_id: Uuid, channel: Channel, outcome: &Outcome) {
    let channel = channel.as_str();

    match outcome {
        Outcome::Sent { message_id } => info!(
            "{channel} notification for inquiry {inquiry_id} sent ({})",
            message_id.as_deref().unwrap_or("no message id")
        ),
        Outcome::Skipped(reason) => {
            info!("{channel} notification for inquiry {inquiry_id} skipped: {reason}")
        }
        Outcome::Failed { message, .. } => {
            warn!("{channel} notification for inquiry {inquiry_id} failed: {message}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receiver_is_handed_out_once() {
        let queue = NotificationQueue::with_capacity(2);
        let mut receiver = queue.take_receiver().unwrap();
        assert!(queue.take_receiver().is_none());

        let id = Uuid::new_v4();
        queue.enqueue(id);
        assert_eq!(receiver.recv().await, Some(id));
    }

    #[test]
    fn full_queue_does_not_block() {
        let queue = NotificationQueue::with_capacity(1);
        queue.enqueue(Uuid::new_v4());
        queue.enqueue(Uuid::new_v4());
    }
}

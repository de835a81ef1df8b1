//! Response Stager — turns one raw completion into a paced sequence of
//! assistant messages.
//!
//! The stager never talks to the model. It takes text that has already been
//! obtained, normalizes it, and hands out one sentence at a time, sleeping
//! between deliveries so a client can render bubbles as if they were typed.

use std::collections::VecDeque;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::coach::message::Message;
use crate::coach::text::split_into_sentences;

/// Default pause between two delivered units.
pub const DEFAULT_BUBBLE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct Stager {
    delay: Duration,
}

impl Default for Stager {
    fn default() -> Self {
        Self::new(DEFAULT_BUBBLE_DELAY)
    }
}

impl Stager {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Segments `raw` up front and returns a lazy, cancellable delivery.
    /// Empty or whitespace-only text yields a delivery with zero units.
    pub fn stage(&self, raw: &str) -> StagedUnits {
        StagedUnits {
            pending: split_into_sentences(raw).into(),
            delay: self.delay,
            delivered: 0,
            cancel: CancellationToken::new(),
        }
    }
}

/// A delivery in progress. Pull units with [`StagedUnits::next`].
///
/// `next` is cancel-safe: dropping its future mid-sleep loses no unit,
/// because a unit is only taken off the queue after the pause has elapsed.
#[derive(Debug)]
pub struct StagedUnits {
    pending: VecDeque<String>,
    delay: Duration,
    delivered: usize,
    cancel: CancellationToken,
}

impl StagedUnits {
    /// Waits out the pacing delay (except before the first unit) and returns
    /// the next unit, or `None` once exhausted or cancelled.
    pub async fn next(&mut self) -> Option<Message> {
        if self.cancel.is_cancelled() {
            self.pending.clear();
            return None;
        }
        if self.pending.is_empty() {
            return None;
        }

        if self.delivered > 0 && !self.delay.is_zero() {
            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(self.delay) => false,
            };
            if cancelled {
                self.pending.clear();
                return None;
            }
        }

        let text = self.pending.pop_front()?;
        self.delivered += 1;
        Some(Message::assistant(text))
    }

    /// Stops delivery. Any pending pause ends immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle that can cancel this delivery from another task.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::coach::message::Origin;

    const TWO_SENTENCES: &str =
        "Try a sulfate-free shampoo twice a week. It keeps your scalp balanced.";

    async fn drain(mut staged: StagedUnits) -> Vec<Message> {
        let mut units = Vec::new();
        while let Some(message) = staged.next().await {
            units.push(message);
        }
        units
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_units_in_order_as_assistant() {
        let units = drain(Stager::default().stage(TWO_SENTENCES)).await;
        let texts: Vec<&str> = units.iter().map(|m| m.text()).collect();
        assert_eq!(
            texts,
            vec!["Try a sulfate-free shampoo twice a week.", "It keeps your scalp balanced."]
        );
        assert!(units.iter().all(|m| m.origin() == Origin::Assistant));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_unit_is_immediate_and_no_delay_after_last() {
        let delay = Duration::from_millis(1000);
        let mut staged = Stager::new(delay).stage(TWO_SENTENCES);
        let start = Instant::now();

        assert!(staged.next().await.is_some());
        assert_eq!(start.elapsed(), Duration::ZERO);

        assert!(staged.next().await.is_some());
        let after_second = start.elapsed();
        assert!(after_second >= delay && after_second < delay * 2);

        assert!(staged.next().await.is_none());
        assert_eq!(start.elapsed(), after_second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_unit_has_no_delay() {
        let start = Instant::now();
        let units = drain(Stager::default().stage("Just one")).await;
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text(), "Just one.");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_empty_input_yields_zero_units() {
        for raw in ["", "   ", "\n\t "] {
            let mut staged = Stager::default().stage(raw);
            assert_eq!(staged.remaining(), 0);
            assert!(staged.next().await.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_pause_stops_delivery() {
        let delay = Duration::from_millis(1000);
        let mut staged = Stager::new(delay).stage("One. Two. Three.");
        assert_eq!(staged.next().await.unwrap().text(), "One.");

        let token = staged.cancellation();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            token.cancel();
        });

        let start = Instant::now();
        assert!(staged.next().await.is_none());
        assert!(start.elapsed() < delay);
        assert_eq!(staged.delivered(), 1);
        assert_eq!(staged.remaining(), 0);
        assert!(staged.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_first_unit() {
        let mut staged = Stager::default().stage("One. Two.");
        staged.cancel();
        assert!(staged.next().await.is_none());
        assert_eq!(staged.delivered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_next_future_loses_no_unit() {
        let delay = Duration::from_millis(1000);
        let mut staged = Stager::new(delay).stage("One. Two.");
        staged.next().await;

        let timed_out = tokio::time::timeout(Duration::from_millis(100), staged.next()).await;
        assert!(timed_out.is_err());
        assert_eq!(staged.remaining(), 1);
        assert_eq!(staged.next().await.unwrap().text(), "Two.");
    }
}

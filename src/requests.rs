use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// Latest-request-wins bookkeeping for rapid re-filtering.
///
/// Each logical need (a filter panel, a map viewport) is a channel. Starting
/// a request on a channel supersedes every earlier one on that channel, so a
/// slow stale response can be recognized and dropped instead of overwriting
/// a newer one.
///
/// A channel is tracked only while a ticket on it is outstanding; the entry
/// is removed when its last ticket finishes.
#[derive(Default)]
pub struct RequestSequencer {
    channels: Mutex<HashMap<String, ChannelState>>,
}

#[derive(Debug, Default)]
struct ChannelState {
    latest: u64,
    outstanding: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    channel: String,
    generation: u64,
}

impl RequestTicket {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Finishes its ticket when dropped, so a cancelled request still releases
/// its channel.
struct Outstanding<'a> {
    sequencer: &'a RequestSequencer,
    ticket: RequestTicket,
}

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        self.sequencer.finish(&self.ticket);
    }
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request on `channel`. Every ticket must be passed to
    /// [`finish`](Self::finish) once its result is handled.
    pub fn begin(&self, channel: &str) -> RequestTicket {
        let mut channels = self.channels.lock().unwrap_or_else(|p| p.into_inner());
        let state = channels.entry(channel.to_string()).or_default();
        state.latest += 1;
        state.outstanding += 1;

        RequestTicket {
            channel: channel.to_string(),
            generation: state.latest,
        }
    }

    /// True while no later request has begun on the ticket's channel.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let channels = self.channels.lock().unwrap_or_else(|p| p.into_inner());
        channels
            .get(&ticket.channel)
            .map_or(false, |state| state.latest == ticket.generation)
    }

    /// Releases `ticket` and reports whether it was still current. The
    /// channel is forgotten once no tickets on it remain.
    pub fn finish(&self, ticket: &RequestTicket) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(|p| p.into_inner());
        let Some(state) = channels.get_mut(&ticket.channel) else {
            return false;
        };
        let current = state.latest == ticket.generation;
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            channels.remove(&ticket.channel);
        }
        current
    }

    /// Number of channels with requests still outstanding.
    pub fn tracked_channels(&self) -> usize {
        self.channels.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Runs `fut` as the newest request on `channel`. Returns `None` when a
    /// newer request began before `fut` finished.
    pub async fn run_latest<F, T>(&self, channel: &str, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let guard = Outstanding {
            sequencer: self,
            ticket: self.begin(channel),
        };
        let output = fut.await;
        let current = self.is_current(&guard.ticket);
        drop(guard);

        if current {
            Some(output)
        } else {
            tracing::debug!("Dropping superseded result on channel '{}'", channel);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let seq = RequestSequencer::new();
        let first = seq.begin("filters");
        let second = seq.begin("filters");

        assert!(!seq.is_current(&first));
        assert!(seq.is_current(&second));
    }

    #[test]
    fn test_finish_reports_currency() {
        let seq = RequestSequencer::new();
        let first = seq.begin("filters");
        let second = seq.begin("filters");

        assert!(!seq.finish(&first));
        assert!(seq.finish(&second));
        assert_eq!(seq.tracked_channels(), 0);
    }

    #[test]
    fn test_channels_are_independent() {
        let seq = RequestSequencer::new();
        let filters = seq.begin("filters");
        let _map = seq.begin("map");

        assert!(seq.is_current(&filters));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_result_dropped() {
        let seq = RequestSequencer::new();

        let slow = seq.run_latest("filters", async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "old"
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            seq.run_latest("filters", async { "new" }).await
        };

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow, None);
        assert_eq!(fast, Some("new"));
    }

    #[tokio::test]
    async fn test_finished_channels_are_released() {
        let seq = RequestSequencer::new();

        for i in 0..1_000 {
            let channel = format!("c{}", i);
            assert_eq!(seq.run_latest(&channel, async { i }).await, Some(i));
        }

        assert_eq!(seq.tracked_channels(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_ticket_stays_stale_after_newer_finishes() {
        let seq = RequestSequencer::new();
        let stale = seq.begin("filters");

        assert_eq!(seq.run_latest("filters", async { "newer" }).await, Some("newer"));
        // Channel still held by the stale ticket
        assert_eq!(seq.tracked_channels(), 1);

        let third = seq.begin("filters");
        assert!(!seq.finish(&stale));
        assert!(seq.finish(&third));
        assert_eq!(seq.tracked_channels(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_releases_channel() {
        let seq = RequestSequencer::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            seq.run_latest("filters", tokio::time::sleep(Duration::from_secs(1))),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(seq.tracked_channels(), 0);
    }
}

//! Generation service boundary.
//!
//! The session never talks to a model directly. It hands requests to a
//! [`GenerationService`] and receives responses through
//! [`crate::EnvisionSession::handle_response`], correlated by request id. This keeps the
//! channel a plain message-passing boundary: the backend may live in another thread or
//! process.

use envision_core::{GenerationRequest, GenerationResponse};
use std::collections::VecDeque;
use std::time::Duration;

pub trait GenerationService {
    /// Hands a request to the backend. The response arrives later, out of band.
    fn dispatch(&mut self, request: GenerationRequest);

    /// Schedules a cached response for delivery after `delay`.
    fn replay(&mut self, response: GenerationResponse, delay: Duration);
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: Duration,
    response: GenerationResponse,
}

/// In-process service that queues outgoing requests and holds delayed replays on a
/// virtual clock. Hosts drain [`QueuedGenerationService::take_requests`], answer them
/// however they like, and feed [`QueuedGenerationService::advance`] output back into the
/// session.
#[derive(Debug, Clone, Default)]
pub struct QueuedGenerationService {
    clock: Duration,
    outgoing: VecDeque<GenerationRequest>,
    scheduled: Vec<Scheduled>,
}

impl QueuedGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_requests(&mut self) -> Vec<GenerationRequest> {
        self.outgoing.drain(..).collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled.len()
    }

    /// Moves the clock forward and returns every replay that became due, in due order.
    pub fn advance(&mut self, dt: Duration) -> Vec<GenerationResponse> {
        self.clock += dt;
        let clock = self.clock;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|s| s.due <= clock);
        self.scheduled = rest;
        due.sort_by_key(|s| s.due);
        due.into_iter().map(|s| s.response).collect()
    }

    /// Delivers every scheduled replay regardless of its delay.
    pub fn flush(&mut self) -> Vec<GenerationResponse> {
        let mut due: Vec<_> = self.scheduled.drain(..).collect();
        due.sort_by_key(|s| s.due);
        due.into_iter().map(|s| s.response).collect()
    }
}

impl GenerationService for QueuedGenerationService {
    fn dispatch(&mut self, request: GenerationRequest) {
        self.outgoing.push_back(request);
    }

    fn replay(&mut self, response: GenerationResponse, delay: Duration) {
        self.scheduled.push(Scheduled {
            due: self.clock + delay,
            response,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(id: &str) -> GenerationResponse {
        GenerationResponse::Finished {
            request_id: id.to_string(),
            result_text: String::new(),
            context_detail: None,
        }
    }

    #[test]
    fn replays_become_due_in_order() {
        let mut service = QueuedGenerationService::new();
        service.replay(finished("b"), Duration::from_millis(300));
        service.replay(finished("a"), Duration::from_millis(100));

        assert!(service.advance(Duration::from_millis(50)).is_empty());
        let due = service.advance(Duration::from_millis(300));
        let ids: Vec<_> = due.iter().map(|r| r.request_id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(service.scheduled_len(), 0);
    }
}

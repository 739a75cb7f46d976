use biometrics::{Collector, Counter};

pub(crate) static AUTH_REQUESTS: Counter = Counter::new("confidant.auth.requests");
pub(crate) static AUTH_FAILURES: Counter = Counter::new("confidant.auth.failures");
pub(crate) static SESSION_INVALIDATIONS: Counter =
    Counter::new("confidant.session.invalidations");

pub(crate) static CHAT_CONNECTS: Counter = Counter::new("confidant.chat.connects");
pub(crate) static CHAT_FRAMES_SENT: Counter = Counter::new("confidant.chat.frames_sent");
pub(crate) static CHAT_FRAMES_RECEIVED: Counter = Counter::new("confidant.chat.frames_received");
pub(crate) static CHAT_APPLICATION_ERRORS: Counter =
    Counter::new("confidant.chat.application_errors");
pub(crate) static CHAT_REJECTED_SUBMITS: Counter =
    Counter::new("confidant.chat.rejected_submits");
pub(crate) static CHAT_CLOSES: Counter = Counter::new("confidant.chat.closes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&AUTH_REQUESTS);
    collector.register_counter(&AUTH_FAILURES);
    collector.register_counter(&SESSION_INVALIDATIONS);

    collector.register_counter(&CHAT_CONNECTS);
    collector.register_counter(&CHAT_FRAMES_SENT);
    collector.register_counter(&CHAT_FRAMES_RECEIVED);
    collector.register_counter(&CHAT_APPLICATION_ERRORS);
    collector.register_counter(&CHAT_REJECTED_SUBMITS);
    collector.register_counter(&CHAT_CLOSES);
}

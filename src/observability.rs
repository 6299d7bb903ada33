use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ollama_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("ollama_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("ollama_chat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("ollama_chat.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("ollama_chat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("ollama_chat.stream.bytes");

pub(crate) static SESSION_SUBMISSIONS: Counter = Counter::new("ollama_chat.session.submissions");
pub(crate) static SESSION_DIAGNOSTICS: Counter = Counter::new("ollama_chat.session.diagnostics");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_SUBMISSIONS);
    collector.register_counter(&SESSION_DIAGNOSTICS);
}

#[cfg(test)]
mod tests {
    use biometrics::Sensor;

    use super::*;

    #[test]
    fn counters_accumulate() {
        register_biometrics(Collector::new());
        let before = SESSION_SUBMISSIONS.read();
        SESSION_SUBMISSIONS.click();
        assert!(SESSION_SUBMISSIONS.read() > before);
    }
}

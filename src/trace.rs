//! Feature-gated tracing hooks for the tracking pipeline.
//!
//! With the `tracing` feature the macros forward to `tracing`; without it they
//! expand to nothing observable, so pipeline stages can be instrumented
//! unconditionally.

/// Opens an info-level span around one pipeline stage.
#[cfg(feature = "tracing")]
macro_rules! stage_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::DisabledSpan
    };
}

/// Records an info-level event with structured fields.
#[cfg(feature = "tracing")]
macro_rules! stage_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($(&$value,)+);
    };
}

pub(crate) use stage_event;
pub(crate) use stage_span;

/// Stand-in span guard when the `tracing` feature is off.
#[cfg(not(feature = "tracing"))]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    /// Mirrors `tracing::Span::entered`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}

#[cfg(all(test, feature = "tracing"))]
mod tests {
    use std::sync::{Arc, Mutex};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Metadata, Subscriber};

    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl Subscriber for LevelRecorder {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }

        fn record(&self, _: &Id, _: &Record<'_>) {}

        fn record_follows_from(&self, _: &Id, _: &Id) {}

        fn event(&self, event: &Event<'_>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }

        fn enter(&self, _: &Id) {}

        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn stage_events_pass_an_info_filter() {
        let levels = Arc::new(Mutex::new(Vec::new()));
        tracing::subscriber::with_default(LevelRecorder(Arc::clone(&levels)), || {
            let _span = stage_span!("unit_stage").entered();
            stage_event!("unit_stage", scales = 3usize);
        });
        assert_eq!(*levels.lock().unwrap(), vec![Level::INFO]);
    }
}

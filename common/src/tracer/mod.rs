mod tracer_engine;

pub use tracer_engine::{TracerEngine, TracerError, TracerOptions};

/// Should be called at the start of each binary.
/// Initialises the stdout subscriber and emits a startup event naming the
/// binary, from the calling module so that `EnvFilter` directives apply.
#[macro_export]
macro_rules! init_tracer {
    ($default_level:expr) => {{
        let tracer = $crate::tracer::TracerEngine::new($crate::tracer::TracerOptions {
            default_level: $default_level,
            service_name: env!("CARGO_BIN_NAME"),
        });
        if let Ok(tracer) = &tracer {
            tracing::info!(
                service = tracer.service_name(),
                module = module_path!(),
                "tracer initialised"
            );
        }
        tracer
    }};
}

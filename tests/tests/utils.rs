use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("volley=debug,mock_endpoint=debug")
            .init();

        // No listener; the recorder only has to exist so the engine's metrics go somewhere.
        if let Err(err) = PrometheusBuilder::new().install_recorder() {
            error!("Failed to install metrics recorder: {err}");
        }
    });
}

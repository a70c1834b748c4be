mod preset;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_endpoint::{MockConnector, MockEndpoint};
use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;
use volley::prelude::*;
use volley::{ModeKind, PayloadMix};

/// Drive one traffic shape against an in-process mock endpoint and print its summary.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// constant|burst|ramp|smooth|periodic|churn|cold|warm|migration|parallel|mixed
    #[arg(long, default_value = "constant")]
    mode: ModeKind,

    /// Scenario name used in logs and the report
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    workers: Option<usize>,

    /// Target rate for rate-driven shapes
    #[arg(long)]
    rate: Option<NonZeroU32>,

    /// Hard stop, e.g. "90s" or "2m"
    #[arg(long)]
    duration: Option<humantime::Duration>,

    /// Stages for the ramp shape, e.g. "30@1000,30@2000"
    #[arg(long)]
    ramp: Option<RampSchedule>,

    #[clap(flatten)]
    endpoint: EndpointArgs,

    /// Expose metrics for Prometheus on this address
    #[arg(long)]
    prometheus: Option<SocketAddr>,

    /// Write the full run report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
struct EndpointArgs {
    /// Response latency of the mock endpoint
    #[arg(long, default_value = "1ms")]
    latency: humantime::Duration,

    /// Skew the latency; sets the spread of the distribution
    #[arg(long)]
    spread: Option<humantime::Duration>,

    /// Fail every request
    #[arg(long)]
    fail: bool,

    /// Reject requests beyond this many per second
    #[arg(long)]
    limit: Option<NonZeroU32>,

    /// Response payload classes, e.g. "small:512:50,medium:8192:30,large:65536:20"
    #[arg(long)]
    mix: Option<PayloadMix>,

    /// Fixed response payload size
    #[arg(long, default_value_t = 512)]
    payload: usize,
}

impl EndpointArgs {
    fn build(&self) -> MockEndpoint {
        let mut endpoint = match &self.spread {
            Some(spread) => MockEndpoint::skewed(*self.latency, **spread),
            None => MockEndpoint::fixed(*self.latency),
        };
        endpoint = match &self.mix {
            Some(mix) => endpoint.payload_mix(mix.clone()),
            None => endpoint.payload(self.payload),
        };
        if let Some(limit) = self.limit {
            endpoint = endpoint.limited(limit);
        }
        if self.fail {
            endpoint = endpoint.failing();
        }
        endpoint
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("volley=info,volley_benchmark=info,mock_endpoint=info")
        .init();

    let mut args = Args::parse();

    if let Some(addr) = args.prometheus {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    if args.mode == ModeKind::Mixed && args.endpoint.mix.is_none() {
        args.endpoint.mix = Some(PayloadMix::small_medium_large());
    }

    let stop = CancellationToken::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping run");
            ctrl_c.cancel();
        }
    });

    let preset = preset::Preset::new(args.mode, args.workers, args.rate, args.ramp.clone());
    let name = args.name.clone().unwrap_or_else(|| args.mode.to_string());

    let report = if preset.needs_connector() {
        let endpoint = args.endpoint.clone();
        let connector = MockConnector::new(move || endpoint.build());
        let stats = connector.stats();
        let scenario = Scenario::new(&name, connector).cancel_on(stop);
        let report = preset.apply(scenario, args.duration.map(Into::into)).await?;
        info!(
            "connects={} refused={} releases={}",
            stats.connects(),
            stats.refused(),
            stats.releases()
        );
        report
    } else {
        let scenario = Scenario::from_op(&name, args.endpoint.build()).cancel_on(stop);
        preset.apply(scenario, args.duration.map(Into::into)).await?
    };

    println!("{}", report.summary);
    if let Some(dispatch) = report.dispatch {
        println!("{dispatch}");
    }

    if let Some(path) = args.json {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        info!("Wrote report to {}", path.display());
    }

    Ok(())
}

//! `vigia-agent` -- headless realtime detection client.
//!
//! Streams frames from a camera, video file, or synthetic pattern to
//! the vigia inference service over WebSocket and logs the detection
//! results. Optionally writes overlay-annotated frames to disk.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default   | Description                                  |
//! |------------------------|----------|-----------|----------------------------------------------|
//! | `INFERENCE_WS_URL`     | yes      | --        | e.g. `ws://host:8001/ws/inference`           |
//! | `VIDEO_SOURCE`         | no       | `pattern` | `pattern`, `camera:<device>`, or a file path |
//! | `SAMPLE_EVERY`         | no       | `3`       | Send 1 frame in N                            |
//! | `PING_INTERVAL_SECS`   | no       | `5`       | Keepalive cadence                            |
//! | `SPEED_LIMIT`          | no       | `60`      | km/h threshold for speeding                  |
//! | `STOP_LINE_Y`          | no       | `120`     | Stop line Y (reference coordinates)          |
//! | `ENABLE_OCR`           | no       | `false`   | License plate OCR                            |
//! | `SIMULATE_INFRACTIONS` | no       | `true`    | Synthetic infraction generation              |
//! | `ENABLE_TRAFFIC_LIGHT` | no       | `false`   | Red light analysis + stop line overlay       |
//! | `ENABLE_LANE_DETECTION`| no       | `false`   | Lane analysis                                |
//! | `RECONNECT`            | no       | --        | `backoff` to retry lost connections          |
//! | `OUTPUT_DIR`           | no       | --        | Write annotated frames here                  |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigia_agent::config::AgentConfig;
use vigia_agent::runner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigia_agent=info,vigia_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(message) => {
            tracing::error!("{message}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        url = %config.session.ws_url,
        source = ?config.session.source,
        sample_every = config.sample_every,
        "Starting vigia-agent",
    );

    if let Err(message) = runner::run(config).await {
        tracing::error!(error = %message, "Session failed");
        std::process::exit(1);
    }
}

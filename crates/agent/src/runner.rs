//! Agent run loop: drive one streaming session and log / persist what
//! comes back.

use std::path::Path;

use vigia_client::{SessionController, SessionEvent, SessionStatus};
use vigia_core::FixedCadence;
use vigia_render::{build_plan, rasterize, OverlayConfig};

use crate::config::AgentConfig;

/// Run a session until the source ends, the transport fails, or
/// Ctrl-C arrives. Returns `Err` with a human-readable message on a
/// session error.
pub async fn run(config: AgentConfig) -> Result<(), String> {
    let controller = SessionController::new();
    let mut events = controller.subscribe();
    let mut status = controller.status();

    let rate = Box::new(FixedCadence::new(config.sample_every, 0.5, 70));
    let stop_line_y = config
        .session
        .options
        .enable_traffic_light
        .then_some(config.session.options.stop_line_y);

    controller
        .start(config.session, rate)
        .await
        .map_err(|e| e.to_string())?;

    let mut frames_written = 0u64;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
                tracing::info!("Shutting down");
                controller.stop().await;
                return Ok(());
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = status.borrow_and_update().clone();
                match current {
                    SessionStatus::Idle => {
                        tracing::info!("Session ended");
                        return Ok(());
                    }
                    SessionStatus::Error(message) => {
                        return Err(message);
                    }
                    SessionStatus::Connecting | SessionStatus::Active => {}
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        handle_event(event, stop_line_y, config.output_dir.as_deref(), &mut frames_written);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event subscriber lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

fn handle_event(
    event: SessionEvent,
    stop_line_y: Option<u32>,
    output_dir: Option<&Path>,
    frames_written: &mut u64,
) {
    match event {
        SessionEvent::Results(result) => {
            tracing::info!(
                detections = result.detections.len(),
                infractions = result.infractions_registered,
                lanes = ?result.lanes_detected,
                server_fps = ?result.fps,
                "Detection result",
            );
            if let (Some(dir), Some(frame)) = (output_dir, result.frame.as_deref()) {
                save_annotated_frame(&result, frame, stop_line_y, dir, frames_written);
            }
        }
        SessionEvent::Connected => tracing::info!("Connected"),
        SessionEvent::ConfigAcknowledged => tracing::info!("Config acknowledged"),
        SessionEvent::Disconnected(reason) => {
            tracing::warn!(?reason, "Disconnected");
        }
        SessionEvent::SourceEnded => tracing::info!("Video source ended"),
    }
}

/// Decode the server-annotated frame, paint the overlay on top, and
/// write it as a numbered PNG.
fn save_annotated_frame(
    result: &vigia_client::InferenceResult,
    frame: &str,
    stop_line_y: Option<u32>,
    dir: &Path,
    frames_written: &mut u64,
) {
    let mut image = match vigia_render::decode_annotated_frame(frame) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(error = %e, "Could not decode annotated frame");
            return;
        }
    };

    let plan = build_plan(
        &result.detections,
        &OverlayConfig {
            canvas_width: image.width(),
            canvas_height: image.height(),
            stop_line_y,
        },
    );
    rasterize(&mut image, &plan);

    let path = dir.join(format!("frame-{:06}.png", *frames_written));
    match image.save(&path) {
        Ok(()) => {
            *frames_written += 1;
            tracing::debug!(path = %path.display(), "Annotated frame written");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write frame");
        }
    }
}

//! `playwatch watch`: follow runs until they finish or the user interrupts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use playwatch_config::Config;
use playwatch_core::WatchSession;
use playwatch_protocols::{ExecutionSnapshot, FrameRecord};

pub(crate) async fn run(
    config: &Config,
    execution_ids: Vec<String>,
    save_frames: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = &save_frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let session = WatchSession::from_config(config)?;
    let mut subscriptions = Vec::new();

    subscriptions.push(
        session
            .connection()
            .on_state_change(|state| info!("Connection {}", state)),
    );

    for id in &execution_ids {
        subscriptions.push(session.store().subscribe(id.clone(), log_snapshot));

        let dir = save_frames.clone();
        subscriptions.push(session.frames().subscribe(id.clone(), move |frame| {
            debug!("Frame for {} ({} bytes)", frame.execution_id, frame.len());
            if let Some(dir) = &dir {
                if let Err(e) = save_frame(dir, frame) {
                    warn!("Failed to save frame for {}: {:#}", frame.execution_id, e);
                }
            }
        }));

        session.watch(id.clone());
    }

    let state = session.connect().await;
    info!("Watching {} run(s), connection {}", execution_ids.len(), state);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = tick.tick() => {
                if session.all_terminal() {
                    info!("All watched runs finished");
                    break;
                }
            }
        }
    }

    session.shutdown();

    // Freeze-frame: the last image of each run.
    if let Some(dir) = &save_frames {
        for id in &execution_ids {
            if let Some(frame) = session.frames().latest(id) {
                let path = save_frame(dir, &frame)?;
                info!("Final frame for {} saved to {}", id, path.display());
            }
        }
    }

    for id in &execution_ids {
        match session.store().get(id) {
            Some(snapshot) => println!(
                "{}: {} ({}/{} steps){}",
                id,
                snapshot.status,
                snapshot.current_step_index,
                snapshot.total_steps,
                snapshot
                    .error
                    .as_deref()
                    .map(|e| format!(" - {}", e))
                    .unwrap_or_default()
            ),
            None => println!("{}: no updates received", id),
        }
    }

    if let Some(error) = session.last_server_error() {
        warn!("Last server error: {}", error);
    }

    drop(subscriptions);
    Ok(())
}

fn log_snapshot(snapshot: &Arc<ExecutionSnapshot>) {
    let step = snapshot
        .current_step()
        .map(|s| format!(" [{}: {}]", s.step_name, s.status))
        .unwrap_or_default();
    info!(
        "{} {} step {}/{} ({:.0}%){}",
        snapshot.execution_id,
        snapshot.status,
        snapshot.current_step_index,
        snapshot.total_steps,
        snapshot.progress() * 100.0,
        step
    );
    if let Some(output) = snapshot.current_step().and_then(|s| s.output_text()) {
        debug!("{} output: {}", snapshot.execution_id, output);
    }
    if let Some(error) = &snapshot.error {
        warn!("{} error: {}", snapshot.execution_id, error);
    }
}

/// Write a frame as `<dir>/<execution_id>.<ext>`, overwriting the previous one.
fn save_frame(dir: &Path, frame: &FrameRecord) -> anyhow::Result<PathBuf> {
    let ext = image::guess_format(&frame.image)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin");
    let name: String = frame
        .execution_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{}.{}", name, ext));
    std::fs::write(&path, &frame.image)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

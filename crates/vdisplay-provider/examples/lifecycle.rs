//! End-to-end lifecycle walkthrough against the recording fake session.
//!
//! Builds a descriptor, brings a virtual display live, applies a mode list,
//! and lets the "server" terminate the display so the handler fires on the
//! dispatch queue. Run with `RUST_LOG=debug` to watch the lifecycle logs.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use vdisplay_core::domain::color;
use vdisplay_core::{DisplayMode, DisplaySettings, SizeMillimeters, TerminationReason};
use vdisplay_provider::{DisplayDescriptor, RecordingSession, TaskQueue, VirtualDisplay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let queue = TaskQueue::new("display-callbacks");
    let (terminated_tx, terminated_rx) = tokio::sync::oneshot::channel();

    let mut descriptor = DisplayDescriptor::new();
    descriptor.vendor_id = 0x4D56;
    descriptor.product_id = 1;
    descriptor.serial_num = 2024;
    descriptor.name = "Demo Panel 27\"".to_string();
    descriptor.size_in_millimeters = SizeMillimeters::new(596.0, 335.0);
    descriptor.max_pixels_wide = 3840;
    descriptor.max_pixels_high = 2160;
    descriptor.red_primary = color::SRGB_RED;
    descriptor.green_primary = color::SRGB_GREEN;
    descriptor.blue_primary = color::SRGB_BLUE;
    descriptor.white_point = color::D65_WHITE;
    descriptor.set_dispatch_queue(queue);
    descriptor.set_termination_handler(move || {
        info!("termination handler ran on the dispatch queue");
        let _ = terminated_tx.send(());
    });

    // A real deployment connects with TcpDisplaySession::connect(addr).
    let session = Arc::new(RecordingSession::new());

    let virtual_display = VirtualDisplay::create(descriptor, session.clone()).await?;
    info!(
        display = %virtual_display.display_id(),
        name = virtual_display.name(),
        "virtual display is live"
    );

    let settings = DisplaySettings::with_modes(vec![
        DisplayMode::new(3840, 2160, 60.0)?,
        DisplayMode::new(1920, 1080, 60.0)?,
    ]);
    virtual_display.apply_settings(&settings).await?;
    info!(modes = virtual_display.modes().len(), hi_dpi = virtual_display.hi_dpi(), "settings applied");

    session.inject_termination(TerminationReason::ServerClosed);
    terminated_rx.await?;
    info!(terminated = virtual_display.is_terminated(), "lifecycle complete");

    Ok(())
}

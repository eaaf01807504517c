//! Integration tests for the virtual display lifecycle.
//!
//! These tests exercise `VirtualDisplay` through its *public* API against
//! the recording fake session, the same way a provider application uses it.
//! They verify:
//!
//! - The happy path: a valid descriptor becomes a live display whose
//!   read-only attributes mirror the descriptor, and applied settings are
//!   mirrored only after the server acknowledged them.
//! - The error paths: validation failures never touch the session, refused
//!   registrations produce no live object, and locally rejected settings
//!   leave the mirror untouched without any RPC.
//! - The termination handshake: however many signals race in, and whether
//!   the server, `close()`, or `Drop` initiates it, the termination handler
//!   runs exactly once on the dispatch queue and the display goes inert.
//! - Serialization: concurrent `apply_settings` callers are observed by
//!   the session strictly one at a time, in some total order.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use vdisplay_core::domain::color;
use vdisplay_core::{
    DisplayId, DisplayMode, DisplaySettings, SizeMillimeters, TerminationReason,
};
use vdisplay_provider::{
    ApplyError, CreateError, DisplayDescriptor, DisplaySession, RecordingSession, SessionCall,
    SessionError, TaskQueue, VirtualDisplay,
};

const WAIT: Duration = Duration::from_secs(5);

/// Descriptor used throughout: identity (1, 1, 42), bounds 1920x1080.
fn test_descriptor() -> DisplayDescriptor {
    let mut descriptor = DisplayDescriptor::new();
    descriptor.vendor_id = 1;
    descriptor.product_id = 1;
    descriptor.serial_num = 42;
    descriptor.name = "Test Panel".to_string();
    descriptor.size_in_millimeters = SizeMillimeters::new(527.0, 296.0);
    descriptor.max_pixels_wide = 1920;
    descriptor.max_pixels_high = 1080;
    descriptor.red_primary = color::SRGB_RED;
    descriptor.green_primary = color::SRGB_GREEN;
    descriptor.blue_primary = color::SRGB_BLUE;
    descriptor.white_point = color::D65_WHITE;
    descriptor
}

fn mode(width: u32, height: u32) -> DisplayMode {
    DisplayMode::new(width, height, 60.0).expect("test mode is valid")
}

/// Counter plus wake-up channel for observing termination handler runs.
fn counting_handler() -> (
    Arc<AtomicU32>,
    mpsc::UnboundedReceiver<()>,
    impl FnOnce() + Send + 'static,
) {
    let fired = Arc::new(AtomicU32::new(0));
    let (tx, rx) = mpsc::unbounded_channel();
    let handler_fired = Arc::clone(&fired);
    let handler = move || {
        handler_fired.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(());
    };
    (fired, rx, handler)
}

// ── Creation ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_mirrors_descriptor_and_registers_once() {
    let session = Arc::new(RecordingSession::new());
    let display = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect("creation succeeds");

    // Identity and physical attributes come straight from the descriptor.
    assert_eq!(display.vendor_id(), 1);
    assert_eq!(display.product_id(), 1);
    assert_eq!(display.serial_num(), 42);
    assert_eq!(display.name(), "Test Panel");
    assert_eq!(display.max_pixels_wide(), 1920);
    assert_eq!(display.max_pixels_high(), 1080);
    assert_eq!(display.white_point(), color::D65_WHITE);

    // Runtime identity comes from the grant.
    assert_eq!(display.display_id(), DisplayId(1));
    assert!(!display.is_terminated());

    // No settings were ever applied: the mirror starts empty.
    assert!(display.modes().is_empty());
    assert!(!display.hi_dpi());

    // Exactly one registration, carrying the full descriptor payload.
    let calls = session.calls();
    assert_eq!(
        calls,
        vec![SessionCall::Register(test_descriptor().registration_request())]
    );
}

#[tokio::test]
async fn test_create_rejects_invalid_descriptor_without_touching_session() {
    let session = Arc::new(RecordingSession::new());
    let descriptor = DisplayDescriptor::new(); // zeroed identity

    let err = VirtualDisplay::create(descriptor, session.clone())
        .await
        .expect_err("degenerate identity must fail");

    assert!(matches!(err, CreateError::Validation(_)));
    assert!(session.calls().is_empty(), "no RPC before validation passes");
}

#[tokio::test]
async fn test_create_surfaces_registration_rejection() {
    let session = Arc::new(RecordingSession::new());
    session.reject_next_register("display quota exhausted");

    let err = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect_err("refused registration must fail");

    assert!(matches!(
        err,
        CreateError::Session(SessionError::Rejected(_))
    ));
    // The register attempt is all the server ever saw.
    assert_eq!(session.calls().len(), 1);
}

#[tokio::test]
async fn test_create_rolls_back_when_session_is_already_bound() {
    let session = Arc::new(RecordingSession::new());
    // Claim the termination stream, as a display already bound to this
    // session would have.
    let _stream = session.take_terminations().expect("first claim");

    let err = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect_err("bound session must be refused");

    assert!(matches!(
        err,
        CreateError::Session(SessionError::AlreadyBound)
    ));
    // The registration that went through was rolled back.
    let calls = session.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], SessionCall::Deregister { .. }));
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_settings_mirrors_acknowledged_state() {
    let session = Arc::new(RecordingSession::new());
    let display = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect("creation succeeds");

    let settings = DisplaySettings::with_modes(vec![mode(1920, 1080), mode(1280, 720)]);
    display.apply_settings(&settings).await.expect("apply");
    assert_eq!(display.modes(), settings.modes);
    assert!(!display.hi_dpi());

    // A second apply replaces the mirror wholesale.
    let mut second = DisplaySettings::with_modes(vec![mode(960, 540)]);
    second.hi_dpi = true;
    display.apply_settings(&second).await.expect("apply");
    assert_eq!(display.modes(), second.modes);
    assert!(display.hi_dpi());

    let calls = session.calls();
    assert_eq!(calls.len(), 3); // register + two pushes
    assert_eq!(
        calls[2],
        SessionCall::PushSettings {
            display_id: DisplayId(1),
            modes: second.modes.clone(),
            hi_dpi: true,
        }
    );
}

#[tokio::test]
async fn test_apply_settings_rejects_mode_exceeding_limits() {
    let session = Arc::new(RecordingSession::new());
    let display = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect("creation succeeds");

    // 2160 > 1080: rejected locally.
    let settings = DisplaySettings::with_modes(vec![mode(3840, 2160)]);
    let err = display.apply_settings(&settings).await.unwrap_err();
    assert!(matches!(err, ApplyError::ModeExceedsLimits { .. }));

    // The mirror is unchanged and the server never saw a push.
    assert!(display.modes().is_empty());
    assert_eq!(session.calls().len(), 1);
}

#[tokio::test]
async fn test_apply_settings_rejects_empty_mode_list() {
    let session = Arc::new(RecordingSession::new());
    let display = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect("creation succeeds");

    let err = display
        .apply_settings(&DisplaySettings::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::EmptyModeList));
    assert_eq!(session.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_push_leaves_mirror_unchanged() {
    let session = Arc::new(RecordingSession::new());
    let display = VirtualDisplay::create(test_descriptor(), session.clone())
        .await
        .expect("creation succeeds");

    let first = DisplaySettings::with_modes(vec![mode(1920, 1080)]);
    display.apply_settings(&first).await.expect("apply");

    session.reject_next_push("mode list not supported");
    let second = DisplaySettings::with_modes(vec![mode(1280, 720)]);
    let err = display.apply_settings(&second).await.unwrap_err();
    assert!(matches!(err, ApplyError::Session(_)));

    // Still the first settings: the mirror only tracks acknowledged state.
    assert_eq!(display.modes(), first.modes);
}

// ── Termination ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_repeated_server_termination_fires_handler_exactly_once() {
    let session = Arc::new(RecordingSession::new());
    let queue = TaskQueue::new("termination-test");
    let (fired, mut fired_rx, handler) = counting_handler();

    // A task submitted before the handler must run before it (FIFO queue).
    let earlier_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&earlier_ran);
    queue.submit(move || flag.store(true, Ordering::SeqCst));

    let handler_saw_earlier = Arc::new(AtomicBool::new(false));
    let saw = Arc::clone(&handler_saw_earlier);
    let earlier = Arc::clone(&earlier_ran);
    let wrapped_handler = move || {
        saw.store(earlier.load(Ordering::SeqCst), Ordering::SeqCst);
        handler();
    };

    let mut descriptor = test_descriptor();
    descriptor.set_dispatch_queue(queue.clone());
    descriptor.set_termination_handler(wrapped_handler);

    let display = VirtualDisplay::create(descriptor, session.clone())
        .await
        .expect("creation succeeds");

    session.inject_termination(TerminationReason::ServerClosed);
    session.inject_termination(TerminationReason::ResourceReclaimed);

    timeout(WAIT, fired_rx.recv())
        .await
        .expect("handler must run")
        .expect("channel open");

    // Give any (incorrect) second delivery a chance to surface.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    sleep(Duration::from_millis(50)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 1, "handler fires exactly once");
    assert!(
        handler_saw_earlier.load(Ordering::SeqCst),
        "handler ran on the queue, after earlier submissions"
    );
    assert!(display.is_terminated());

    // The display is inert: no RPC is attempted after termination.
    let err = display
        .apply_settings(&DisplaySettings::with_modes(vec![mode(1920, 1080)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::DisplayTerminated));
    assert_eq!(session.calls().len(), 1, "register only; no push after death");
}

#[tokio::test]
async fn test_close_deregisters_and_fires_handler_once() {
    let session = Arc::new(RecordingSession::new());
    let queue = TaskQueue::new("close-test");
    let (fired, mut fired_rx, handler) = counting_handler();

    let mut descriptor = test_descriptor();
    descriptor.set_dispatch_queue(queue);
    descriptor.set_termination_handler(handler);

    let display = VirtualDisplay::create(descriptor, session.clone())
        .await
        .expect("creation succeeds");

    display.close().await.expect("close succeeds");
    assert!(display.is_terminated());

    timeout(WAIT, fired_rx.recv())
        .await
        .expect("handler must run")
        .expect("channel open");

    // Closing again is a suppressed no-op.
    display.close().await.expect("second close is a no-op");
    sleep(Duration::from_millis(50)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let calls = session.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        SessionCall::Deregister {
            display_id: DisplayId(1)
        }
    );

    let err = display
        .apply_settings(&DisplaySettings::with_modes(vec![mode(1920, 1080)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::DisplayTerminated));
}

#[tokio::test]
async fn test_drop_completes_the_termination_handshake() {
    let session = Arc::new(RecordingSession::new());
    let queue = TaskQueue::new("drop-test");
    let (fired, mut fired_rx, handler) = counting_handler();

    let mut descriptor = test_descriptor();
    descriptor.set_dispatch_queue(queue);
    descriptor.set_termination_handler(handler);

    let display = VirtualDisplay::create(descriptor, session.clone())
        .await
        .expect("creation succeeds");
    drop(display);

    timeout(WAIT, fired_rx.recv())
        .await
        .expect("handler must run after drop")
        .expect("channel open");
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // The deregister runs on the lifecycle monitor; wait for it to land.
    let mut deregistered = false;
    for _ in 0..100 {
        if session
            .calls()
            .iter()
            .any(|call| matches!(call, SessionCall::Deregister { .. }))
        {
            deregistered = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(deregistered, "drop must deregister the display");
}

// ── Serialization ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_applies_reach_the_server_one_at_a_time() {
    let session = Arc::new(RecordingSession::new());
    let display = Arc::new(
        VirtualDisplay::create(test_descriptor(), session.clone())
            .await
            .expect("creation succeeds"),
    );

    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let display = Arc::clone(&display);
        tasks.push(tokio::spawn(async move {
            let settings = DisplaySettings::with_modes(vec![mode(100 * (i + 1), 100)]);
            display.apply_settings(&settings).await
        }));
    }
    for task in tasks {
        task.await.expect("task completes").expect("apply succeeds");
    }

    assert_eq!(
        session.max_concurrent_pushes(),
        1,
        "settings pushes must never interleave"
    );

    let pushes: Vec<_> = session
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            SessionCall::PushSettings { modes, .. } => Some(modes),
            _ => None,
        })
        .collect();
    assert_eq!(pushes.len(), 8);

    // The mirror matches the last acknowledged push.
    assert_eq!(display.modes(), *pushes.last().expect("eight pushes"));
}

// ── End-to-end scenario ───────────────────────────────────────────────────────

/// The full walkthrough: register, apply 1920x1080@60, out-of-bounds
/// rejection, server termination, exactly-once callback, inert afterwards.
#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let session = Arc::new(RecordingSession::new());
    let queue = TaskQueue::new("scenario");
    let (fired, mut fired_rx, handler) = counting_handler();

    let mut descriptor = test_descriptor();
    descriptor.set_dispatch_queue(queue);
    descriptor.set_termination_handler(handler);

    let display = VirtualDisplay::create(descriptor, session.clone())
        .await
        .expect("creation succeeds");

    display
        .apply_settings(&DisplaySettings::with_modes(vec![mode(1920, 1080)]))
        .await
        .expect("in-bounds settings apply");

    let err = display
        .apply_settings(&DisplaySettings::with_modes(vec![mode(3840, 2160)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::ModeExceedsLimits { .. }));

    session.inject_termination(TerminationReason::ServerClosed);
    timeout(WAIT, fired_rx.recv())
        .await
        .expect("handler must run")
        .expect("channel open");
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let err = display
        .apply_settings(&DisplaySettings::with_modes(vec![mode(1920, 1080)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::DisplayTerminated));
}

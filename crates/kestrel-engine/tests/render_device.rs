use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kestrel_engine::command::{BufferUsage, Command, CommandBuffer, CullMode, DrawCall, ResourceIds};
use kestrel_engine::config::RenderSettings;
use kestrel_engine::coords::{Color, Rect, Size2};
use kestrel_engine::device::null::{Handle, JournalEntry, NullBackend, NullFaults, NullJournal};
use kestrel_engine::device::{
    ApiVersion, BackendKind, ContextCreationError, HeadlessWindow, InitStage, NativeWindow,
    RenderDevice, RenderState, SubmitError,
};
use kestrel_engine::shader::{Shader, ShaderDesc};

fn window() -> Arc<dyn NativeWindow> {
    Arc::new(HeadlessWindow::new(Size2::new(320, 240)))
}

fn device_with(backend: NullBackend) -> (RenderDevice, NullJournal) {
    let journal = backend.journal();
    let device = RenderDevice::init(backend, window(), &RenderSettings::default())
        .expect("null device starts");
    (device, journal)
}

fn marker(seq: u32) -> Command {
    Command::SetViewport(Rect::new(seq as f32, 0.0, 1.0, 1.0))
}

fn single(command: Command) -> CommandBuffer {
    std::iter::once(command).collect()
}

// ── lifecycle ─────────────────────────────────────────────────────────────

#[test]
fn running_after_init_and_joined_after_stop() {
    let (mut device, _journal) = device_with(NullBackend::new());
    assert_eq!(device.state(), RenderState::Running);
    assert!(device.is_running());
    assert_eq!(device.backend_name(), "null");

    device.stop();
    assert_eq!(device.state(), RenderState::Joined);
    assert!(!device.is_running());

    device.stop();
    assert_eq!(device.state(), RenderState::Joined);
}

#[test]
fn context_is_bound_on_render_thread() {
    let (mut device, journal) = device_with(NullBackend::new());
    device.stop();

    let bound = journal.bound_threads();
    assert_eq!(bound.last(), Some(&Some("render".to_string())));
    assert!(journal
        .entries()
        .contains(&JournalEntry::Unbound(Some("render".to_string()))));
}

#[test]
fn create_selects_null_backend() {
    let device = RenderDevice::create(BackendKind::Null, window(), &RenderSettings::default())
        .expect("null device starts");
    assert_eq!(device.backend_name(), "null");
}

#[test]
fn drop_releases_surface_then_context_then_display() {
    let (device, journal) = device_with(NullBackend::new());
    drop(device);

    assert_eq!(journal.released(), vec![Handle::Surface, Handle::Context, Handle::Display]);
}

#[test]
fn drop_with_queued_buffers_does_not_hang() {
    let (device, journal) = device_with(NullBackend::new());
    for seq in 0..500 {
        device.submit(single(marker(seq))).unwrap();
    }

    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        drop(device);
        let _ = done_tx.send(());
    });

    done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("device drop finished");
    assert_eq!(journal.commands().len(), 500);
}

// ── submission ────────────────────────────────────────────────────────────

#[test]
fn buffers_execute_in_submission_order() {
    let (mut device, journal) = device_with(NullBackend::new());

    let mut expected = Vec::new();
    for seq in 0..64 {
        let buffer: CommandBuffer = (0..4).map(|i| marker(seq * 4 + i)).collect();
        expected.extend(buffer.commands().iter().cloned());
        device.submit(buffer).unwrap();
    }
    device.stop();

    assert_eq!(journal.commands(), expected);
}

#[test]
fn submit_after_stop_returns_the_buffer() {
    let (mut device, journal) = device_with(NullBackend::new());
    device.stop();

    let buffer = single(marker(7));
    match device.submit(buffer.clone()) {
        Err(SubmitError::Stopped(returned)) => assert_eq!(returned, buffer),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(journal.commands().is_empty());
}

#[test]
fn failing_command_does_not_stop_the_thread() {
    let mut ids = ResourceIds::new();
    let (mut device, journal) = device_with(NullBackend::new());

    let (shader, create_shader) = Shader::create(&mut ids, ShaderDesc::wgsl("flat", ""));
    let vb = ids.buffer();
    let missing = ids.buffer();

    let mut first = CommandBuffer::new();
    first
        .push(create_shader.clone())
        .draw(DrawCall::new(shader.id(), missing, 3))
        .push(marker(1));
    device.submit(first).unwrap();

    let mut second = CommandBuffer::new();
    second
        .push(Command::CreateBuffer {
            id: vb,
            usage: BufferUsage::Vertex,
            data: vec![0; 36],
        })
        .draw(DrawCall::new(shader.id(), vb, 3))
        .present();
    device.submit(second).unwrap();

    device.stop();

    let executed = journal.commands();
    assert_eq!(executed[0], create_shader);
    assert_eq!(executed[1], marker(1));
    assert!(matches!(executed[3], Command::Draw(_)));
    assert_eq!(journal.presents(), 1);
    assert!(journal
        .entries()
        .iter()
        .any(|e| matches!(e, JournalEntry::Rejected(Command::Draw(_)))));
}

#[test]
fn panicking_command_does_not_stop_the_thread() {
    let backend = NullBackend::new().with_faults(NullFaults {
        panic_on: Some("SetCullMode"),
        ..NullFaults::default()
    });
    let (mut device, journal) = device_with(backend);

    let mut first = CommandBuffer::new();
    first.push(Command::SetCullMode(CullMode::Back)).push(marker(1));
    device.submit(first).unwrap();
    device.submit(single(marker(2))).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while journal.commands().len() < 2 {
        assert!(Instant::now() < deadline, "render thread stopped executing buffers");
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(device.is_running());
    assert_eq!(device.state(), RenderState::Running);

    device.submit(single(marker(3))).unwrap();
    device.stop();

    assert_eq!(journal.commands(), vec![marker(1), marker(2), marker(3)]);
    assert!(journal
        .entries()
        .contains(&JournalEntry::Unbound(Some("render".to_string()))));
    assert_eq!(journal.released(), vec![Handle::Surface, Handle::Context, Handle::Display]);
}

#[test]
fn resize_applies_before_next_buffer() {
    let (mut device, journal) = device_with(NullBackend::new());

    device.submit(single(marker(0))).unwrap();
    device.stop();
    assert!(!journal
        .entries()
        .iter()
        .any(|e| matches!(e, JournalEntry::Resized(_))));

    let (mut device, journal) = device_with(NullBackend::new());
    device.resize(Size2::new(640, 480));
    device.resize(Size2::new(1024, 768));
    let mut frame = CommandBuffer::new();
    frame.clear(Color::BLACK).present();
    device.submit(frame).unwrap();
    device.stop();

    let entries = journal.entries();
    let resized: Vec<_> = entries
        .iter()
        .filter(|e| matches!(e, JournalEntry::Resized(_)))
        .collect();
    assert_eq!(resized, vec![&JournalEntry::Resized(Size2::new(1024, 768))]);

    let resize_at = entries
        .iter()
        .position(|e| matches!(e, JournalEntry::Resized(_)))
        .unwrap();
    let clear_at = entries
        .iter()
        .position(|e| matches!(e, JournalEntry::Executed(Command::Clear { .. })))
        .unwrap();
    assert!(resize_at < clear_at);
}

// ── negotiation ───────────────────────────────────────────────────────────

#[test]
fn highest_accepted_version_wins() {
    let backend = NullBackend::new().with_faults(NullFaults {
        rejected_versions: vec![ApiVersion::new(3, 0)],
        ..NullFaults::default()
    });
    let journal = backend.journal();
    let settings = RenderSettings {
        api_versions: vec![ApiVersion::new(2, 0), ApiVersion::new(3, 0)],
        ..RenderSettings::default()
    };

    let device = RenderDevice::init(backend, window(), &settings).unwrap();
    assert_eq!(device.capabilities().api_version, ApiVersion::new(2, 0));

    let attempts: Vec<ApiVersion> = journal
        .entries()
        .into_iter()
        .filter_map(|e| match e {
            JournalEntry::ContextAttempt(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![ApiVersion::new(3, 0), ApiVersion::new(2, 0)]);
}

#[test]
fn no_accepted_version_fails_and_releases() {
    let backend = NullBackend::new().with_faults(NullFaults {
        rejected_versions: vec![ApiVersion::new(3, 0), ApiVersion::new(2, 0)],
        ..NullFaults::default()
    });
    let journal = backend.journal();

    let err = RenderDevice::init(backend, window(), &RenderSettings::default())
        .err()
        .expect("init fails");
    match err {
        ContextCreationError::NoSupportedVersion { tried, .. } => {
            assert_eq!(tried, vec![ApiVersion::new(3, 0), ApiVersion::new(2, 0)]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(journal.released(), vec![Handle::Surface, Handle::Display]);
}

#[test]
fn empty_version_list_is_rejected() {
    let settings = RenderSettings {
        api_versions: Vec::new(),
        ..RenderSettings::default()
    };
    let err = RenderDevice::init(NullBackend::new(), window(), &settings)
        .err()
        .expect("init fails");
    assert!(matches!(err, ContextCreationError::NoCandidateVersions));
}

// ── partial initialisation ────────────────────────────────────────────────

#[test]
fn failed_stage_releases_only_what_was_acquired() {
    let cases = [
        (InitStage::Display, vec![]),
        (InitStage::Surface, vec![Handle::Display]),
        (InitStage::Config, vec![Handle::Surface, Handle::Display]),
    ];

    for (stage, released) in cases {
        let backend = NullBackend::new().with_faults(NullFaults {
            fail_stage: Some(stage),
            ..NullFaults::default()
        });
        let journal = backend.journal();

        let err = RenderDevice::init(backend, window(), &RenderSettings::default())
            .err()
            .expect("init fails");
        assert!(
            matches!(err, ContextCreationError::Stage { stage: s, .. } if s == stage),
            "{stage}: {err}"
        );
        assert_eq!(journal.released(), released, "{stage}");
    }
}

#[test]
fn zero_sized_window_fails_at_surface() {
    let window: Arc<dyn NativeWindow> = Arc::new(HeadlessWindow::new(Size2::new(0, 0)));
    let err = RenderDevice::init(NullBackend::new(), window, &RenderSettings::default())
        .err()
        .expect("init fails");
    assert!(matches!(
        err,
        ContextCreationError::Stage {
            stage: InitStage::Surface,
            ..
        }
    ));
}

#[test]
fn bind_failure_on_render_thread_releases_everything() {
    let backend = NullBackend::new().with_faults(NullFaults {
        fail_make_current: true,
        ..NullFaults::default()
    });
    let journal = backend.journal();

    let err = RenderDevice::init(backend, window(), &RenderSettings::default())
        .err()
        .expect("init fails");
    assert!(matches!(err, ContextCreationError::MakeCurrent(_)));
    assert_eq!(journal.released(), vec![Handle::Surface, Handle::Context, Handle::Display]);
}

#[test]
fn vertical_sync_failure_is_not_fatal() {
    let backend = NullBackend::new().with_faults(NullFaults {
        fail_vertical_sync: true,
        ..NullFaults::default()
    });
    let (device, _journal) = device_with(backend);
    assert!(device.is_running());
}

// ── queries ───────────────────────────────────────────────────────────────

#[test]
fn supported_resolutions_come_from_the_window() {
    let modes = vec![Size2::new(800, 600), Size2::new(1920, 1080)];
    let window: Arc<dyn NativeWindow> =
        Arc::new(HeadlessWindow::new(Size2::new(320, 240)).with_resolutions(modes.clone()));

    let device = RenderDevice::init(NullBackend::new(), window, &RenderSettings::default()).unwrap();
    assert_eq!(device.supported_resolutions(), modes);
}

#[test]
fn capabilities_reflect_clamped_settings() {
    let settings = RenderSettings {
        sample_count: 16,
        max_anisotropy: 4,
        ..RenderSettings::default()
    };
    let device = RenderDevice::init(NullBackend::new(), window(), &settings).unwrap();

    let caps = device.capabilities();
    assert_eq!(caps.sample_count, 8);
    assert_eq!(caps.max_anisotropy, 4);
    assert_eq!(caps.api_version, ApiVersion::new(3, 0));
}

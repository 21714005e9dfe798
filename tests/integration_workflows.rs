//! Integration tests for complete upload → result → download workflows
//!
//! These tests drive the orchestrator through its command channel with the
//! scripted backend standing in for a real model, and save into a temporary
//! directory.

use bgremove_app::{
    backends::{test_png, ScriptedBackend},
    config::MIB,
    AppConfig, AppState, BackgroundToggle, Blob, Color, Command, DirectorySink, ImageFile, NodeId,
    Orchestrator, ProgressEvent, StatusText,
};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A real JPEG padded with trailing bytes to `size`
fn jpeg_of_size(size: usize) -> Vec<u8> {
    let image = RgbImage::from_fn(64, 48, |x, y| image::Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
    let mut bytes = bytes.into_inner();
    assert!(bytes.len() < size);
    bytes.resize(size, 0);
    bytes
}

fn orchestrator_in(dir: &TempDir, backend: ScriptedBackend) -> Orchestrator {
    Orchestrator::new(
        AppConfig::default(),
        Arc::new(backend),
        Arc::new(DirectorySink::new(dir.path())),
    )
    .unwrap()
}

#[tokio::test]
async fn test_jpeg_to_saved_png() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("holiday.jpg");
    std::fs::write(&input_path, jpeg_of_size(2 * MIB as usize)).unwrap();

    let backend = ScriptedBackend::succeeding(test_png(16, 16)).with_progress([
        ProgressEvent::new("fetch:model.onnx", 1, 2),
        ProgressEvent::new("fetch:model.onnx", 2, 2),
        ProgressEvent::new("compute:inference", 1, 1),
    ]);
    let mut app = orchestrator_in(&dir, backend.clone());
    let mut upload = app.upload_surface(NodeId(1));

    let file = ImageFile::from_path(&input_path).await.unwrap();
    assert_eq!(file.mime_type(), "image/jpeg");
    assert_eq!(file.size(), 2 * MIB);
    upload.drag_enter();
    upload.drop(vec![file.clone()]);
    assert!(!upload.is_drag_active());

    // The original preview shows before inference settles
    let command = app.next_command().await.unwrap();
    assert!(matches!(command, Command::FileAccepted(_)));
    app.dispatch(command);
    let view = app.view();
    assert_eq!(view.state, AppState::Processing);
    assert_eq!(view.status, StatusText::LoadingModel);
    let original = view.original_src.clone().unwrap();
    assert_eq!(app.urls().resolve(&original).unwrap(), *file.blob());

    assert_eq!(app.run_until_settled().await, AppState::ResultReady);
    let view = app.view();
    let result_src = view.result_src.clone().unwrap();
    let result = app.urls().resolve(&result_src).unwrap();
    assert_eq!(result.mime_type(), "image/png");
    assert_eq!(view.status, StatusText::RemovingBackground);
    assert_eq!(view.progress_percent, 100);
    assert_eq!(backend.call_history(), vec![2 * MIB as usize]);

    app.dispatch(Command::Download);
    let saved = app.view().last_saved.unwrap();
    assert_eq!(saved, dir.path().join("holiday_no_bg.png"));
    let bytes = std::fs::read(&saved).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    assert_eq!(app.state(), AppState::ResultReady);
}

#[tokio::test(start_paused = true)]
async fn test_download_handle_released_after_delay() {
    let dir = TempDir::new().unwrap();
    let mut app = orchestrator_in(&dir, ScriptedBackend::succeeding(test_png(4, 4)));

    app.dispatch(Command::FileAccepted(ImageFile::new(
        "cat.png",
        Blob::new(test_png(4, 4).bytes().to_vec(), "image/png"),
    )));
    app.run_until_settled().await;
    assert_eq!(app.urls().live_count(), 2);

    app.dispatch(Command::Download);
    assert_eq!(app.urls().live_count(), 3);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(app.urls().live_count(), 2);
}

#[tokio::test]
async fn test_reset_twice_leaves_clean_state() {
    let dir = TempDir::new().unwrap();
    let mut app = orchestrator_in(&dir, ScriptedBackend::succeeding(test_png(4, 4)));

    app.dispatch(Command::FileAccepted(ImageFile::new(
        "dog.webp",
        Blob::new(vec![0u8; 32], "image/webp"),
    )));
    app.run_until_settled().await;
    app.dispatch(Command::SelectBackground(BackgroundToggle::White));
    assert_eq!(app.view().active_background, BackgroundToggle::White);

    app.dispatch(Command::Reset);
    let single = app.view();
    app.dispatch(Command::Reset);
    let double = app.view();

    assert_eq!(single, double);
    assert_eq!(double.state, AppState::IdleUpload);
    assert_eq!(double.active_background, BackgroundToggle::Checkerboard);
    assert!(double.background.checkerboard);
    assert!(double.original_src.is_none() && double.result_src.is_none());
    assert_eq!(double.progress_percent, 0);
    assert!(app.session().is_empty());
    assert_eq!(app.urls().live_count(), 0);

    // Download after reset has nothing to save
    app.dispatch(Command::Download);
    assert!(app.view().last_saved.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_custom_color_updates_without_reselecting() {
    let dir = TempDir::new().unwrap();
    let mut app = orchestrator_in(&dir, ScriptedBackend::succeeding(test_png(4, 4)));

    app.dispatch(Command::SetCustomColor(Color::rgb(1, 2, 3)));
    assert!(app.view().background.checkerboard);

    app.dispatch(Command::SelectBackground(BackgroundToggle::Custom));
    assert_eq!(app.view().background.fill, Some(Color::rgb(1, 2, 3)));

    let orange = Color::parse("#ff8800").unwrap();
    app.dispatch(Command::SetCustomColor(orange));
    let view = app.view();
    assert_eq!(view.active_background, BackgroundToggle::Custom);
    assert_eq!(view.background.fill, Some(orange));
    assert_eq!(view.custom_color, orange);

    // The picker keeps its value across toggles
    app.dispatch(Command::SelectBackground(BackgroundToggle::Black));
    app.dispatch(Command::SelectBackground(BackgroundToggle::Custom));
    assert_eq!(app.view().background.fill, Some(orange));
}

#[tokio::test(start_paused = true)]
async fn test_second_upload_supersedes_running_job() {
    let dir = TempDir::new().unwrap();
    let backend = ScriptedBackend::succeeding(test_png(4, 4))
        .with_progress([
            ProgressEvent::new("fetch:model.onnx", 1, 2),
            ProgressEvent::new("fetch:model.onnx", 2, 2),
        ])
        .with_step_delay(Duration::from_secs(1));
    let mut app = orchestrator_in(&dir, backend.clone());

    app.dispatch(Command::FileAccepted(ImageFile::new(
        "first.png",
        Blob::new(vec![0u8; 10], "image/png"),
    )));
    // Let the first job report progress into the queue
    tokio::time::sleep(Duration::from_millis(1500)).await;

    app.dispatch(Command::FileAccepted(ImageFile::new(
        "second.png",
        Blob::new(vec![0u8; 20], "image/png"),
    )));
    assert_eq!(app.view().progress_percent, 0);

    assert_eq!(app.run_until_settled().await, AppState::ResultReady);
    let view = app.view();
    assert_eq!(view.file_name.as_deref(), Some("second.png"));
    assert_eq!(backend.call_history(), vec![10, 20]);
    assert_eq!(app.urls().live_count(), 2);

    app.dispatch(Command::Download);
    assert_eq!(
        app.view().last_saved,
        Some(dir.path().join("second_no_bg.png"))
    );
}

#[tokio::test]
async fn test_view_published_to_subscribers() {
    let dir = TempDir::new().unwrap();
    let app = orchestrator_in(&dir, ScriptedBackend::succeeding(test_png(4, 4)));
    let sender = app.sender();
    let mut view = app.subscribe();
    let mut upload = app.upload_surface(NodeId(7));
    let running = tokio::spawn(app.run());

    upload.browse(vec![ImageFile::new(
        "shoe.gif",
        Blob::new(vec![0u8; 8], "image/gif"),
    )]);
    let ready = view
        .wait_for(|v| v.state == AppState::ResultReady)
        .await
        .unwrap()
        .clone();
    assert!(ready.result_src.is_some());

    bgremove_app::command::send(&sender, Command::Shutdown);
    running.await.unwrap();
}

use std::sync::Arc;

use formrenamer::forms::LopdfModel;
use formrenamer::geometry::ScreenPoint;
use formrenamer::pdf::{OutlineEngine, RenderEvent, RenderService};
use formrenamer::session::{DocumentSession, SessionConfig, Upload};
use formrenamer::test_utils::fixtures::{name_field_pdf, two_page_form};
use formrenamer::viewer::FormViewer;

fn ready_session(bytes: Vec<u8>) -> DocumentSession {
    let mut session = DocumentSession::new(
        Arc::new(OutlineEngine),
        Arc::new(LopdfModel),
        SessionConfig::default(),
    );
    session.load_document(Upload::pdf(bytes)).unwrap();
    session
}

#[test]
fn superseded_render_is_dropped() {
    let bytes: Arc<[u8]> = Arc::from(two_page_form());
    let mut service = RenderService::with_config(Arc::new(OutlineEngine), bytes, 1, 4);

    service.request_current(1, 1.0);
    service.request_current(2, 1.0);

    match service.wait_current() {
        Some(RenderEvent::Ready(surface)) => assert_eq!(surface.page, 2),
        other => panic!("expected page 2, got {other:?}"),
    }
    assert_eq!(service.stale_dropped(), 1);
    assert_eq!(service.in_flight(), 0);
}

#[test]
fn finished_pages_are_cached() {
    let bytes: Arc<[u8]> = Arc::from(two_page_form());
    let mut service = RenderService::with_config(Arc::new(OutlineEngine), bytes, 1, 4);

    service.request_current(1, 1.5);
    assert!(matches!(service.wait_current(), Some(RenderEvent::Ready(_))));

    assert!(service.is_page_cached(1, 1.5));
    assert!(!service.is_page_cached(1, 1.0));
    assert!(!service.is_page_cached(2, 1.5));
}

#[test]
fn raster_size_follows_scale() {
    let bytes: Arc<[u8]> = Arc::from(name_field_pdf());
    let mut service = RenderService::with_config(Arc::new(OutlineEngine), bytes, 1, 4);

    service.request_current(1, 2.0);
    let Some(RenderEvent::Ready(surface)) = service.wait_current() else {
        panic!("render failed");
    };
    assert_eq!((surface.width_px, surface.height_px), (1200, 1600));
}

#[test]
fn missing_page_reports_failure() {
    let bytes: Arc<[u8]> = Arc::from(name_field_pdf());
    let mut service = RenderService::with_config(Arc::new(OutlineEngine), bytes, 1, 4);

    service.request_current(5, 1.0);

    assert!(matches!(
        service.wait_current(),
        Some(RenderEvent::Failed { target, .. }) if target.page == 5
    ));
}

#[test]
fn overlays_wait_for_a_matching_raster() {
    let mut session = ready_session(two_page_form());
    let mut viewer = FormViewer::new(1, 4);

    viewer.sync(&session);
    assert!(viewer.overlays(&session).is_empty());

    assert!(viewer.wait_for_render());
    assert_eq!(viewer.overlays(&session).len(), 2);

    // The page 1 raster must not be used for page 2 geometry
    session.next_page();
    assert!(viewer.overlays(&session).is_empty());

    viewer.sync(&session);
    assert!(viewer.wait_for_render());
    let overlays = viewer.overlays(&session);
    assert_eq!(overlays.len(), 1);
    assert_eq!(session.field(overlays[0].field_id).unwrap().name, "signature");
}

#[test]
fn zoom_rescales_overlays() {
    let mut session = ready_session(name_field_pdf());
    let mut viewer = FormViewer::new(1, 4);
    viewer.sync(&session);
    viewer.wait_for_render();

    session.set_scale(2.0);
    assert!(viewer.overlays(&session).is_empty());
    viewer.sync(&session);
    viewer.wait_for_render();

    let rect = viewer.overlays(&session)[0].rect;
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (200.0, 540.0, 400.0, 60.0));
}

#[test]
fn hidden_overlay_yields_nothing() {
    let mut session = ready_session(name_field_pdf());
    let mut viewer = FormViewer::new(1, 4);
    viewer.sync(&session);
    viewer.wait_for_render();

    session.toggle_overlay();

    assert!(viewer.overlays(&session).is_empty());
}

#[test]
fn click_selects_and_clears() {
    let mut session = ready_session(name_field_pdf());
    let mut viewer = FormViewer::new(1, 4);
    viewer.sync(&session);
    viewer.wait_for_render();

    assert_eq!(viewer.click(&mut session, ScreenPoint::new(150.0, 280.0)), Some(0));
    assert_eq!(session.selected_field(), Some(0));

    assert_eq!(viewer.click(&mut session, ScreenPoint::new(5.0, 5.0)), None);
    assert_eq!(session.selected_field(), None);
}

#[test]
fn new_document_restarts_the_pipeline() {
    let mut session = ready_session(name_field_pdf());
    let mut viewer = FormViewer::new(1, 4);
    viewer.sync(&session);
    viewer.wait_for_render();
    assert!(viewer.surface().is_some());

    session
        .load_document(Upload::pdf(two_page_form()))
        .unwrap();
    viewer.sync(&session);

    assert!(viewer.surface().is_none());
    assert!(viewer.wait_for_render());
    assert_eq!(viewer.surface().map(|s| s.width_px), Some(612));
}

#[test]
fn snapshot_writes_png_for_current_page() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut session = ready_session(name_field_pdf());
    let mut viewer = FormViewer::new(1, 4);

    assert!(viewer.snapshot(&session, dir.path()).is_none());

    viewer.sync(&session);
    viewer.wait_for_render();
    session.select_field(Some(0));
    let path = viewer.snapshot(&session, dir.path()).unwrap().unwrap();

    assert_eq!(path.file_name().unwrap(), "page-1-overlay.png");
    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (600, 800));
}

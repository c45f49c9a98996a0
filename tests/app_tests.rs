use std::path::Path;
use std::sync::Arc;

use formrenamer::forms::{FormDocument, LopdfForm, LopdfModel};
use formrenamer::pdf::OutlineEngine;
use formrenamer::session::{DocumentSession, SessionConfig, SessionState, Upload};
use formrenamer::test_utils::fixtures::{name_field_pdf, two_page_form};
use formrenamer::test_utils::test_helpers::{
    TestScenarioBuilder, capture_terminal_state, create_test_terminal,
};
use formrenamer::viewer::FormViewer;
use formrenamer::{App, run_app_with_event_source};

fn app_in(dir: &Path) -> App {
    let session = DocumentSession::new(
        Arc::new(OutlineEngine),
        Arc::new(LopdfModel),
        SessionConfig::default(),
    );
    App::new(session, FormViewer::new(1, 4), dir.to_path_buf())
}

fn loaded_app(dir: &Path, bytes: Vec<u8>) -> App {
    let mut app = app_in(dir);
    app.session
        .start_load(Upload::pdf(bytes).with_file_name("form.pdf"))
        .unwrap();
    app.settle();
    app
}

#[test]
fn empty_state_invites_a_document() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = app_in(dir.path());
    let mut terminal = create_test_terminal(100, 30);

    terminal.draw(|f| app.draw(f)).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("No document loaded"), "{screen}");
    assert!(screen.contains("Fields (0, 0 renamed)"), "{screen}");
    assert!(app.overlay_cells().is_empty());
}

#[test]
fn rejected_file_shows_the_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"plain text").unwrap();
    let mut app = app_in(dir.path());

    app.open_path(&path).unwrap();
    app.settle();

    assert!(matches!(app.session.state(), SessionState::Error(_)));
    let mut terminal = create_test_terminal(100, 30);
    terminal.draw(|f| app.draw(f)).unwrap();
    assert!(capture_terminal_state(&terminal).contains("Could not load document"));
}

#[test]
fn ready_document_lists_fields_and_page_title() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), two_page_form());
    let mut terminal = create_test_terminal(120, 40);

    terminal.draw(|f| app.draw(f)).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("Page 1/2 - 100%"), "{screen}");
    assert!(screen.contains("first_name"));
    assert!(screen.contains("signature"));
    assert_eq!(app.overlay_cells().len(), 2);
}

#[test]
fn clicking_an_overlay_selects_its_field() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), name_field_pdf());
    let mut terminal = create_test_terminal(120, 40);
    terminal.draw(|f| app.draw(f)).unwrap();

    let (id, cells) = app.overlay_cells()[0];
    let click = formrenamer::event_source::SimulatedEventSource::click(
        cells.x + cells.width / 2,
        cells.y + cells.height / 2,
    );
    app.handle_event(&click);

    assert_eq!(app.session.selected_field(), Some(id));
}

#[test]
fn keys_navigate_and_zoom() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), two_page_form());
    let mut terminal = create_test_terminal(120, 40);
    let mut events = TestScenarioBuilder::new()
        .next_page()
        .next_page()
        .zoom_in()
        .zoom_in()
        .toggle_overlay()
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.current_page(), 2);
    assert_eq!(app.session.scale(), 1.5);
    assert!(!app.session.show_overlay());
}

#[test]
fn typed_page_number_jumps_there() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), two_page_form());
    let mut terminal = create_test_terminal(120, 40);
    let mut events = TestScenarioBuilder::new()
        .jump_to_page(2)
        .press_char('9')
        .press_esc()
        .press_char('g')
        .jump_to_page(2)
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.current_page(), 2);
}

#[test]
fn page_jumps_clamp_to_the_document() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), two_page_form());
    let mut terminal = create_test_terminal(120, 40);

    let mut events = TestScenarioBuilder::new().jump_to_page(40).quit().build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();
    assert_eq!(app.session.current_page(), 2);

    let mut events = TestScenarioBuilder::new().press_char('g').quit().build();
    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();
    assert_eq!(app.session.current_page(), 1);
}

#[test]
fn pending_page_number_shows_in_the_status_line() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), two_page_form());
    let mut terminal = create_test_terminal(120, 40);

    app.handle_event(&formrenamer::event_source::SimulatedEventSource::char_key('2'));
    terminal.draw(|f| app.draw(f)).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("Go to page 2"), "{screen}");
    assert_eq!(app.session.current_page(), 1);
}

#[test]
fn edit_rename_and_save_through_the_keyboard() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), name_field_pdf());
    let mut terminal = create_test_terminal(120, 40);

    let mut scenario = TestScenarioBuilder::new().edit();
    for _ in 0.."name_field".len() {
        scenario = scenario.press_backspace();
    }
    let mut events = scenario
        .type_text("full_name")
        .press_enter()
        .save()
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.fields()[0].name, "full_name");
    let saved = dir.path().join("renamed-form.pdf");
    assert!(app.last_written.contains(&saved));

    let bytes = std::fs::read(&saved).unwrap();
    let names: Vec<_> = LopdfForm::load(&bytes)
        .unwrap()
        .fields()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["full_name"]);
}

#[test]
fn escape_abandons_an_edit() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), name_field_pdf());
    let mut terminal = create_test_terminal(120, 40);
    let mut events = TestScenarioBuilder::new()
        .edit()
        .type_text("_extra")
        .press_esc()
        .quit()
        .build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.fields()[0].name, "name_field");
    assert!(!app.viewer.editor.is_editing());
}

#[test]
fn unchanged_save_writes_the_original() {
    let dir = tempfile::TempDir::new().unwrap();
    let bytes = name_field_pdf();
    let mut app = loaded_app(dir.path(), bytes.clone());

    app.save();

    let original = dir.path().join("original-form.pdf");
    assert_eq!(app.last_written, vec![original.clone()]);
    assert_eq!(std::fs::read(original).unwrap(), bytes);
}

#[test]
fn snapshot_key_writes_png() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), name_field_pdf());

    app.snapshot();

    assert!(dir.path().join("page-1-overlay.png").exists());
}

#[test]
fn reset_key_returns_to_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut app = loaded_app(dir.path(), name_field_pdf());
    let mut terminal = create_test_terminal(100, 30);
    let mut events = TestScenarioBuilder::new().reset().quit().build();

    run_app_with_event_source(&mut terminal, &mut app, &mut events).unwrap();

    assert_eq!(app.session.state(), &SessionState::Empty);
    assert!(capture_terminal_state(&terminal).contains("No document loaded"));
}

use gotoword_core::service::panel;
use gotoword_core::{
    open_db_in_memory, ActiveContext, NoteService, NoteServiceError, NoteStore, SqliteNoteStore,
};
use rusqlite::Connection;

fn seed(conn: &Connection) {
    let store = SqliteNoteStore::try_new(conn).unwrap();
    let kivy = store.create_context("kivy", "python UI framework").unwrap();
    let python = store.create_context("python", "programming language").unwrap();

    let canvas = store.create_note("canvas").unwrap();
    store
        .create_definition(&canvas, Some(&kivy), "drawing instructions\nsecond line")
        .unwrap();
    let rgb = store.create_note("rgb").unwrap();
    store
        .create_definition(&rgb, Some(&python), "tuple of three ints")
        .unwrap();
    store
        .create_definition(&rgb, None, "red green blue")
        .unwrap();
}

fn service(conn: &Connection) -> NoteService<SqliteNoteStore<'_>> {
    NoteService::new(SqliteNoteStore::try_new(conn).unwrap())
}

#[test]
fn show_note_prefers_context_less_definition() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let view = service(&conn).show_note("RGB", None).unwrap().unwrap();
    assert_eq!(
        view.lines(),
        vec![
            "keyword: rgb   contexts: python; (no context)".to_string(),
            "red green blue".to_string()
        ]
    );
    assert_eq!(view.active_context(), Some(ActiveContext::NoContext));
}

#[test]
fn show_note_in_requested_context() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    let view = service.show_note("rgb", Some("python")).unwrap().unwrap();
    assert_eq!(view.lines()[1], "tuple of three ints");
    assert_eq!(
        view.active_context(),
        Some(ActiveContext::Named("python".to_string()))
    );

    let err = service.show_note("rgb", Some("kivy")).unwrap_err();
    assert!(matches!(err, NoteServiceError::DefinitionNotFound { .. }));
}

#[test]
fn unknown_word_gets_introduction() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.show_note("mystery", None).unwrap().is_none());
    let lines = service.panel_lines("Mystery", None).unwrap();
    assert_eq!(lines, panel::introduction_lines("mystery"));
    assert!(lines[0].contains("\"mystery\""));
}

#[test]
fn listings_are_sorted_and_formatted() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    let words = panel::render_words(&service.all_words().unwrap());
    assert_eq!(words, vec!["canvas".to_string(), "rgb".to_string()]);

    let contexts = panel::render_contexts(&service.all_contexts().unwrap());
    assert_eq!(
        contexts,
        vec![
            "kivy\tpython UI framework".to_string(),
            "python\tprogramming language".to_string()
        ]
    );

    let (context, notes) = service.context_words("Kivy").unwrap();
    assert_eq!(
        panel::render_context_words(&context, &notes),
        vec![
            "The following keywords have a meaning (definition) in 'kivy' context:".to_string(),
            "canvas".to_string()
        ]
    );

    let (note, definitions) = service.word_contexts("canvas").unwrap();
    assert_eq!(
        panel::render_word_contexts(&note, &definitions),
        vec![
            "The keyword 'canvas' has information belonging to the following contexts:"
                .to_string(),
            "kivy".to_string(),
            "drawing instructions".to_string(),
            String::new()
        ]
    );
}

#[test]
fn deleting_a_context_keeps_notes() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    service.delete_context("kivy").unwrap();

    let store = SqliteNoteStore::try_new(&conn).unwrap();
    let canvas = store.find_note("canvas").unwrap().unwrap();
    assert!(store.list_definitions(&canvas).unwrap().is_empty());
    assert!(store.find_context("kivy").unwrap().is_none());

    let view = service.show_note("canvas", None).unwrap().unwrap();
    assert!(view.shown.is_none());
    assert_eq!(view.lines(), vec!["keyword: canvas   contexts: ".to_string()]);
}

#[test]
fn deleting_a_note_removes_its_definitions() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    service.delete_note("rgb").unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM definitions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 1);
    assert!(matches!(
        service.delete_note("rgb"),
        Err(NoteServiceError::NoteNotFound(name)) if name == "rgb"
    ));
    assert!(matches!(
        service.delete_context("nowhere"),
        Err(NoteServiceError::ContextNotFound(_))
    ));
}

#[test]
fn seeding_an_existing_context_returns_it() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    let first = service.seed_context("Python", "other text").unwrap();
    assert_eq!(first.description, "programming language");
    let fresh = service.seed_context("django", "web framework").unwrap();
    assert_eq!(fresh.name, "django");
}

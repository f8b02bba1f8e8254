#![allow(clippy::float_cmp)]

use super::*;

fn seeded_editor() -> Editor {
    Editor::new(Document::seeded(), EditorConfig::default())
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("stackplan").chain(args.iter().copied())).unwrap()
}

fn edit(args: &[&str]) -> EditCommand {
    match parse(args).command {
        Command::Edit(command) => command,
        Command::Seed { .. } => panic!("expected an edit command"),
    }
}

#[test]
fn place_parses_coordinates_in_pairs() {
    let cli = parse(&["--draft", "d.json", "place", "--layer", "2", "--width", "50", "--height", "40", "--x", "-0", "--y", "10"]);
    assert_eq!(cli.draft, PathBuf::from("d.json"));
    assert!(matches!(cli.command, Command::Edit(EditCommand::Place { layer: 2, x: Some(_), y: Some(_), .. })));
    assert!(Cli::try_parse_from(["stackplan", "place", "--layer", "1", "--width", "5", "--height", "5", "--x", "3"]).is_err());
}

#[test]
fn rotate_takes_piece_and_signed_turns() {
    let id = uuid::Uuid::new_v4().to_string();
    let cli = parse(&["rotate", "--piece", &id, "--quarter-turns", "-1"]);
    assert!(matches!(cli.command, Command::Edit(EditCommand::Rotate { quarter_turns: -1, .. })));
}

#[test]
fn seed_is_separate_from_edit_commands() {
    assert!(matches!(parse(&["seed", "--force"]).command, Command::Seed { force: true }));
    assert!(matches!(parse(&["show"]).command, Command::Edit(EditCommand::Show)));
}

#[test]
fn place_inserts_on_requested_layer() {
    let mut editor = seeded_editor();
    let command = edit(&["place", "--layer", "1", "--width", "50", "--height", "40"]);
    let report = execute(&mut editor, command).unwrap();
    assert!(!report.failed);
    assert_eq!(editor.document().len(), 2);
    assert!(report.output["id"].is_string());
}

#[test]
fn place_rejects_unknown_layer_and_rotation() {
    let mut editor = seeded_editor();
    let command = edit(&["place", "--layer", "4", "--width", "50", "--height", "40"]);
    assert!(matches!(execute(&mut editor, command), Err(CliError::NoLayer { index: 4, count: 3 })));
    let command = edit(&["place", "--layer", "1", "--width", "50", "--height", "40", "--rotation", "45"]);
    assert_eq!(execute(&mut editor, command).unwrap_err().error_code(), "E_ROTATION");
}

#[test]
fn validate_fails_only_on_blocking_problems() {
    let mut editor = seeded_editor();
    let report = execute(&mut editor, EditCommand::Validate).unwrap();
    assert!(!report.failed);
    assert_eq!(report.output, json!([]));
}

#[test]
fn rejected_rotation_marks_report_failed() {
    let mut doc = Document::seeded();
    let id = *doc.piece_ids().next().unwrap();
    if let Some(piece) = doc.piece_mut(&id) {
        piece.x = 0.0;
        piece.width = 300.0;
        piece.height = 20.0;
    }
    let mut editor = Editor::new(doc, EditorConfig::default());
    let report = execute(&mut editor, EditCommand::Rotate { piece: id, quarter_turns: 1 }).unwrap();
    assert!(report.failed);
    assert_eq!(report.output["outcome"], "rejected");
    assert_eq!(report.output["problems"][0]["code"], "P_OUT_OF_BOUNDS");
}

#[test]
fn duplicate_reports_copies() {
    let mut editor = seeded_editor();
    let id = *editor.document().piece_ids().next().unwrap();
    let report = execute(&mut editor, EditCommand::Duplicate { piece: id }).unwrap();
    assert_eq!(report.output["outcome"], "committed");
    assert_eq!(report.output["copies"].as_array().map(Vec::len), Some(1));
}

#[test]
fn seed_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDraftStore::new(dir.path().join("draft.json"));
    seed(&store, false).unwrap();
    assert!(matches!(seed(&store, false), Err(CliError::DraftExists(_))));
    seed(&store, true).unwrap();
    let draft = persist::decode(&store.load().unwrap().unwrap()).unwrap();
    assert_eq!(draft.document.len(), 1);
}

#[test]
fn commands_autosave_to_draft() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft.json");
    let store = FileDraftStore::new(&path);
    let mut editor = Editor::boot(Box::new(store.clone()), EditorConfig::default());
    let id = *editor.document().piece_ids().next().unwrap();
    execute(&mut editor, EditCommand::Nudge { piece: id, dx: 5.0, dy: 0.0 }).unwrap();
    let draft = persist::decode(&store.load().unwrap().unwrap()).unwrap();
    assert_eq!(draft.document.piece(&id).map(|p| p.x), Some(25.0));
}

#[test]
fn import_of_missing_file_is_a_read_error() {
    let mut editor = seeded_editor();
    let err = execute(&mut editor, EditCommand::Import { file: PathBuf::from("/nonexistent/draft.json") }).unwrap_err();
    assert_eq!(err.error_code(), "E_READ");
}

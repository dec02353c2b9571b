use logsentry_core::{LogSource, Tailer};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

fn texts(lines: &[logsentry_core::LogLine]) -> Vec<&str> {
    lines.iter().map(|l| l.text.as_str()).collect()
}

#[test]
fn test_two_polls_see_every_line_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    append(&path, "first\nsecond\n");
    let first = tailer.poll_new(&source);

    append(&path, "\nthird\n   \nfourth\n");
    let second = tailer.poll_new(&source);

    let mut all: Vec<&str> = texts(&first);
    all.extend(texts(&second));
    assert_eq!(all, vec!["first", "second", "third", "fourth"]);
    assert_eq!(tailer.offset(&path), Some(fs::metadata(&path).unwrap().len()));
}

#[test]
fn test_line_numbers_restart_per_call() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    append(&path, "a\n\nb\n");
    let first = tailer.poll_new(&source);
    assert_eq!(first.iter().map(|l| l.line_number).collect::<Vec<_>>(), vec![1, 2]);

    append(&path, "c\n");
    let second = tailer.poll_new(&source);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].line_number, 1);
    assert_eq!(second[0].source_name, "app");
    assert_eq!(second[0].source_type, "application");
}

#[test]
fn test_poll_without_new_data_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    append(&path, "only\n");
    assert_eq!(tailer.poll_new(&source).len(), 1);
    assert!(tailer.poll_new(&source).is_empty());
}

#[test]
fn test_truncation_resets_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    append(&path, "old line one\nold line two\nold line three\n");
    assert_eq!(tailer.poll_new(&source).len(), 3);

    fs::write(&path, "old line one\nnew\n").unwrap();
    let after = tailer.poll_new(&source);
    assert_eq!(texts(&after), vec!["old line one", "new"]);
    assert_eq!(after[0].line_number, 1);
}

#[test]
fn test_missing_file_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.log");
    let source = LogSource::new("ghost", &path, "application");
    let mut tailer = Tailer::new();

    assert!(tailer.poll_new(&source).is_empty());
    assert_eq!(tailer.offset(&path), None);
}

#[test]
fn test_poll_all_skips_disabled_and_missing() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    append(&a, "from a\n");
    append(&b, "from b\n");

    let mut disabled = LogSource::new("b", &b, "system");
    disabled.enabled = false;
    let sources = vec![
        LogSource::new("missing", dir.path().join("nope.log"), "system"),
        LogSource::new("a", &a, "application"),
        disabled,
    ];

    let mut tailer = Tailer::new();
    let lines = tailer.poll_all(&sources);
    assert_eq!(texts(&lines), vec!["from a"]);
    assert_eq!(tailer.offset(&b), None);
}

#[test]
fn test_read_last_n_fewer_lines_than_requested() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "one\n\ntwo\n");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    let lines = tailer.read_last_n(&source, 10);
    assert_eq!(texts(&lines), vec!["one", "two"]);
    assert_eq!(lines.iter().map(|l| l.line_number).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn test_read_last_n_keeps_tail_with_absolute_numbers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let body: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
    append(&path, &body);
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    let lines = tailer.read_last_n(&source, 3);
    assert_eq!(texts(&lines), vec!["line 18", "line 19", "line 20"]);
    assert_eq!(lines.iter().map(|l| l.line_number).collect::<Vec<_>>(), vec![18, 19, 20]);
}

#[test]
fn test_read_last_n_moves_offset_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "before\n");
    let source = LogSource::new("app", &path, "application");
    let mut tailer = Tailer::new();

    tailer.read_last_n(&source, 5);
    append(&path, "after\n");
    let lines = tailer.poll_new(&source);
    assert_eq!(texts(&lines), vec!["after"]);
}

#[test]
fn test_initialize_positions_reports_only_new_activity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "history\nmore history\n");
    let sources = vec![
        LogSource::new("app", &path, "application"),
        LogSource::new("later", dir.path().join("later.log"), "application"),
    ];
    let mut tailer = Tailer::new();

    tailer.initialize_positions(&sources);
    assert!(tailer.poll_all(&sources).is_empty());

    append(&path, "fresh\n");
    append(&dir.path().join("later.log"), "created after init\n");
    let lines = tailer.poll_all(&sources);
    assert_eq!(texts(&lines), vec!["fresh", "created after init"]);
}

use std::fs;

use tempfile::TempDir;
use upscaler_engine::{ensure_dir, AtomicFileWriter, PersistError};

#[test]
fn nested_state_dir_is_created() {
    let root = TempDir::new().unwrap();
    let state = root.path().join(".upscaler").join("cache");
    ensure_dir(&state).unwrap();
    assert!(state.is_dir());
    // Idempotent.
    ensure_dir(&state).unwrap();
}

#[test]
fn file_in_place_of_dir_is_refused() {
    let root = TempDir::new().unwrap();
    let blocker = root.path().join("output");
    fs::write(&blocker, "x").unwrap();

    let err = ensure_dir(&blocker).unwrap_err();
    assert!(matches!(err, PersistError::Dir { .. }));

    let writer = AtomicFileWriter::new(blocker.clone());
    assert!(writer.write_bytes("result.jpg", &[1, 2, 3]).is_err());
    assert!(!root.path().join("result.jpg").exists());
}

#[test]
fn second_write_replaces_first() {
    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().join("state"));

    let path = writer
        .write("ai-upscaler-user.json", r#"{"email":"a@b.c"}"#)
        .unwrap();
    let again = writer.write_bytes("ai-upscaler-user.json", b"{}").unwrap();

    assert_eq!(path, again);
    assert_eq!(fs::read(&again).unwrap(), b"{}");
    // No staging files are left behind.
    let leftovers: Vec<_> = fs::read_dir(writer.dir()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn removing_is_quiet_when_nothing_is_there() {
    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().to_path_buf());
    writer.remove("ai-upscaler-user.json").unwrap();

    let path = writer.write("ai-upscaler-user.json", "{}").unwrap();
    writer.remove("ai-upscaler-user.json").unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn open_reader_keeps_the_old_content() {
    use std::io::Read;

    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().to_path_buf());
    let path = writer.write("ai-upscaler-user.json", "old").unwrap();

    let mut reader = fs::File::open(&path).unwrap();
    writer.write("ai-upscaler-user.json", "new").unwrap();

    let mut seen = String::new();
    reader.read_to_string(&mut seen).unwrap();
    assert_eq!(seen, "old");
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
}

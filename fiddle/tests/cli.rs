use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn fiddle_bin() -> &'static str {
    env!("CARGO_BIN_EXE_fiddle")
}

#[test]
fn whole_file_fiddle_template_runs_loop() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("greet.c.fiddle");
    fs::write(
        &input,
        b"before\n% for i=1,3 do\nline ${i}\n% end\nafter\n",
    )
    .unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let out = fs::read_to_string(dir.path().join("greet.c")).unwrap();
    assert!(out.contains("before"));
    assert!(out.contains("line 1"));
    assert!(out.contains("line 2"));
    assert!(out.contains("line 3"));
    assert!(out.contains("after"));
}

#[test]
fn whole_file_skub_template_splices_expression() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sum.c.skub");
    fs::write(&input, b"int total = $(2 + 3);\n").unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let out = fs::read_to_string(dir.path().join("sum.c")).unwrap();
    assert_eq!(out, "int total = 5;\n");
}

#[test]
fn embedded_fiddle_markers_replace_output_region() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("table.c");
    fs::write(
        &input,
        b"header\n// FIDDLE TEMPLATE\n% for i=1,2 do\nval ${i}\n% end\n// FIDDLE OUTPUT\nstale old text\n// FIDDLE END\nfooter\n",
    )
    .unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let out = fs::read_to_string(&input).unwrap();
    assert!(out.contains("header"));
    assert!(out.contains("val 1"));
    assert!(out.contains("val 2"));
    assert!(!out.contains("stale old text"));
    assert!(out.contains("footer"));
    assert!(out.contains("FIDDLE END"));
}

#[test]
fn embedded_skub_markers_replace_body() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("classes.cpp");
    fs::write(
        &input,
        b"/* [[[skub:\nfor i=1,2 do `{{\nclass C$(i) {};\n}}end\n]]] */\nold stale body\n// [[[end]]]\ntrailer\n",
    )
    .unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let out = fs::read_to_string(&input).unwrap();
    assert!(out.contains("class C1"));
    assert!(out.contains("class C2"));
    assert!(!out.contains("old stale body"));
    assert!(out.contains("trailer"));
}

#[test]
fn output_override_writes_to_given_path() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("x.skub");
    let out_path = dir.path().join("custom_out.txt");
    fs::write(&input, b"n = $(10)\n").unwrap();

    let status = Command::new(fiddle_bin())
        .args(["-o"])
        .arg(&out_path)
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());

    let out = fs::read_to_string(&out_path).unwrap();
    assert_eq!(out, "n = 10\n");
}

#[test]
fn literate_markdown_input_is_a_fatal_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.md");
    fs::write(&input, b"# notes\n").unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn file_with_no_template_markers_is_skipped_without_failing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("plain.txt");
    fs::write(&input, b"nothing to see here\n").unwrap();

    let status = Command::new(fiddle_bin())
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(!dir.path().join("plain").exists());
}

//! The rule file rebuilding itself before user targets are handled.

mod harness;
use harness::TestEnv;

#[test]
fn rule_file_rebuilds_itself_before_user_targets() {
    let env = TestEnv::new();
    // The current rule file only knows how to regenerate itself; the
    // staged version also knows how to build hello.
    env.remakefile("Remakefile : Remakefile.in\n\tcp Remakefile.in Remakefile\n");
    env.pause();
    env.write_file(
        "Remakefile.in",
        "Remakefile : Remakefile.in\n\tcp Remakefile.in Remakefile\nhello :\n\techo hi > hello\n",
    );

    let result = env.remake(&["hello"]);
    assert!(result.success, "{}", result.stderr);
    assert_eq!(env.read_file("hello"), "hi\n");
    assert!(env.read_file("Remakefile").contains("hello"));
}

#[test]
fn failed_rule_file_rebuild_aborts_the_run() {
    let env = TestEnv::new();
    env.remakefile("Remakefile : Remakefile.in\n\tfalse\nhello :\n\techo hi > hello\n");
    env.pause();
    env.write_file("Remakefile.in", "anything\n");

    let result = env.remake(&["hello"]);
    assert!(!result.success);
    assert!(
        result.stderr.contains("Failed to build Remakefile"),
        "stderr: {}",
        result.stderr
    );
    // The user target was never attempted.
    assert!(!env.file_exists("hello"));
}

#[test]
fn no_targets_only_refreshes_the_rule_file() {
    let env = TestEnv::new();
    env.remakefile("a :\n\ttouch a\n");

    let result = env.remake(&[]);
    assert!(result.success, "{}", result.stderr);
    assert!(!env.file_exists("a"));
}

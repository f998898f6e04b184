//! Generic (`%`) rules driven through the real binary.

mod harness;
use harness::TestEnv;

#[test]
fn generic_rule_builds_by_stem() {
    let env = TestEnv::new();
    env.remakefile("%.out : %.in\n\tcp \"${1%.out}.in\" \"$1\"\n");
    env.write_file("foo.in", "data\n");

    let result = env.remake(&["foo.out"]);
    assert!(result.success, "{}", result.stderr);
    assert_eq!(env.read_file("foo.out"), "data\n");

    // The instantiated static dep is recorded for the next run.
    assert!(
        env.read_file(".remake").contains("foo.out: foo.in"),
        "db: {}",
        env.read_file(".remake")
    );
}

#[test]
fn shortest_stem_rule_wins() {
    let env = TestEnv::new();
    env.remakefile(
        "%.o : %.c\n\techo generic > $1\nfoo.%.o : foo.%.c\n\techo specific > $1\n",
    );
    env.write_file("foo.bar.c", "");
    env.write_file("other.c", "");

    // Stem "bar" (second rule) beats stem "foo.bar" (first rule).
    let result = env.remake(&["foo.bar.o"]);
    assert!(result.success, "{}", result.stderr);
    assert_eq!(env.read_file("foo.bar.o"), "specific\n");

    let result = env.remake(&["other.o"]);
    assert!(result.success, "{}", result.stderr);
    assert_eq!(env.read_file("other.o"), "generic\n");
}

#[test]
fn generic_rule_passes_instantiated_targets_to_the_script() {
    let env = TestEnv::new();
    env.remakefile("%.tag :\n\techo \"$1\" > \"$1\"\n");

    let result = env.remake(&["hello.tag"]);
    assert!(result.success, "{}", result.stderr);
    assert_eq!(env.read_file("hello.tag"), "hello.tag\n");
}

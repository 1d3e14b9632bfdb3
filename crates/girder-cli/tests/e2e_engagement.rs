use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn gd_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gd"));
    cmd.current_dir(dir);
    cmd.env("GIRDER_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("GIRDER_ACTOR");
    cmd.env_remove("FORMAT");
    cmd
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = gd_cmd(dir).args(args).arg("--json").output().unwrap();
    assert!(
        output.status.success(),
        "gd {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stderr_of_failure(dir: &Path, args: &[&str]) -> String {
    let output = gd_cmd(dir).args(args).arg("--json").output().unwrap();
    assert!(!output.status.success(), "gd {args:?} unexpectedly succeeded");
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    gd_cmd(dir.path()).arg("init").assert().success();
    dir
}

fn login(dir: &Path, actor: &str) {
    json_of(dir, &["--actor", actor, "session", "login"]);
}

fn create_post(dir: &Path) -> String {
    let out = json_of(
        dir,
        &["--actor", "newsroom", "post", "--title", "Tower crane lift plan"],
    );
    out["id"].as_str().unwrap().to_string()
}

#[test]
fn like_then_rollback_restores_the_post() {
    let dir = setup();
    let post = create_post(dir.path());
    login(dir.path(), "ana");

    let liked = json_of(dir.path(), &["like", &post]);
    assert_eq!(liked["command"], "cmd-1");
    assert_eq!(liked["status"], "pending");
    assert_eq!(liked["actor"], "ana");

    let shown = json_of(dir.path(), &["show", &post]);
    assert_eq!(shown["kind"], "post");
    assert_eq!(shown["likes"]["like_count"], 1);
    assert_eq!(shown["likes"]["is_liked"], true);

    let rolled = json_of(dir.path(), &["ledger", "rollback", "cmd-1"]);
    assert_eq!(rolled["status"], "rolled_back");
    assert_eq!(rolled["rollback"]["restored"][0], post.as_str());

    let shown = json_of(dir.path(), &["show", &post]);
    assert_eq!(shown["likes"]["like_count"], 0);
    assert_eq!(shown["likes"]["is_liked"], false);

    let stderr = stderr_of_failure(dir.path(), &["ledger", "confirm", "cmd-1"]);
    assert!(stderr.contains("E2002"), "stderr: {stderr}");
}

#[test]
fn votes_move_between_directions() {
    let dir = setup();
    let asked = json_of(
        dir.path(),
        &["--actor", "fay", "ask", "--title", "Minimum cover for footings?"],
    );
    let question = asked["id"].as_str().unwrap().to_string();
    login(dir.path(), "ana");

    json_of(dir.path(), &["vote", &question, "up"]);
    json_of(dir.path(), &["vote", &question, "down"]);
    let shown = json_of(dir.path(), &["show", &question]);
    assert_eq!(shown["votes"]["upvotes"], 0);
    assert_eq!(shown["votes"]["downvotes"], 1);
    assert_eq!(shown["votes"]["my_vote"], "down");

    json_of(dir.path(), &["vote", &question, "down"]);
    let shown = json_of(dir.path(), &["show", &question]);
    assert_eq!(shown["votes"]["downvotes"], 0);
    assert!(shown["votes"]["my_vote"].is_null());
}

#[test]
fn accepting_moves_the_single_accepted_answer() {
    let dir = setup();
    let asked = json_of(
        dir.path(),
        &["--actor", "fay", "ask", "--title", "Slab curing time?"],
    );
    let question = asked["id"].as_str().unwrap().to_string();
    let first = json_of(
        dir.path(),
        &["--actor", "pro-1", "answer", &question, "--body", "Seven days wet cure"],
    )["id"]
        .as_str()
        .unwrap()
        .to_string();
    let second = json_of(
        dir.path(),
        &["--actor", "pro-2", "answer", &question, "--body", "Check the mix design"],
    )["id"]
        .as_str()
        .unwrap()
        .to_string();
    login(dir.path(), "fay");

    json_of(dir.path(), &["accept", &question, &first]);
    json_of(dir.path(), &["accept", &question, &second]);

    let shown = json_of(dir.path(), &["show", &question]);
    let answers = shown["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 2);
    let accepted: Vec<&str> = answers
        .iter()
        .filter(|a| a["is_accepted"] == true)
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(accepted, vec![second.as_str()]);

    json_of(dir.path(), &["helpful", &first]);
    let shown = json_of(dir.path(), &["show", &first]);
    assert_eq!(shown["is_helpful"], true);
    assert_eq!(shown["is_accepted"], false);
}

#[test]
fn comments_append_and_reject_blank_bodies() {
    let dir = setup();
    let post = create_post(dir.path());
    login(dir.path(), "ana");

    let commented = json_of(dir.path(), &["comment", &post, "  Which crane model?  "]);
    let comment_id = commented["comment_id"].as_str().unwrap().to_string();

    let shown = json_of(dir.path(), &["show", &post]);
    assert_eq!(shown["comment_count"], 1);
    assert_eq!(shown["comments"][0]["body"], "Which crane model?");

    let comment = json_of(dir.path(), &["show", &comment_id]);
    assert_eq!(comment["parent"], post.as_str());

    json_of(dir.path(), &["like", &comment_id]);
    let comment = json_of(dir.path(), &["show", &comment_id]);
    assert_eq!(comment["comment"]["likes"]["like_count"], 1);

    let stderr = stderr_of_failure(dir.path(), &["comment", &post, "   "]);
    assert!(stderr.contains("E2004"), "stderr: {stderr}");
    let shown = json_of(dir.path(), &["show", &post]);
    assert_eq!(shown["comment_count"], 1);
}

#[test]
fn answers_posted_after_a_vote_survive_its_rollback() {
    let dir = setup();
    let asked = json_of(
        dir.path(),
        &["--actor", "fay", "ask", "--title", "Anchor bolt edge distance?"],
    );
    let question = asked["id"].as_str().unwrap().to_string();
    login(dir.path(), "ana");

    json_of(dir.path(), &["vote", &question, "up"]);
    let answer = json_of(
        dir.path(),
        &["--actor", "pro", "answer", &question, "--body", "Six bolt diameters"],
    )["id"]
        .as_str()
        .unwrap()
        .to_string();
    json_of(dir.path(), &["ledger", "rollback", "cmd-1"]);

    let shown = json_of(dir.path(), &["show", &question]);
    assert_eq!(shown["votes"]["upvotes"], 0);
    assert_eq!(shown["answers"][0]["id"], answer.as_str());

    let accepted = json_of(dir.path(), &["accept", &question, &answer]);
    assert_eq!(accepted["status"], "pending");
}

#[test]
fn comments_can_be_saved() {
    let dir = setup();
    let post = create_post(dir.path());
    login(dir.path(), "ana");
    let commented = json_of(dir.path(), &["comment", &post, "Saving for the pour"]);
    let comment_id = commented["comment_id"].as_str().unwrap().to_string();

    json_of(dir.path(), &["save", &comment_id]);
    let comment = json_of(dir.path(), &["show", &comment_id]);
    assert_eq!(comment["comment"]["is_saved"], true);
}

#[test]
fn unsupported_and_unknown_targets_are_refused() {
    let dir = setup();
    let asked = json_of(dir.path(), &["--actor", "fay", "ask", "--title", "Rebar lap?"]);
    let question = asked["id"].as_str().unwrap().to_string();
    login(dir.path(), "ana");

    let stderr = stderr_of_failure(dir.path(), &["like", &question]);
    assert!(stderr.contains("E2003"), "stderr: {stderr}");

    let stderr = stderr_of_failure(dir.path(), &["save", "p-000000000000"]);
    assert!(stderr.contains("E2001"), "stderr: {stderr}");

    let ledger = json_of(dir.path(), &["ledger", "list"]);
    assert!(ledger.as_array().unwrap().is_empty());
}

#[test]
fn list_filters_by_kind() {
    let dir = setup();
    create_post(dir.path());
    json_of(dir.path(), &["--actor", "fay", "ask", "--title", "Rebar lap?"]);

    let all = json_of(dir.path(), &["list"]);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let posts = json_of(dir.path(), &["list", "--kind", "post"]);
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["kind"], "post");
}

#[test]
fn ledger_lists_pending_and_compacts() {
    let dir = setup();
    let post = create_post(dir.path());
    login(dir.path(), "ana");

    json_of(dir.path(), &["save", &post]);
    json_of(dir.path(), &["like", &post]);
    json_of(dir.path(), &["ledger", "confirm", "cmd-1"]);

    let pending = json_of(dir.path(), &["ledger", "list", "--pending"]);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], "cmd-2");
    assert_eq!(pending[0]["action"], "like");

    json_of(dir.path(), &["ledger", "confirm", "cmd-2"]);
    let compacted = json_of(dir.path(), &["ledger", "compact"]);
    assert_eq!(compacted["removed"], 2);
    assert_eq!(compacted["remaining"], 0);
}

#[test]
fn commands_outside_a_workspace_report_not_initialized() {
    let dir = TempDir::new().unwrap();
    let stderr = stderr_of_failure(dir.path(), &["list"]);
    assert!(stderr.contains("E1001"), "stderr: {stderr}");
}

#[test]
fn text_output_is_line_oriented() {
    let dir = setup();
    let post = create_post(dir.path());
    let output = gd_cmd(dir.path()).args(["list"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with(&post));
    assert!(stdout.contains("Tower crane lift plan"));
}

//! Autocommit runs against real git repositories.

use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::NaiveDate;
use gesetze_gazette::{append_new, GazetteEntry, GazetteKind, PageRange};
use gesetze_lawgit::{autocommit, AutocommitOptions, GitRepo, LawgitConfig, Outcome};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const LAW: &str = "t/testg/index.md";
const BRANCH: &str = "bgbl/2020/1-14";

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git").args(args).current_dir(dir).output().unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn document(title: &str, abbreviation: &str, slug: &str, body: &str) -> String {
    format!("---\nTitle: {title}\njurabk: {abbreviation}\nlayout: default\norigslug: {slug}\nslug: {slug}\n\n---\n\n# {title}\n\n{body}\n")
}

fn write_document(repo: &Path, title: &str, abbreviation: &str, body: &str) {
    let slug = abbreviation.to_lowercase();
    let path = repo.join(&slug[..1]).join(&slug).join("index.md");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, document(title, abbreviation, &slug, body)).unwrap();
}

fn write_law(repo: &Path, body: &str) {
    write_document(repo, "Testgesetz", "TestG", body);
}

/// A repository on `master` with the test law committed.
fn laws_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();
    git(path, &["init"]);
    git(path, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(path, &["config", "user.email", "test@test.com"]);
    git(path, &["config", "user.name", "Test"]);
    git(path, &["config", "commit.gpgsign", "false"]);
    write_law(path, "§ 1 Alte Fassung");
    git(path, &["add", "-A"]);
    git(path, &["commit", "-m", "init"]);
    dir
}

fn data_dir(entries: Vec<GazetteEntry>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    append_new(&dir.path().join("bgbl.json"), entries).unwrap();
    dir
}

fn bgbl_entry(number: u32, page: u32, title: &str) -> GazetteEntry {
    let date = NaiveDate::from_ymd_opt(2020, 5, 20).unwrap();
    let issue = format!("2020-1-{number:04}");
    let mut entry = GazetteEntry::new(GazetteKind::Bgbl, &issue, date, title, 2020);
    entry.part = Some(1);
    entry.number = Some(number);
    entry.page_range = Some(PageRange::starting_at(page));
    entry
}

fn testgesetz_entry() -> GazetteEntry {
    bgbl_entry(14, 569, "Testgesetz")
}

fn options(data: &Path) -> AutocommitOptions {
    let mut options = AutocommitOptions::new(LawgitConfig {
        data_dir: data.to_path_buf(),
        ..LawgitConfig::default()
    });
    options.today = NaiveDate::from_ymd_opt(2020, 6, 1);
    options
}

#[test]
fn test_clean_tree_has_no_changes() {
    let repo_dir = laws_repo();
    let data = data_dir(vec![testgesetz_entry()]);
    let repo = GitRepo::open(repo_dir.path()).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(outcome, Outcome::clean());
}

#[test]
fn test_change_is_committed_on_issue_branch_and_merged() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(vec![testgesetz_entry()]);
    write_law(path, "§ 1 Neue Fassung");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(
        outcome,
        Outcome::CommittedAndMerged {
            branches: vec![BRANCH.to_string()],
            empty: Vec::new(),
        }
    );
    let message = git(path, &["log", "-1", "--format=%B", BRANCH]);
    assert!(message.starts_with("Testgesetz\n\n20.05.2020: BGBl I: 2020, 569 (Nr. 14)"));
    assert!(message.contains("Gazette-Issue: 2020-1-0014"));
    assert!(message.contains("Laws: testg"));

    assert_eq!(git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).trim(), "master");
    assert_eq!(git(path, &["status", "--porcelain"]), "");
    assert!(git(path, &["show", "master:t/testg/index.md"]).contains("Neue Fassung"));
}

#[test]
fn test_unmatched_change_goes_to_working_branch() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(Vec::new());
    write_law(path, "§ 1 Neue Fassung");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(
        outcome,
        Outcome::CommittedAndMerged {
            branches: vec!["lawgit/updates".to_string()],
            empty: Vec::new(),
        }
    );
    let message = git(path, &["log", "-1", "--format=%B", "lawgit/updates"]);
    assert!(message.starts_with("Update Testgesetz (TestG)\n\nNo gazette entry matched."));
}

#[test]
fn test_conflicting_branch_leaves_master_untouched() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(vec![testgesetz_entry()]);

    git(path, &["checkout", "-b", BRANCH]);
    write_law(path, "§ 1 Fassung des Zweigs");
    git(path, &["commit", "-am", "branch"]);
    git(path, &["checkout", "master"]);
    write_law(path, "§ 1 Fassung von master");
    git(path, &["commit", "-am", "master"]);
    let master_head = git(path, &["rev-parse", "master"]);

    write_law(path, "§ 1 Neue Fassung");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(
        outcome,
        Outcome::CommittedUnmerged {
            merged: Vec::new(),
            unmerged: vec![BRANCH.to_string()],
            empty: Vec::new(),
        }
    );
    let log = git(path, &["log", "--format=%s", BRANCH]);
    assert_eq!(log, "Testgesetz\nbranch\ninit\n");
    assert!(git(path, &["show", &format!("{BRANCH}:{LAW}")]).contains("Neue Fassung"));

    assert_eq!(git(path, &["rev-parse", "master"]), master_head);
    assert_eq!(git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).trim(), "master");
    assert_eq!(git(path, &["stash", "list"]), "");
    assert!(fs::read_to_string(path.join(LAW)).unwrap().contains("Neue Fassung"));
}

#[test]
fn test_diverged_branch_is_updated_and_merged() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(vec![testgesetz_entry()]);

    git(path, &["checkout", "-b", BRANCH]);
    write_law(path, "§ 1 Fassung des Zweigs");
    git(path, &["commit", "-am", "branch"]);
    git(path, &["checkout", "master"]);
    fs::write(path.join("README.md"), "Gesetze\n").unwrap();
    git(path, &["add", "README.md"]);
    git(path, &["commit", "-m", "readme"]);

    write_law(path, "§ 1 Neue Fassung");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(
        outcome,
        Outcome::CommittedAndMerged {
            branches: vec![BRANCH.to_string()],
            empty: Vec::new(),
        }
    );
    assert_eq!(git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).trim(), "master");
    assert_eq!(git(path, &["status", "--porcelain"]), "");
    assert_eq!(git(path, &["stash", "list"]), "");
    assert!(git(path, &["show", &format!("master:{LAW}")]).contains("Neue Fassung"));
    assert_eq!(git(path, &["show", "master:README.md"]), "Gesetze\n");
}

#[test]
fn test_branch_already_holding_changes_reports_empty_commit() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(vec![testgesetz_entry()]);

    git(path, &["checkout", "-b", BRANCH]);
    write_law(path, "§ 1 Neue Fassung");
    git(path, &["commit", "-am", "branch"]);
    git(path, &["checkout", "master"]);
    let branch_head = git(path, &["rev-parse", BRANCH]);

    write_law(path, "§ 1 Neue Fassung");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert_eq!(
        outcome,
        Outcome::NoChanges {
            empty: vec![BRANCH.to_string()]
        }
    );
    let reported: Vec<String> = outcome.empty_commits().iter().map(ToString::to_string).collect();
    assert_eq!(reported, vec![format!("nothing to commit on {BRANCH}")]);
    assert_eq!(git(path, &["rev-parse", BRANCH]), branch_head);
    assert_eq!(git(path, &["status", "--porcelain"]).trim(), "M t/testg/index.md");
}

#[test]
fn test_several_branches_are_merged_in_one_run() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    write_document(path, "Alphagesetz", "AlphaG", "§ 1 Alt");
    write_document(path, "Betagesetz", "BetaG", "§ 1 Alt");
    write_document(path, "Gammagesetz", "GammaG", "§ 1 Alt");
    git(path, &["add", "-A"]);
    git(path, &["commit", "-m", "laws"]);
    let data = data_dir(vec![
        bgbl_entry(14, 569, "Alphagesetz"),
        bgbl_entry(15, 601, "Betagesetz"),
    ]);

    write_document(path, "Alphagesetz", "AlphaG", "§ 1 Neu");
    write_document(path, "Betagesetz", "BetaG", "§ 1 Neu");
    write_document(path, "Gammagesetz", "GammaG", "§ 1 Neu");
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    let Outcome::CommittedAndMerged { mut branches, empty } = outcome else {
        panic!("expected all branches merged");
    };
    branches.sort();
    assert_eq!(branches, vec!["bgbl/2020/1-14", "bgbl/2020/1-15", "lawgit/updates"]);
    assert!(empty.is_empty());

    assert_eq!(git(path, &["log", "-1", "--format=%s", "bgbl/2020/1-14"]).trim(), "Alphagesetz");
    assert_eq!(git(path, &["log", "-1", "--format=%s", "bgbl/2020/1-15"]).trim(), "Betagesetz");
    assert_eq!(
        git(path, &["log", "-1", "--format=%s", "lawgit/updates"]).trim(),
        "Update Gammagesetz (GammaG)"
    );
    let merges = git(path, &["rev-list", "--merges", "master"]);
    assert_eq!(merges.lines().count(), 3);
    for law in ["a/alphag/index.md", "b/betag/index.md", "g/gammag/index.md"] {
        assert!(git(path, &["show", &format!("master:{law}")]).contains("§ 1 Neu"));
    }
    assert_eq!(git(path, &["status", "--porcelain"]), "");
    assert_eq!(git(path, &["stash", "list"]), "");
}

#[test]
fn test_dry_run_touches_nothing() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(vec![testgesetz_entry()]);
    write_law(path, "§ 1 Neue Fassung");
    let head = git(path, &["rev-parse", "HEAD"]);
    let repo = GitRepo::open(path).unwrap();

    let mut options = options(data.path());
    options.dry_run = true;
    let outcome = autocommit(&repo, &options).unwrap();

    let Outcome::DryRun { plans, operations } = outcome else {
        panic!("expected dry run");
    };
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].branch, BRANCH);
    assert!(operations.contains(&format!("git branch {BRANCH} master")));
    assert!(operations.contains(&format!("git merge --no-edit --no-ff {BRANCH}")));
    assert_eq!(git(path, &["rev-parse", "HEAD"]), head);
    assert_eq!(git(path, &["status", "--porcelain"]).trim(), "M t/testg/index.md");
    assert_eq!(git(path, &["branch", "--list", BRANCH]), "");
}

#[test]
fn test_deleted_law_is_committed() {
    let repo_dir = laws_repo();
    let path = repo_dir.path();
    let data = data_dir(Vec::new());
    fs::remove_dir_all(path.join("t/testg")).unwrap();
    let repo = GitRepo::open(path).unwrap();

    let outcome = autocommit(&repo, &options(data.path())).unwrap();

    assert!(matches!(outcome, Outcome::CommittedAndMerged { .. }));
    assert_eq!(git(path, &["status", "--porcelain"]), "");
    assert!(!path.join(LAW).exists());
    // The identity still comes from the committed document.
    let message = git(path, &["log", "-1", "--format=%s", "lawgit/updates"]);
    assert_eq!(message.trim(), "Update Testgesetz (TestG)");
}

use kiln::error::Error;
use kiln::locate::{find_project_template, find_template};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_descriptor_at_repository_root() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("kiln.json"), "{}").unwrap();

    let root = find_template(repo.path()).unwrap();
    assert_eq!(root, repo.path());
}

#[test]
fn test_descriptor_found_by_recursive_walk() {
    let repo = TempDir::new().unwrap();
    let nested = repo.path().join("templates").join("cli");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("kiln.json"), "{}").unwrap();

    let root = find_template(repo.path()).unwrap();
    assert_eq!(root, nested);
}

#[test]
fn test_falls_back_to_first_non_vcs_child() {
    let repo = TempDir::new().unwrap();
    fs::create_dir_all(repo.path().join(".git")).unwrap();
    fs::create_dir_all(repo.path().join("skeleton")).unwrap();

    let root = find_template(repo.path()).unwrap();
    assert_eq!(root, repo.path().join("skeleton"));
}

#[test]
fn test_directory_without_candidates_is_an_error() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("README.md"), "not a template").unwrap();

    let err = find_template(repo.path()).unwrap_err();
    assert!(matches!(err, Error::NonTemplatedInputDir { .. }));
}

#[test]
fn test_project_template_prefers_templated_child() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("kiln.json"), "{}").unwrap();
    let project = repo.path().join("{{ kiln.project_name }}");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(repo.path().join("hooks")).unwrap();

    assert_eq!(find_project_template(repo.path()), project);
}

#[test]
fn test_project_template_defaults_to_root() {
    let repo = TempDir::new().unwrap();
    fs::create_dir_all(repo.path().join("plain")).unwrap();

    assert_eq!(find_project_template(repo.path()), repo.path());
}

use kiln::context::{Context, Value};
use kiln::error::Error;
use kiln::generate::{generate_files, GenerateOptions};
use kiln::hooks::{find_hook, run_pre_prompt_hook};
use kiln::renderer::MiniJinjaRenderer;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn demo_context() -> Context {
    let mut context = Context::new();
    context.insert(
        "project_name".to_string(),
        Value::String("Demo".to_string()),
    );
    context
}

/// A repository with a descriptor, a templated project directory and a
/// `hooks/` directory next to them.
fn write_repo(repo_dir: &Path) {
    fs::write(repo_dir.join("kiln.json"), r#"{"project_name": "Demo"}"#).unwrap();
    let project = repo_dir.join("{{ kiln.project_name }}");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("README.md"), "# {{ kiln.project_name }}\n").unwrap();
}

fn write_hook(repo_dir: &Path, file_name: &str, body: &str) {
    let hooks_dir = repo_dir.join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();
    fs::write(hooks_dir.join(file_name), body).unwrap();
}

#[test]
fn test_find_hook() {
    let repo = TempDir::new().unwrap();
    write_hook(repo.path(), "post_gen_project.sh", "#!/bin/sh\n");

    let found = find_hook(repo.path(), "post_gen_project").unwrap();
    assert_eq!(found.file_name().unwrap(), "post_gen_project.sh");
    assert!(find_hook(repo.path(), "pre_gen_project").is_none());
}

#[test]
fn test_find_hook_ignores_backup_files() {
    let repo = TempDir::new().unwrap();
    write_hook(repo.path(), "post_gen_project.sh~", "#!/bin/sh\n");

    assert!(find_hook(repo.path(), "post_gen_project").is_none());
}

#[cfg(unix)]
#[test]
#[serial]
fn test_post_gen_hook_runs_in_project_dir() {
    let repo = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(
        repo.path(),
        "post_gen_project.sh",
        "#!/bin/sh\necho done > marker.txt\n",
    );

    let options = GenerateOptions {
        accept_hooks: true,
        ..Default::default()
    };
    let project_dir = generate_files(
        repo.path(),
        &demo_context(),
        out.path(),
        &options,
        &MiniJinjaRenderer::new(),
    )
    .unwrap();

    let marker = fs::read_to_string(project_dir.join("marker.txt")).unwrap();
    assert_eq!(marker.trim(), "done");
}

#[cfg(unix)]
#[test]
#[serial]
fn test_failing_post_gen_hook_removes_project() {
    let repo = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(repo.path(), "post_gen_project.sh", "#!/bin/sh\nexit 1\n");

    let options = GenerateOptions {
        accept_hooks: true,
        ..Default::default()
    };
    let err = generate_files(
        repo.path(),
        &demo_context(),
        out.path(),
        &options,
        &MiniJinjaRenderer::new(),
    )
    .unwrap_err();

    match err {
        Error::FailedHook { hook, .. } => assert_eq!(hook, "post_gen_project"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!out.path().join("Demo").exists());
}

#[cfg(unix)]
#[test]
#[serial]
fn test_templated_hook_is_rendered_before_running() {
    let repo = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(
        repo.path(),
        "post_gen_project.sh.j2",
        "#!/bin/sh\necho {{ kiln.project_name }} > marker.txt\n",
    );

    let options = GenerateOptions {
        accept_hooks: true,
        ..Default::default()
    };
    let project_dir = generate_files(
        repo.path(),
        &demo_context(),
        out.path(),
        &options,
        &MiniJinjaRenderer::new(),
    )
    .unwrap();

    let marker = fs::read_to_string(project_dir.join("marker.txt")).unwrap();
    assert_eq!(marker.trim(), "Demo");
}

#[cfg(unix)]
#[test]
#[serial]
fn test_templated_hook_with_undefined_variable_fails() {
    let repo = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(
        repo.path(),
        "post_gen_project.sh.j2",
        "#!/bin/sh\necho {{ kiln.nope }} > marker.txt\n",
    );

    let options = GenerateOptions {
        accept_hooks: true,
        ..Default::default()
    };
    let err = generate_files(
        repo.path(),
        &demo_context(),
        out.path(),
        &options,
        &MiniJinjaRenderer::new(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::FailedHook { .. }));
    // The script never ran and the project was rolled back.
    assert!(!out.path().join("Demo").exists());
}

#[cfg(unix)]
#[test]
fn test_pre_prompt_hook_runs_against_a_copy() {
    let repo = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(
        repo.path(),
        "pre_prompt.sh",
        "#!/bin/sh\ntouch created_by_hook\n",
    );

    let work_dir = run_pre_prompt_hook(repo.path(), &MiniJinjaRenderer::new()).unwrap();

    assert_ne!(work_dir, repo.path());
    assert!(work_dir.join("created_by_hook").exists());
    assert!(work_dir.join("kiln.json").exists());
    assert!(!repo.path().join("created_by_hook").exists());

    fs::remove_dir_all(&work_dir).unwrap();
}

#[test]
fn test_pre_prompt_without_hook_keeps_repo_dir() {
    let repo = TempDir::new().unwrap();
    write_repo(repo.path());

    let work_dir = run_pre_prompt_hook(repo.path(), &MiniJinjaRenderer::new()).unwrap();
    assert_eq!(work_dir, repo.path());
}

#[cfg(unix)]
#[test]
fn test_failing_pre_prompt_hook_cleans_up_its_copy() {
    let repo = TempDir::new().unwrap();
    write_repo(repo.path());
    write_hook(repo.path(), "pre_prompt.sh", "#!/bin/sh\nexit 3\n");

    let err = run_pre_prompt_hook(repo.path(), &MiniJinjaRenderer::new()).unwrap_err();
    match err {
        Error::FailedHook { hook, .. } => assert_eq!(hook, "pre_prompt"),
        other => panic!("unexpected error: {other:?}"),
    }
}

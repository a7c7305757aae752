use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use stencil_plan::hash_directory;
use tempfile::TempDir;

fn write_tree(root: &Path) {
    fs::create_dir_all(root.join("modules/net")).expect("mkdir");
    fs::write(root.join("main.tf"), "terraform {}\n").expect("write main");
    fs::write(root.join("modules/net/vpc.tf"), "resource \"vpc\" {}\n").expect("write vpc");
}

#[test]
fn hash_ignores_modification_times() {
    let workspace = TempDir::new().expect("workspace");
    let root = workspace.path().join("tpl");
    write_tree(&root);

    let before = hash_directory(&root).expect("hash");

    let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(24 * 60 * 60));
    set_file_mtime(root.join("main.tf"), old).expect("set mtime");
    set_file_mtime(root.join("modules/net/vpc.tf"), old).expect("set mtime");

    let after = hash_directory(&root).expect("hash");
    assert_eq!(before, after);
}

#[test]
fn hash_is_stable_across_copies_in_different_locations() {
    let a = TempDir::new().expect("a");
    let b = TempDir::new().expect("b");
    write_tree(&a.path().join("one"));
    write_tree(&b.path().join("elsewhere/two"));

    assert_eq!(
        hash_directory(&a.path().join("one")).expect("hash a"),
        hash_directory(&b.path().join("elsewhere/two")).expect("hash b"),
    );
}

#[test]
fn editing_one_byte_changes_the_hash() {
    let workspace = TempDir::new().expect("workspace");
    let root = workspace.path().join("tpl");
    write_tree(&root);
    let before = hash_directory(&root).expect("hash");

    fs::write(root.join("main.tf"), "terraform {} \n").expect("edit");
    assert_ne!(before, hash_directory(&root).expect("hash"));
}

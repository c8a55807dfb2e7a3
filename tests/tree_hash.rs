// tests/tree_hash.rs

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use watchbuild::config::WatchList;
use watchbuild::watch::{TreeHash, TreeHasher, WatchProfile};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn hash_of(list: &WatchList) -> TreeHash {
    let profile = WatchProfile::compile(list).expect("valid watch list");
    TreeHasher::default().hash(&profile)
}

fn write(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

#[test]
fn same_tree_gives_same_hash() -> TestResult {
    let dir = tempdir()?;
    write(&dir.path().join("src/main.rs"), "fn main() {}")?;
    write(&dir.path().join("src/lib/mod.rs"), "pub mod x;")?;

    let list = WatchList::new([dir.path().join("src")]);
    assert_eq!(hash_of(&list), hash_of(&list));
    assert_eq!(hash_of(&list).as_str().len(), 64);
    Ok(())
}

#[test]
fn content_change_and_rename_change_the_hash() -> TestResult {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    write(&src.join("main.rs"), "fn main() {}")?;
    let list = WatchList::new([&src]);

    let before = hash_of(&list);
    write(&src.join("main.rs"), "fn main() { run(); }")?;
    let edited = hash_of(&list);
    assert_ne!(before, edited);

    fs::rename(src.join("main.rs"), src.join("app.rs"))?;
    assert_ne!(edited, hash_of(&list));
    Ok(())
}

#[test]
fn excluded_and_hidden_entries_are_ignored() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path().join("web");
    write(&root.join("index.ts"), "export {}")?;
    let list = WatchList::new([&root]);
    let before = hash_of(&list);

    write(&root.join("node_modules/pkg/index.js"), "module.exports = 1")?;
    write(&root.join("build/out.js"), "compiled")?;
    write(&root.join(".cache/state"), "x")?;
    write(&root.join(".env"), "SECRET=1")?;

    assert_eq!(before, hash_of(&list));
    Ok(())
}

#[test]
fn filtered_out_files_do_not_count() -> TestResult {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    write(&src.join("main.rs"), "fn main() {}")?;
    let list = WatchList::new([&src]).with_filter(["*.rs"]);
    let before = hash_of(&list);

    write(&src.join("notes.txt"), "scratch")?;
    assert_eq!(before, hash_of(&list));

    write(&src.join("extra.rs"), "pub fn extra() {}")?;
    assert_ne!(before, hash_of(&list));
    Ok(())
}

#[test]
fn missing_root_still_hashes() -> TestResult {
    let dir = tempdir()?;
    let missing = WatchList::new([dir.path().join("gone")]);
    let other = WatchList::new([dir.path().join("elsewhere")]);

    assert_eq!(hash_of(&missing), hash_of(&missing));
    assert_ne!(hash_of(&missing), hash_of(&other));
    Ok(())
}

#[cfg(unix)]
#[test]
fn dangling_symlink_is_hashed_by_name() -> TestResult {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    write(&src.join("main.rs"), "fn main() {}")?;
    let list = WatchList::new([&src]);
    let before = hash_of(&list);

    std::os::unix::fs::symlink(dir.path().join("nowhere"), src.join("link"))?;
    let with_link = hash_of(&list);
    assert_ne!(before, with_link);
    assert_eq!(with_link, hash_of(&list));
    Ok(())
}

//! Protocol verification tests.
//!
//! These tests check pointer classification against the pointer files the
//! official git-lfs client writes.

use git2_blobs::{classify, MemoryStore, ObjectStore, Pointer, LFS_POINTER_MAX_SIZE};

/// Pointer as produced by `git lfs pointer --file` for "Hello, World!".
const GIT_LFS_POINTER: &[u8] = b"version https://git-lfs.github.com/spec/v1\n\
oid sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f\n\
size 13\n";

fn classify_content(content: &[u8]) -> bool {
    let mut store = MemoryStore::new();
    let id = store.add_blob(content);
    let size = store.info(&id).unwrap().unwrap().size;
    classify(&id, size, content).is_some()
}

#[test]
fn test_pointer_matches_git_lfs_cli() {
    let pointer = Pointer::from_content(b"Hello, World!");
    assert_eq!(pointer.encode_bytes(), GIT_LFS_POINTER);
}

#[test]
fn test_git_lfs_pointer_is_classified() {
    let mut store = MemoryStore::new();
    let id = store.add_blob(GIT_LFS_POINTER);

    let matched = classify(&id, GIT_LFS_POINTER.len() as u64, GIT_LFS_POINTER).unwrap();
    assert_eq!(matched.data, GIT_LFS_POINTER);
    assert_eq!(matched.oid, id);

    let target = matched.pointer().unwrap();
    assert_eq!(target.size(), 13);
    assert_eq!(
        target.oid().to_hex(),
        "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
    );
}

#[test]
fn test_pointer_with_extensions_parses_but_is_too_large() {
    let pointer = b"version https://git-lfs.github.com/spec/v1\n\
ext-0-foo sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\n\
oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\n\
size 12345\n";
    assert!(pointer.len() as u64 >= LFS_POINTER_MAX_SIZE);

    // Valid git-lfs text, but above the size pointers are classified at
    assert_eq!(Pointer::parse(pointer).unwrap().size(), 12345);
    assert!(!classify_content(pointer));
}

#[test]
fn test_near_misses_are_not_classified() {
    let cases: Vec<&[u8]> = vec![
        // Signature line only
        b"version https://git-lfs.github.com/spec/v1\n",
        // Missing size
        b"version https://git-lfs.github.com/spec/v1\n\
oid sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f\n",
        // Truncated hash
        b"version https://git-lfs.github.com/spec/v1\noid sha256:dffd6021\nsize 13\n",
        // Pre-release hawser signature is not the canonical one
        b"version https://hawser.github.com/spec/v1\n\
oid sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f\n\
size 13\n",
        // Leading whitespace
        b" version https://git-lfs.github.com/spec/v1\n\
oid sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f\n\
size 13\n",
        // Ordinary text
        b"Hello, World!\n",
        b"",
    ];

    for case in cases {
        assert!(!classify_content(case), "classified {:?}", String::from_utf8_lossy(case));
    }
}

#[test]
fn test_size_ceiling() {
    // Pad a valid pointer with an unknown key until it reaches the ceiling.
    let base = GIT_LFS_POINTER.to_vec();
    let padding = LFS_POINTER_MAX_SIZE as usize - base.len() - "x-pad \n".len();

    let mut just_below = base.clone();
    just_below.extend_from_slice(format!("x-pad {}\n", "a".repeat(padding - 1)).as_bytes());
    assert_eq!(just_below.len() as u64, LFS_POINTER_MAX_SIZE - 1);
    assert!(classify_content(&just_below));

    let mut at_ceiling = base;
    at_ceiling.extend_from_slice(format!("x-pad {}\n", "a".repeat(padding)).as_bytes());
    assert_eq!(at_ceiling.len() as u64, LFS_POINTER_MAX_SIZE);
    assert!(!classify_content(&at_ceiling));
}

#[test]
fn test_roundtrip_various_sizes() {
    for size in [0usize, 1, 100, 1024, 1024 * 1024] {
        let content = vec![0u8; size];
        let pointer = Pointer::from_content(&content);
        let encoded = pointer.encode_bytes();

        assert_eq!(Pointer::parse(&encoded).unwrap(), pointer);
        assert!(classify_content(&encoded));
    }
}

/// SHA256 values verified with `printf '...' | openssl sha256`.
#[test]
fn test_sha256_matches_openssl() {
    let test_cases = vec![
        ("", "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"),
        ("test", "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"),
    ];

    for (input, expected_hash) in test_cases {
        let pointer = Pointer::from_content(input.as_bytes());
        assert_eq!(pointer.oid().to_hex(), expected_hash, "input: {:?}", input);
    }
}

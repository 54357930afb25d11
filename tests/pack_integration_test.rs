/*!
 * Integration tests for pack creation from published versions
 */

use mixer::{apply_delta, config::MixConfig, pack::Pack, Mix, PackItem};
use mixer_core_interface::LocalStorage;
use std::fs;
use tempfile::{tempdir, TempDir};

fn setup(format: u32) -> (TempDir, Mix<LocalStorage>) {
    let dir = tempdir().unwrap();
    let config = MixConfig {
        state_dir: dir.path().to_path_buf(),
        format,
        bundles: vec!["test-bundle".to_string()],
        ..Default::default()
    };
    let mix = Mix::new(config, LocalStorage::new(dir.path()))
        .unwrap()
        .with_timestamp(1_000);
    (dir, mix)
}

fn add_file(dir: &TempDir, version: u32, bundle: &str, name: &str, content: &[u8]) {
    for tree in [bundle, "full"] {
        let path = dir.path().join(format!("image/{}/{}/{}", version, tree, name));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn add_os_core(dir: &TempDir, version: u32) {
    add_file(
        dir,
        version,
        "os-core",
        "usr/lib/os-release",
        format!("VERSION_ID={}\n", version).as_bytes(),
    );
}

/// Deterministic incompressible-looking bytes
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

fn tool_v10() -> Vec<u8> {
    noise(16 * 1024, 7)
}

fn tool_v20() -> Vec<u8> {
    let mut tool = tool_v10();
    tool[9_000..9_016].copy_from_slice(b"patched section!");
    tool
}

/// Versions 10 and 20 of test-bundle:
/// a large binary patched in place, a small config rewritten,
/// one file removed and one untouched.
fn publish_two_versions(dir: &TempDir, mix: &Mix<LocalStorage>) {
    add_os_core(dir, 10);
    add_file(dir, 10, "test-bundle", "usr/bin/tool", &tool_v10());
    add_file(dir, 10, "test-bundle", "etc/tool.conf", b"level = 1\n");
    add_file(dir, 10, "test-bundle", "usr/share/removed", b"going away");
    add_file(dir, 10, "test-bundle", "usr/share/kept", b"kept");
    mix.create_manifests(10).unwrap();

    add_os_core(dir, 20);
    add_file(dir, 20, "test-bundle", "usr/bin/tool", &tool_v20());
    add_file(dir, 20, "test-bundle", "etc/tool.conf", b"level = 2\n");
    add_file(dir, 20, "test-bundle", "usr/share/kept", b"kept");
    mix.create_manifests(20).unwrap();
}

fn paths(pack: &Pack) -> Vec<&str> {
    pack.items.iter().map(|i| i.path()).collect()
}

#[test]
fn test_zero_pack_has_full_content() {
    let (dir, mix) = setup(26);
    publish_two_versions(&dir, &mix);

    let pack = mix.create_pack("test-bundle", 0, 20).unwrap();
    assert_eq!(pack.from, 0);
    assert_eq!(pack.to, 20);
    assert_eq!(pack.deltas().count(), 0);
    assert!(!pack
        .items
        .iter()
        .any(|i| matches!(i, PackItem::Tombstone { .. })));

    let tool = pack
        .items
        .iter()
        .find(|i| i.path() == "/usr/bin/tool")
        .unwrap();
    match tool {
        PackItem::Full { content, version, .. } => {
            assert_eq!(content, &tool_v20());
            assert_eq!(*version, 20);
        }
        other => panic!("unexpected item {:?}", other),
    }
    assert!(paths(&pack).contains(&"/usr/share/kept"));
    assert!(dir.path().join("www/20/pack-test-bundle-from-0.pack").exists());
    assert!(!dir.path().join("www/20/Manifest.test-bundle.D.0").exists());
}

#[test]
fn test_pack_between_versions() {
    let (dir, mix) = setup(26);
    publish_two_versions(&dir, &mix);

    let pack = mix.create_pack("test-bundle", 10, 20).unwrap();
    assert_eq!(
        paths(&pack),
        vec!["/etc/tool.conf", "/usr/bin/tool", "/usr/share/removed"]
    );

    // Small files ship whole.
    assert!(matches!(pack.items[0], PackItem::Full { .. }));
    assert!(matches!(
        pack.items[2],
        PackItem::Tombstone { version: 20, .. }
    ));

    let delta = pack.deltas().next().unwrap();
    assert_eq!(delta.from_version, 10);
    assert_eq!(delta.to_version, 20);
    assert!(delta.literal_len() < tool_v20().len() as u64 / 2);
    assert_eq!(apply_delta(&tool_v10(), delta).unwrap(), tool_v20());

    assert!(dir.path().join("www/20/Manifest.test-bundle.D.10").exists());
    let mom = fs::read_to_string(dir.path().join("www/20/Manifest.MoM")).unwrap();
    assert!(mom.contains("\ttest-bundle.D.10\n"));
    let bytes = fs::read(dir.path().join("www/20/pack-test-bundle-from-10.pack")).unwrap();
    assert_eq!(Pack::decode(&bytes).unwrap(), pack);
}

#[test]
fn test_pack_for_unchanged_bundle_is_empty() {
    let (dir, mix) = setup(26);
    publish_two_versions(&dir, &mix);

    // test-bundle is unchanged in 30, only os-core moves.
    add_os_core(&dir, 30);
    add_file(&dir, 30, "test-bundle", "usr/bin/tool", &tool_v20());
    add_file(&dir, 30, "test-bundle", "etc/tool.conf", b"level = 2\n");
    add_file(&dir, 30, "test-bundle", "usr/share/kept", b"kept");
    let summary = mix.create_manifests(30).unwrap();
    assert_eq!(summary.unchanged, vec!["test-bundle"]);
    assert_eq!(summary.changed, vec!["os-core"]);

    let pack = mix.create_pack("test-bundle", 20, 30).unwrap();
    assert!(pack.items.is_empty());
    assert_eq!(pack.file_name(), "pack-test-bundle-from-20.pack");
    assert!(dir.path().join("www/30/pack-test-bundle-from-20.pack").exists());
}

#[test]
fn test_create_packs_covers_every_bundle() {
    let (dir, mix) = setup(26);
    publish_two_versions(&dir, &mix);

    let mut packs = mix.create_packs(10, 20).unwrap();
    packs.sort_by(|a, b| a.bundle.cmp(&b.bundle));
    let bundles: Vec<&str> = packs.iter().map(|p| p.bundle.as_str()).collect();
    assert_eq!(bundles, vec!["os-core", "test-bundle"]);
    assert!(dir.path().join("www/20/pack-os-core-from-10.pack").exists());
}

#[test]
fn test_pack_errors() {
    let (dir, mix) = setup(26);
    publish_two_versions(&dir, &mix);

    assert!(mix
        .create_pack("test-bundle", 20, 10)
        .unwrap_err()
        .is_validation());
    assert!(mix
        .create_pack("no-such-bundle", 10, 20)
        .unwrap_err()
        .is_validation());
    // Version 30 was never published.
    assert!(mix.create_pack("test-bundle", 20, 30).is_err());
}

#[cfg(unix)]
#[test]
fn test_link_content_is_target() {
    let (dir, mix) = setup(26);
    add_os_core(&dir, 10);
    add_file(&dir, 10, "test-bundle", "usr/bin/tool", b"tool");
    for tree in ["test-bundle", "full"] {
        let link = dir.path().join(format!("image/10/{}/usr/bin/alias", tree));
        std::os::unix::fs::symlink("tool", link).unwrap();
    }
    mix.create_manifests(10).unwrap();

    let manifest = fs::read_to_string(dir.path().join("www/10/Manifest.test-bundle")).unwrap();
    assert!(manifest.contains("L...\t"));

    let pack = mix.create_pack("test-bundle", 0, 10).unwrap();
    let alias = pack
        .items
        .iter()
        .find(|i| i.path() == "/usr/bin/alias")
        .unwrap();
    match alias {
        PackItem::Full { content, .. } => assert_eq!(content, b"tool"),
        other => panic!("unexpected item {:?}", other),
    }
}

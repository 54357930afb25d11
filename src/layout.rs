/*!
 * State directory layout
 *
 * Every path is relative to the state directory handed to the storage.
 */

use std::path::PathBuf;

use mixer_core_manifest::{delta_name, iterative_name, manifest_file_name, MOM_NAME};

pub const IMAGE_DIR: &str = "image";
pub const WWW_DIR: &str = "www";

/// Entry names are absolute inside a bundle; storage paths are relative
fn relative(name: &str) -> &str {
    name.trim_start_matches('/')
}

/// `image/<version>/<bundle>`
pub fn bundle_dir(version: u32, bundle: &str) -> PathBuf {
    PathBuf::from(IMAGE_DIR).join(version.to_string()).join(bundle)
}

/// `image/<version>/<bundle>-info.json`
pub fn bundle_info_path(version: u32, bundle: &str) -> PathBuf {
    PathBuf::from(IMAGE_DIR)
        .join(version.to_string())
        .join(format!("{}-info.json", bundle))
}

/// `image/<version>/full/<name>`
pub fn full_content_path(version: u32, name: &str) -> PathBuf {
    PathBuf::from(IMAGE_DIR)
        .join(version.to_string())
        .join("full")
        .join(relative(name))
}

/// `image/LAST_VER`
pub fn last_version_path() -> PathBuf {
    PathBuf::from(IMAGE_DIR).join("LAST_VER")
}

/// `www/<version>`
pub fn www_dir(version: u32) -> PathBuf {
    PathBuf::from(WWW_DIR).join(version.to_string())
}

/// `www/<version>/Manifest.<bundle>`
pub fn manifest_path(version: u32, bundle: &str) -> PathBuf {
    www_dir(version).join(manifest_file_name(bundle))
}

/// `www/<version>/Manifest.MoM`
pub fn mom_path(version: u32) -> PathBuf {
    manifest_path(version, MOM_NAME)
}

/// `www/<version>/Manifest.<bundle>.I.<from>`
pub fn iterative_path(version: u32, bundle: &str, from: u32) -> PathBuf {
    manifest_path(version, &iterative_name(bundle, from))
}

/// `www/<version>/Manifest.<bundle>.D.<from>`
pub fn delta_manifest_path(version: u32, bundle: &str, from: u32) -> PathBuf {
    manifest_path(version, &delta_name(bundle, from))
}

/// `www/<to>/pack-<bundle>-from-<from>.pack`
pub fn pack_path(to: u32, bundle: &str, from: u32) -> PathBuf {
    www_dir(to).join(pack_file_name(bundle, from))
}

pub fn pack_file_name(bundle: &str, from: u32) -> String {
    format!("pack-{}-from-{}.pack", bundle, from)
}

/// `www/version/format<format>/latest`
pub fn latest_path(format: u32) -> PathBuf {
    PathBuf::from(WWW_DIR)
        .join("version")
        .join(format!("format{}", format))
        .join("latest")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_paths() {
        assert_eq!(bundle_dir(10, "os-core"), Path::new("image/10/os-core"));
        assert_eq!(
            bundle_info_path(10, "editors"),
            Path::new("image/10/editors-info.json")
        );
        assert_eq!(
            full_content_path(20, "/usr/bin/foo"),
            Path::new("image/20/full/usr/bin/foo")
        );
        assert_eq!(mom_path(30), Path::new("www/30/Manifest.MoM"));
        assert_eq!(
            iterative_path(30, "test-bundle", 20),
            Path::new("www/30/Manifest.test-bundle.I.20")
        );
        assert_eq!(
            delta_manifest_path(30, "test-bundle", 20),
            Path::new("www/30/Manifest.test-bundle.D.20")
        );
        assert_eq!(
            pack_path(30, "test-bundle", 0),
            Path::new("www/30/pack-test-bundle-from-0.pack")
        );
        assert_eq!(latest_path(26), Path::new("www/version/format26/latest"));
    }
}

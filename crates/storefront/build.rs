//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet and the page script so templates can link
//! content-addressed copies that browsers may cache for as long as they like.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// A static asset to fingerprint.
struct Asset {
    /// Path under `static/`, without extension.
    stem: &'static str,
    extension: &'static str,
    /// Compile-time variable receiving the short hash.
    env_var: &'static str,
}

const ASSETS: [Asset; 2] = [
    Asset {
        stem: "css/main",
        extension: "css",
        env_var: "CSS_HASH",
    },
    Asset {
        stem: "js/app",
        extension: "js",
        env_var: "JS_HASH",
    },
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    for asset in &ASSETS {
        fingerprint(&static_dir, asset);
    }
}

/// Copy `static/<stem>.<ext>` to `static/<dir>/derived/<name>.<hash>.<ext>`
/// and export the hash as `asset.env_var`.
fn fingerprint(static_dir: &Path, asset: &Asset) {
    let source = static_dir.join(format!("{}.{}", asset.stem, asset.extension));
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={}=", asset.env_var);
            return;
        }
    };

    // First 8 hex chars of SHA256
    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = hash.get(..8).unwrap_or(&hash);
    println!("cargo:rustc-env={}={short_hash}", asset.env_var);

    let (dir, name) = asset.stem.rsplit_once('/').unwrap_or(("", asset.stem));
    let derived_dir = static_dir.join(dir).join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");

    let derived_path = derived_dir.join(format!("{name}.{short_hash}.{}", asset.extension));
    fs::copy(&source, &derived_path).expect("Failed to copy asset to derived directory");
}

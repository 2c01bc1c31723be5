//! Shared helpers for unit tests.
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use crate::engine::Engine;

/// Path to the shell stand-in for zmap, made executable.
pub fn fake_engine_path() -> PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/fake-zmap");
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    if permissions.mode() & 0o777 != 0o755 {
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).unwrap();
    }
    path
}

pub async fn fake_engine() -> Engine {
    Engine::at(fake_engine_path()).await.unwrap()
}

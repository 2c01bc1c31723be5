use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use zmapctl::context::ScanContext;
use zmapctl::options::ScanOption;
use zmapctl::scanner::Scanner;

pub fn fake_zmap() -> PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/fake-zmap");
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    if permissions.mode() & 0o777 != 0o755 {
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).unwrap();
    }
    path
}

pub async fn scanner(ctx: ScanContext, options: Vec<ScanOption>) -> Scanner {
    Scanner::builder()
        .binary_path(fake_zmap())
        .unwrap()
        .context(ctx)
        .unwrap()
        .options(options)
        .build()
        .await
        .unwrap()
}

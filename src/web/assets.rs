//! 共享静态文件
//!
//! 阅读器脚本、Service Worker与fetch垫片与具体书籍无关，每次运行都复制到输出根目录。

use std::fs;
use std::path::Path;

use crate::epub::error::{EpubError, Result};

/// 需要复制的共享文件，相对于源目录与输出目录
pub const SHARED_ASSETS: [&str; 3] = ["viewer.js", "sw.js", "polyfill/fetch.js"];

/// 复制失败的共享文件
#[derive(Debug)]
pub struct AssetFailure {
    pub asset: &'static str,
    pub error: EpubError,
}

/// 复制所有共享文件，单个文件失败不影响其他文件
pub fn copy_shared_assets(source_dir: &Path, output_dir: &Path) -> Vec<AssetFailure> {
    SHARED_ASSETS
        .into_iter()
        .filter_map(|asset| {
            copy_asset(source_dir, output_dir, asset)
                .map_err(|error| {
                    tracing::error!(asset, %error, "复制共享文件失败");
                    AssetFailure { asset, error }
                })
                .err()
        })
        .collect()
}

fn copy_asset(source_dir: &Path, output_dir: &Path, asset: &str) -> Result<()> {
    let target = output_dir.join(asset);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source_dir.join(asset), &target)?;
    tracing::debug!(asset, "已复制共享文件");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_shared_assets() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("polyfill")).unwrap();
        for asset in SHARED_ASSETS {
            fs::write(source.path().join(asset), asset).unwrap();
        }

        let failures = copy_shared_assets(source.path(), output.path());
        assert!(failures.is_empty());
        assert_eq!(
            fs::read_to_string(output.path().join("polyfill/fetch.js")).unwrap(),
            "polyfill/fetch.js"
        );
    }

    #[test]
    fn test_missing_assets_are_reported() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(source.path().join("viewer.js"), "viewer").unwrap();

        let failures = copy_shared_assets(source.path(), output.path());
        let names: Vec<&str> = failures.iter().map(|f| f.asset).collect();
        assert_eq!(names, ["sw.js", "polyfill/fetch.js"]);
        assert!(output.path().join("viewer.js").exists());
    }
}

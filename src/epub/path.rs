//! 路径解析模块
//!
//! 清单项的 `href` 相对于OPF文件所在目录，输出目录又镜像了压缩包的内部结构，
//! 所以解析后的路径既是压缩包内的成员路径，也是网页中相对于书籍目录的路径。

/// 获取OPF文件所在的目录
///
/// 取最后一个 `/` 之前的部分，OPF位于压缩包根目录时返回空字符串。
pub fn base_dir(opf_path: &str) -> &str {
    opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// 将清单项的 `href` 解析为对外可见的相对路径
///
/// 目录为空时直接使用 `href`（不加前导 `/`），并折叠路径中的 `.` 与 `..`。
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let joined = if base_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), href)
    };
    normalize(&joined)
}

fn normalize(path: &str) -> String {
    if !path.contains("./") && !path.ends_with("/.") && !path.ends_with("/..") {
        return path.to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            // 越过根目录的 `..` 直接丢弃
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

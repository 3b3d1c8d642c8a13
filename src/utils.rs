/// Path processing utility functions / 路径处理工具函数
use std::path::PathBuf;

/// Normalize a request path / 规范化请求路径
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Resolve relative paths against the working directory / 相对路径基于工作目录解析
/// 3. Clean . and .. components / 清理路径中的 . 和 ..
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let absolute = if PathBuf::from(&path).is_absolute() {
        path
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        format!("{}/{}", cwd.to_string_lossy().replace('\\', "/"), path)
    };
    clean_path(&absolute)
}

/// Clean path, handle ., .. and duplicate / / 清理路径，处理 . 和 .. 和重复的 /
fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Get file extension (lowercase) / 获取文件扩展名
pub fn get_ext(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_absolute() {
        assert_eq!(normalize_path("/a/b/c"), "/a/b/c");
        assert_eq!(normalize_path("/a//b///c"), "/a/b/c");
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("\\a\\b"), "/a/b");
    }

    #[test]
    fn test_normalize_relative() {
        let normalized = normalize_path("docs/report.txt");
        assert!(normalized.starts_with('/'));
        assert!(normalized.ends_with("/docs/report.txt"));
    }

    #[test]
    fn test_get_ext() {
        assert_eq!(get_ext("/a/Report.DOCX"), "docx");
        assert_eq!(get_ext("/a/noext"), "");
        assert_eq!(get_ext("/a/tar.ball.GZ"), "gz");
    }
}

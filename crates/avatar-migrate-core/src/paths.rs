//! Key and path rules shared by every stage.
//!
//! A record's path doubles as its object key in the legacy bucket. The migrated key is
//! always `new_prefix + basename(path)`, so any directory structure below the legacy
//! prefix is flattened.

/// Final segment of `path` after the last `/`. A path without `/` is its own basename.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path (and object key) a record moves to under `new_prefix`.
///
/// Applying this to an already rewritten path yields the same value again.
pub fn rewrite_path(path: &str, new_prefix: &str) -> String {
    format!("{}{}", new_prefix, basename(path))
}

/// Escape `\`, `%` and `_` so `prefix` matches literally inside a `LIKE ... ESCAPE '\'`
/// pattern.
pub fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `LIKE` pattern selecting every path that starts with `prefix`.
pub fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(basename("image/a.png"), "a.png");
        assert_eq!(basename("image/2019/07/b.jpg"), "b.jpg");
        assert_eq!(basename("c.png"), "c.png");
        assert_eq!(basename("image/"), "");
    }

    #[test]
    fn rewrite_replaces_prefix_with_new_one() {
        assert_eq!(rewrite_path("image/a.png", "avatar/"), "avatar/a.png");
        assert_eq!(rewrite_path("image/nested/a.png", "avatar/"), "avatar/a.png");
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite_path("image/a.png", "avatar/");
        let twice = rewrite_path(&once, "avatar/");
        assert_eq!(once, twice);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("image/"), "image/");
        assert_eq!(escape_like("img_1/"), "img\\_1/");
        assert_eq!(escape_like("50%/"), "50\\%/");
        assert_eq!(escape_like("a\\b/"), "a\\\\b/");
        assert_eq!(prefix_pattern("image/"), "image/%");
    }
}

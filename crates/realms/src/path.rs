//! Realm 路径
//!
//! Realm 以斜杠分隔的层级路径标识（如 `/parent/child`），统一规范化为以 `/` 开头。

use serde::{Serialize, Serializer};
use std::fmt;

/// Collection segment used by the resource protocol (`.../realms/<name>`)
pub const REALMS_COLLECTION: &str = "realms";

/// 规范化后的 Realm 路径
///
/// 不变量：
/// - 总是以 `/` 开头
/// - 除根路径 `/` 外不以 `/` 结尾
/// - 不包含空段（`//` 会被折叠）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RealmPath(String);

impl RealmPath {
    /// 根 Realm
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// 解析并规范化路径，空字符串（或仅空白）返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self::from_segments(
            trimmed.split('/').filter(|s| !s.is_empty()),
        ))
    }

    /// 将 realm 名称挂到父路径之下
    ///
    /// `realm` 先规范化为绝对路径，再整体拼接到 `parent` 后面。
    pub fn resolve(parent: &RealmPath, realm: &str) -> Self {
        let segments = parent
            .segments()
            .chain(realm.split('/').map(str::trim).filter(|s| !s.is_empty()));
        Self::from_segments(segments)
    }

    fn from_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Self {
        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// 父路径；`/a` 的父路径为 `/`，根的父路径仍是根
    pub fn parent(&self) -> RealmPath {
        match self.0.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => Self(self.0[..idx].to_string()),
        }
    }

    /// 最后一段名称；根路径返回空字符串
    pub fn child_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// 追加一个子段
    pub fn join(&self, child: &str) -> RealmPath {
        Self::resolve(self, child)
    }

    /// 判断 `self` 是否是 `other` 的（严格）祖先
    pub fn is_ancestor_of(&self, other: &RealmPath) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for RealmPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RealmPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl AsRef<str> for RealmPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 从资源名中取出集合路径之前的父路径
///
/// 资源名形如 `/top/realms`（集合）或 `/top/realms/child`（实例）。
/// 去掉末尾的 `/realms` 集合段；否则截取最后一个 `/realms/` 之前的部分。
/// 资源名中没有集合段时父路径为根。
pub fn collection_parent(resource_name: &str) -> RealmPath {
    let name = resource_name.trim().trim_end_matches('/');

    let prefix = if name == REALMS_COLLECTION {
        ""
    } else if let Some(prefix) = name.strip_suffix("/realms") {
        prefix
    } else if let Some(idx) = name.rfind("/realms/") {
        &name[..idx]
    } else {
        ""
    };

    RealmPath::parse(prefix).unwrap_or_else(RealmPath::root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_leading_slash() {
        assert_eq!(RealmPath::parse("child").unwrap().as_str(), "/child");
        assert_eq!(RealmPath::parse("/child").unwrap().as_str(), "/child");
        assert_eq!(RealmPath::parse("a//b/").unwrap().as_str(), "/a/b");
        assert_eq!(RealmPath::parse("/").unwrap(), RealmPath::root());
        assert!(RealmPath::parse("").is_none());
        assert!(RealmPath::parse("   ").is_none());
    }

    #[test]
    fn test_parent_and_child() {
        let path = RealmPath::parse("/a/b/c").unwrap();
        assert_eq!(path.parent().as_str(), "/a/b");
        assert_eq!(path.child_name(), "c");

        let top = RealmPath::parse("/a").unwrap();
        assert_eq!(top.parent(), RealmPath::root());
        assert_eq!(top.child_name(), "a");

        assert_eq!(RealmPath::root().parent(), RealmPath::root());
        assert_eq!(RealmPath::root().child_name(), "");
    }

    #[test]
    fn test_resolve_against_parent() {
        let parent = RealmPath::parse("/top").unwrap();
        assert_eq!(RealmPath::resolve(&parent, "child").as_str(), "/top/child");
        assert_eq!(RealmPath::resolve(&parent, "/child").as_str(), "/top/child");
        assert_eq!(
            RealmPath::resolve(&RealmPath::root(), "child").as_str(),
            "/child"
        );
    }

    #[test]
    fn test_collection_parent() {
        assert_eq!(collection_parent(""), RealmPath::root());
        assert_eq!(collection_parent("realms"), RealmPath::root());
        assert_eq!(collection_parent("/realms"), RealmPath::root());
        assert_eq!(collection_parent("/top/realms").as_str(), "/top");
        assert_eq!(collection_parent("/top/realms/").as_str(), "/top");
        assert_eq!(collection_parent("top/realms/child").as_str(), "/top");
        // a realm may itself be called "realms"
        assert_eq!(
            collection_parent("/realms/realms").as_str(),
            "/realms"
        );
        assert_eq!(collection_parent("/no/collection"), RealmPath::root());
    }

    #[test]
    fn test_is_ancestor_of() {
        let a = RealmPath::parse("/a").unwrap();
        let ab = RealmPath::parse("/a/b").unwrap();
        let abc = RealmPath::parse("/ab/c").unwrap();
        assert!(RealmPath::root().is_ancestor_of(&a));
        assert!(a.is_ancestor_of(&ab));
        assert!(!a.is_ancestor_of(&abc));
        assert!(!a.is_ancestor_of(&a));
    }
}

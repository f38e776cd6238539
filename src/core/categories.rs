//! Static category table for the forum.
//!
//! The block-list filter and category feed queries resolve slugs here.
//! Topics whose category id is not in this table are treated as
//! uncategorized: they pass the block-list and cannot be queried directly.

/// One forum category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: &'static str,
    pub slug: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { id: 4, name: "开发调优", slug: "develop" },
    Category { id: 98, name: "国产替代", slug: "domestic" },
    Category { id: 14, name: "资源荟萃", slug: "resource" },
    Category { id: 42, name: "文档共建", slug: "wiki" },
    Category { id: 27, name: "非我莫属", slug: "job" },
    Category { id: 32, name: "读书成诗", slug: "reading" },
    Category { id: 34, name: "前沿快讯", slug: "news" },
    Category { id: 92, name: "网络记忆", slug: "feeds" },
    Category { id: 36, name: "福利羊毛", slug: "welfare" },
    Category { id: 11, name: "搞七捻三", slug: "gossip" },
    Category { id: 2, name: "运营反馈", slug: "feedback" },
];

/// Look up a category by id.
pub fn by_id(id: i64) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// Slug for a category id, if known.
pub fn slug_for(id: i64) -> Option<&'static str> {
    by_id(id).map(|c| c.slug)
}

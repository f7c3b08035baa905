use serde::{Deserialize, Serialize};

/// 课题：一个有名字的教学单元及其在教材中的页码范围（闭区间）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonTopic {
    /// 稳定标识，仅用于编辑；TOML 中可省略，加载时补齐
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start_page: i64,
    pub end_page: i64,
}

impl LessonTopic {
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_page: i64, end_page: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_page,
            end_page,
        }
    }

    /// 页码范围是否有效：两端为正且 end >= start
    pub fn has_valid_range(&self) -> bool {
        self.start_page >= 1 && self.end_page >= self.start_page
    }

    /// 范围内且不超过 `last_page` 的页码；无效范围返回空
    pub fn pages_within(&self, last_page: i64) -> std::ops::RangeInclusive<i64> {
        if self.has_valid_range() {
            self.start_page..=self.end_page.min(last_page)
        } else {
            // 空区间
            1..=0
        }
    }
}

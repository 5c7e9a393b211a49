//! 考生记录存储
//!
//! 查询流水线只依赖 [`SubjectStore`]，每个调用要么整体成功要么整体失败

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewSubject, Subject};

/// 考生记录存储
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// 创建记录，指纹重复时返回 [`StoreError::Duplicate`]
    async fn create(&self, new: NewSubject) -> Result<Subject, StoreError>;

    /// 所有待查询（结果为空）的考生，按 id 排序的快照
    async fn find_pending(&self) -> Result<Vec<Subject>, StoreError>;

    /// 有结果但邮件未送达的考生
    async fn find_undelivered(&self) -> Result<Vec<Subject>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>, StoreError>;

    /// 按 id 整体覆盖
    async fn update(&self, subject: &Subject) -> Result<(), StoreError>;

    /// 删除所有记录，返回删除的数量
    async fn clear(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests;

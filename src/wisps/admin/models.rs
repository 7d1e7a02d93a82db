use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Admin {
    pub id: String,
    pub date: DateTime<Utc>,
}

impl Admin {
    /// Admins may only remove those who joined after them.
    pub fn can_remove(&self, other: &Admin) -> bool {
        self.id != other.id && self.date < other.date
    }
}

/// What a permission rule restricts a command to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Channel,
    Role,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KosEntry {
    pub cmdr: String,
    pub faction: String,
    pub danger: i64,
    pub friendly: bool,
}

impl KosEntry {
    pub fn table_row(&self) -> Vec<String> {
        vec![
            self.cmdr.clone(),
            self.faction.clone(),
            self.danger.to_string(),
            if self.friendly { "Yes" } else { "No" }.to_owned(),
        ]
    }
}

use serde::{Deserialize, Serialize};

/// Tables exposed by the hosted data platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    KnowledgeBases,
    KnowledgeItems,
    Agents,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::KnowledgeBases, Table::KnowledgeItems, Table::Agents];

    pub fn name(self) -> &'static str {
        match self {
            Table::KnowledgeBases => "knowledge_bases",
            Table::KnowledgeItems => "knowledge_items",
            Table::Agents => "agents",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filters plus an optional ordering, the subset of row queries the
/// app issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = Some(Order {
            column: "created_at".to_owned(),
            ascending: false,
        });
        self
    }

    pub fn filter_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

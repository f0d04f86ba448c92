use serde::Deserialize;

/// Body of the add and edit forms. `amount` stays text until the service parses it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub category_filter: Option<String>,
}

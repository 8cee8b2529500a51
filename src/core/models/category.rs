use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub thread_count: u64,
    pub parent_id: Option<String>,
    pub sort: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub pid: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub thread_count: u64,
    pub parent_id: Option<String>,
    pub can_create_thread: bool,
    pub can_edit_thread: bool,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

//! 资源与查询结果

use serde::Serialize;
use serde_json::{Value, json};

/// 固定修订号
pub const DEFAULT_REVISION: &str = "0";

/// 资源
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev")]
    revision: String,
    content: Value,
}

impl Resource {
    pub fn new(id: impl Into<String>, content: Value) -> Self {
        Self {
            id: id.into(),
            revision: DEFAULT_REVISION.to_string(),
            content,
        }
    }

    /// 单字段消息内容，如 `{"realmCreated": "/child"}`
    pub fn message(id: impl Into<String>, key: &str, value: impl Into<Value>) -> Self {
        let mut content = serde_json::Map::new();
        content.insert(key.to_string(), value.into());
        Self::new(id, Value::Object(content))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn into_content(self) -> Value {
        self.content
    }
}

/// 查询完成标记
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paged_results_cookie: Option<String>,
}

/// 查询结果接收器
///
/// 返回 false 表示停止接收。
pub trait QueryResultHandler: Send {
    fn handle_resource(&mut self, resource: Resource) -> bool;
}

impl QueryResultHandler for Vec<Resource> {
    fn handle_resource(&mut self, resource: Resource) -> bool {
        self.push(resource);
        true
    }
}

/// 查询响应体 `{"result": [...], "resultCount": n}`
pub fn query_response_body(resources: &[Resource]) -> Value {
    let result: Vec<&Value> = resources.iter().map(Resource::content).collect();
    json!({
        "result": result,
        "resultCount": resources.len(),
    })
}

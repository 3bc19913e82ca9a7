use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tools an assistant can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "code_interpreter")]
    CodeInterpreter,
    #[serde(rename = "retrieval")]
    Retrieval,
    #[serde(rename = "ddg_search")]
    DdgSearch,
    #[serde(rename = "search_tavily")]
    Tavily,
    #[serde(rename = "search_tavily_answer")]
    TavilyAnswer,
    #[serde(rename = "wikipedia")]
    Wikipedia,
    #[serde(rename = "arxiv")]
    Arxiv,
    #[serde(rename = "pubmed")]
    PubMed,
    #[serde(rename = "you_search")]
    YouSearch,
    #[serde(rename = "sec_filings_kai_ai")]
    SecFilings,
    #[serde(rename = "press_releases_kai_ai")]
    PressReleases,
    #[serde(rename = "dall_e")]
    DallE,
    #[serde(rename = "action_server_by_robocorp")]
    ActionServer,
    #[serde(rename = "ai_action_runner_by_connery")]
    Connery,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::CodeInterpreter => "code_interpreter",
            ToolKind::Retrieval => "retrieval",
            ToolKind::DdgSearch => "ddg_search",
            ToolKind::Tavily => "search_tavily",
            ToolKind::TavilyAnswer => "search_tavily_answer",
            ToolKind::Wikipedia => "wikipedia",
            ToolKind::Arxiv => "arxiv",
            ToolKind::PubMed => "pubmed",
            ToolKind::YouSearch => "you_search",
            ToolKind::SecFilings => "sec_filings_kai_ai",
            ToolKind::PressReleases => "press_releases_kai_ai",
            ToolKind::DallE => "dall_e",
            ToolKind::ActionServer => "action_server_by_robocorp",
            ToolKind::Connery => "ai_action_runner_by_connery",
        }
    }

    /// Whether the tool needs an external runtime brought online before a run
    pub fn requires_runtime(&self) -> bool {
        matches!(self, ToolKind::CodeInterpreter)
    }

    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::CodeInterpreter,
            ToolKind::Retrieval,
            ToolKind::DdgSearch,
            ToolKind::Tavily,
            ToolKind::TavilyAnswer,
            ToolKind::Wikipedia,
            ToolKind::Arxiv,
            ToolKind::PubMed,
            ToolKind::YouSearch,
            ToolKind::SecFilings,
            ToolKind::PressReleases,
            ToolKind::DallE,
            ToolKind::ActionServer,
            ToolKind::Connery,
        ]
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an assistant's tool selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind-specific settings (API keys, result limits, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    /// Any other keys on the entry, carried through to the agent untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolConfig {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            id: None,
            kind,
            name: None,
            description: None,
            config: Map::new(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_config_from_json() {
        let tool: ToolConfig = serde_json::from_value(json!({
            "id": "code_interpreter",
            "type": "code_interpreter",
            "name": "Code Interpreter",
            "config": {}
        }))
        .unwrap();

        assert_eq!(tool.kind, ToolKind::CodeInterpreter);
        assert!(tool.kind.requires_runtime());
        assert_eq!(tool.name.as_deref(), Some("Code Interpreter"));
    }

    #[test]
    fn test_unlisted_keys_are_kept() {
        let entry = json!({
            "type": "ddg_search",
            "multi_use": true,
            "config": { "max_results": 3 }
        });
        let tool: ToolConfig = serde_json::from_value(entry.clone()).unwrap();

        assert_eq!(tool.extra.get("multi_use"), Some(&json!(true)));
        assert!(!tool.extra.contains_key("config"));
        assert_eq!(serde_json::to_value(&tool).unwrap(), entry);
    }

    #[test]
    fn test_unknown_tool_kind_rejected() {
        let result = serde_json::from_value::<ToolConfig>(json!({ "type": "rm_rf" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_as_str_matches_serde_name() {
        for kind in ToolKind::all() {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }
}

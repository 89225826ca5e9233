use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::shared::enums::JanitorType;
use crate::core::shared::models::{ContextTag, Swarm, User};

pub const PROJECT_NAME: &str = "hive_autogen";

/// Picks the workflow for `mode` from the comma separated `ids_csv`:
/// `live` uses the first entry, `unit` and `integration` the third, anything
/// else the second, falling back to the first.
pub fn select_workflow_id(ids_csv: &str, mode: Option<&str>) -> Option<i64> {
    let ids: Vec<&str> = ids_csv.split(',').map(str::trim).collect();
    let pick = |index: usize| {
        ids.get(index)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
    };
    match mode.map(str::trim) {
        Some("live") => pick(0),
        Some("unit") | Some("integration") => pick(2),
        _ => pick(1).or_else(|| pick(0)),
    }
}

/// `https://swarm.example.com/api` -> `https://swarm.example.com:8444/api`
pub fn swarm_api_url(swarm_url: &str) -> String {
    swarm_url.replacen("/api", ":8444/api", 1)
}

/// `https://swarm.example.com/api` -> `https://swarm.example.com:3355`
pub fn repo2graph_url(swarm_url: &str) -> String {
    swarm_url.replacen("/api", ":3355", 1)
}

#[derive(Debug, Clone)]
pub struct ChatDispatch<'a> {
    pub task_id: Uuid,
    pub message: &'a str,
    pub context_tags: &'a [ContextTag],
    pub user: &'a User,
    pub swarm: Option<&'a Swarm>,
    pub attachment_urls: Vec<String>,
    pub mode: Option<&'a str>,
}

fn swarm_vars(swarm: Option<&Swarm>) -> (Value, Value, Value, Value) {
    let url = swarm.and_then(|s| s.swarm_url.as_deref());
    (
        url.map(swarm_api_url).map_or(Value::Null, Value::String),
        url.map(repo2graph_url).map_or(Value::Null, Value::String),
        swarm
            .and_then(|s| s.swarm_secret_alias.clone())
            .map_or(Value::Null, Value::String),
        swarm
            .and_then(|s| s.pool_name.clone())
            .map_or(Value::Null, Value::String),
    )
}

pub fn build_chat_payload(dispatch: &ChatDispatch<'_>, workflow_id: i64, base_url: &str) -> Value {
    let (swarm_url, repo2graph, secret_alias, pool_name) = swarm_vars(dispatch.swarm);
    json!({
        "name": PROJECT_NAME,
        "workflow_id": workflow_id,
        "webhook_url": format!("{base_url}/api/stakwork/webhook?task_id={}", dispatch.task_id),
        "workflow_params": {
            "set_var": {
                "attributes": {
                    "vars": {
                        "taskId": dispatch.task_id,
                        "message": dispatch.message,
                        "contextTags": dispatch.context_tags,
                        "webhookUrl": format!("{base_url}/api/chat/response"),
                        "alias": dispatch.user.name,
                        "username": dispatch.user.github_username,
                        "accessToken": dispatch.user.github_token,
                        "swarmUrl": swarm_url,
                        "swarmSecretAlias": secret_alias,
                        "poolName": pool_name,
                        "repo2graph_url": repo2graph,
                        "attachments": dispatch.attachment_urls,
                        "taskMode": dispatch.mode,
                    }
                }
            }
        }
    })
}

#[derive(Debug, Clone)]
pub struct JanitorDispatch<'a> {
    pub run_id: Uuid,
    pub janitor_type: JanitorType,
    pub workspace_id: Uuid,
    pub workspace_slug: &'a str,
    pub swarm: Option<&'a Swarm>,
}

pub fn build_janitor_payload(dispatch: &JanitorDispatch<'_>, workflow_id: i64, base_url: &str) -> Value {
    let (swarm_url, repo2graph, secret_alias, pool_name) = swarm_vars(dispatch.swarm);
    json!({
        "name": PROJECT_NAME,
        "workflow_id": workflow_id,
        "webhook_url": format!("{base_url}/api/janitors/webhook"),
        "workflow_params": {
            "set_var": {
                "attributes": {
                    "vars": {
                        "janitorType": dispatch.janitor_type,
                        "runId": dispatch.run_id,
                        "workspaceId": dispatch.workspace_id,
                        "workspaceSlug": dispatch.workspace_slug,
                        "webhookUrl": format!("{base_url}/api/janitors/webhook"),
                        "swarmUrl": swarm_url,
                        "swarmSecretAlias": secret_alias,
                        "poolName": pool_name,
                        "repo2graph_url": repo2graph,
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_select_workflow_id_by_mode() {
        let ids = "101, 202 ,303";
        assert_eq!(select_workflow_id(ids, Some("live")), Some(101));
        assert_eq!(select_workflow_id(ids, Some("unit")), Some(303));
        assert_eq!(select_workflow_id(ids, Some("integration")), Some(303));
        assert_eq!(select_workflow_id(ids, Some("default")), Some(202));
        assert_eq!(select_workflow_id(ids, None), Some(202));
    }

    #[test]
    fn test_select_workflow_id_fallbacks() {
        assert_eq!(select_workflow_id("101", None), Some(101));
        assert_eq!(select_workflow_id("101", Some("unit")), None);
        assert_eq!(select_workflow_id("abc,def", Some("live")), None);
        assert_eq!(select_workflow_id("", None), None);
    }

    #[test]
    fn test_swarm_url_rewrites() {
        let url = "https://swarm-1.sphinx.chat/api";
        assert_eq!(swarm_api_url(url), "https://swarm-1.sphinx.chat:8444/api");
        assert_eq!(repo2graph_url(url), "https://swarm-1.sphinx.chat:3355");
    }

    #[test]
    fn test_chat_payload_shape() {
        let user = User {
            id: Uuid::new_v4(),
            name: Some("Ada".to_string()),
            email: None,
            github_username: Some("ada".to_string()),
            github_token: Some("gho_token".to_string()),
            created_at: Utc::now(),
        };
        let swarm = Swarm {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            swarm_url: Some("https://swarm.test/api".to_string()),
            swarm_secret_alias: Some("{{SWARM_KEY}}".to_string()),
            pool_name: Some("pool-a".to_string()),
        };
        let tags = vec![ContextTag {
            tag_type: "FEATURE_BRIEF".to_string(),
            id: "f1".to_string(),
        }];
        let task_id = Uuid::new_v4();
        let dispatch = ChatDispatch {
            task_id,
            message: "hello",
            context_tags: &tags,
            user: &user,
            swarm: Some(&swarm),
            attachment_urls: vec!["https://files.test/a.png?sig".to_string()],
            mode: Some("live"),
        };

        let payload = build_chat_payload(&dispatch, 101, "https://hive.test");
        assert_eq!(payload["name"], "hive_autogen");
        assert_eq!(payload["workflow_id"], 101);
        assert_eq!(
            payload["webhook_url"],
            format!("https://hive.test/api/stakwork/webhook?task_id={task_id}")
        );
        let vars = &payload["workflow_params"]["set_var"]["attributes"]["vars"];
        assert_eq!(vars["message"], "hello");
        assert_eq!(vars["webhookUrl"], "https://hive.test/api/chat/response");
        assert_eq!(vars["contextTags"][0]["type"], "FEATURE_BRIEF");
        assert_eq!(vars["username"], "ada");
        assert_eq!(vars["accessToken"], "gho_token");
        assert_eq!(vars["swarmUrl"], "https://swarm.test:8444/api");
        assert_eq!(vars["repo2graph_url"], "https://swarm.test:3355");
        assert_eq!(vars["poolName"], "pool-a");
        assert_eq!(vars["attachments"][0], "https://files.test/a.png?sig");
        assert_eq!(vars["taskMode"], "live");
    }
}

#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    // Health
    pub const HEALTH: &'static str = "/health";
    pub const API_HEALTH: &'static str = "/api/health";

    // Workspaces
    pub const WORKSPACES: &'static str = "/api/workspaces";
    pub const WORKSPACE_SLUG_AVAILABILITY: &'static str = "/api/workspaces/slug-availability";
    pub const WORKSPACE_BY_SLUG: &'static str = "/api/workspaces/:slug";
    pub const WORKSPACE_MEMBERS: &'static str = "/api/workspaces/:slug/members";
    pub const WORKSPACE_MEMBER: &'static str = "/api/workspaces/:slug/members/:user_id";

    // Tasks
    pub const TASKS: &'static str = "/api/tasks";
    pub const WORKSPACE_TASKS: &'static str = "/api/workspaces/:slug/tasks";
    pub const TASK_MESSAGES: &'static str = "/api/tasks/:task_id/messages";

    // Chat and workflow callbacks
    pub const CHAT_MESSAGE: &'static str = "/api/chat/message";
    pub const CHAT_RESPONSE: &'static str = "/api/chat/response";
    pub const MOCK: &'static str = "/api/mock";
    pub const STAKWORK_WEBHOOK: &'static str = "/api/stakwork/webhook";

    // Janitors
    pub const JANITOR_CONFIG: &'static str = "/api/workspaces/:slug/janitors/config";
    pub const JANITOR_RUN: &'static str = "/api/workspaces/:slug/janitors/:janitor_type/run";
    pub const JANITOR_RUNS: &'static str = "/api/workspaces/:slug/janitors/runs";
    pub const JANITOR_RECOMMENDATIONS: &'static str = "/api/workspaces/:slug/janitors/recommendations";
    pub const RECOMMENDATION_ACCEPT: &'static str = "/api/janitors/recommendations/:id/accept";
    pub const RECOMMENDATION_DISMISS: &'static str = "/api/janitors/recommendations/:id/dismiss";
    pub const JANITOR_WEBHOOK: &'static str = "/api/janitors/webhook";
}

diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Nullable<Text>,
        email -> Nullable<Text>,
        github_username -> Nullable<Text>,
        github_token -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workspaces (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        slug -> Text,
        owner_id -> Uuid,
        deleted -> Bool,
        deleted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    workspace_members (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        joined_at -> Timestamptz,
        left_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    swarms (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        swarm_url -> Nullable<Text>,
        swarm_secret_alias -> Nullable<Text>,
        pool_name -> Nullable<Text>,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        status -> Text,
        priority -> Text,
        workflow_status -> Nullable<Text>,
        source_type -> Text,
        stakwork_project_id -> Nullable<Int8>,
        assignee_id -> Nullable<Uuid>,
        created_by_id -> Uuid,
        workflow_started_at -> Nullable<Timestamptz>,
        workflow_completed_at -> Nullable<Timestamptz>,
        deleted -> Bool,
        deleted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Uuid,
        task_id -> Uuid,
        message -> Text,
        role -> Text,
        status -> Text,
        context_tags -> Text,
        reply_id -> Nullable<Uuid>,
        source_websocket_id -> Nullable<Text>,
        user_id -> Nullable<Uuid>,
        timestamp -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    artifacts (id) {
        id -> Uuid,
        message_id -> Uuid,
        artifact_type -> Text,
        content -> Jsonb,
        icon -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attachments (id) {
        id -> Uuid,
        message_id -> Uuid,
        path -> Text,
        filename -> Text,
        mime_type -> Text,
        size -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    janitor_configs (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        unit_tests_enabled -> Bool,
        integration_tests_enabled -> Bool,
        e2e_tests_enabled -> Bool,
        security_review_enabled -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    janitor_runs (id) {
        id -> Uuid,
        janitor_config_id -> Uuid,
        janitor_type -> Text,
        triggered_by -> Text,
        status -> Text,
        stakwork_project_id -> Nullable<Int8>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        error -> Nullable<Text>,
        metadata -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    janitor_recommendations (id) {
        id -> Uuid,
        janitor_run_id -> Uuid,
        title -> Text,
        description -> Text,
        priority -> Text,
        impact -> Nullable<Text>,
        status -> Text,
        accepted_at -> Nullable<Timestamptz>,
        accepted_by_id -> Nullable<Uuid>,
        dismissed_at -> Nullable<Timestamptz>,
        dismissed_by_id -> Nullable<Uuid>,
        metadata -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(workspace_members -> workspaces (workspace_id));
diesel::joinable!(workspace_members -> users (user_id));
diesel::joinable!(swarms -> workspaces (workspace_id));
diesel::joinable!(tasks -> workspaces (workspace_id));
diesel::joinable!(chat_messages -> tasks (task_id));
diesel::joinable!(artifacts -> chat_messages (message_id));
diesel::joinable!(attachments -> chat_messages (message_id));
diesel::joinable!(janitor_configs -> workspaces (workspace_id));
diesel::joinable!(janitor_runs -> janitor_configs (janitor_config_id));
diesel::joinable!(janitor_recommendations -> janitor_runs (janitor_run_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    workspaces,
    workspace_members,
    swarms,
    tasks,
    chat_messages,
    artifacts,
    attachments,
    janitor_configs,
    janitor_runs,
    janitor_recommendations,
);

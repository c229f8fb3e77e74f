pub mod deploys;
pub mod git_webhooks;
pub mod logs;
pub mod projects;

//! Application-wide constants

/// Application name
pub const APP_NAME: &str = "reviewdeck";

/// Env var for log filter (tracing EnvFilter syntax)
pub const ENV_LOG: &str = "REVIEWDECK_LOG";
/// Env var for server host
pub const ENV_HOST: &str = "REVIEWDECK_HOST";
/// Env var for server port
pub const ENV_PORT: &str = "REVIEWDECK_PORT";
/// Env var for SQLite database path
pub const ENV_DATABASE_PATH: &str = "REVIEWDECK_DATABASE_PATH";
/// Env var for the JWT signing key (hex encoded)
pub const ENV_SIGNING_KEY: &str = "REVIEWDECK_SIGNING_KEY";
/// Env var for heartbeat interval override (seconds)
pub const ENV_HEARTBEAT_SECS: &str = "REVIEWDECK_HEARTBEAT_SECS";

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port
pub const DEFAULT_PORT: u16 = 3000;
/// Default database filename (relative to working directory)
pub const DEFAULT_DB_FILENAME: &str = "reviewdeck.db";

/// Session token lifetime
pub const SESSION_TTL_DAYS: u32 = 7;

/// Interval between WebSocket heartbeat probes. A connection that has not
/// acknowledged the previous probe by the next sweep is terminated.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// WebSocket close code for failed handshake authentication (policy violation)
pub const WS_CLOSE_POLICY_VIOLATION: u16 = 1008;

/// SQLite busy timeout
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;
/// SQLite pool size
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Platform-wide user roles
pub const USER_ROLE_SUBMITTER: &str = "submitter";
pub const USER_ROLE_REVIEWER: &str = "reviewer";

/// Project-scoped member roles
pub const MEMBER_ROLE_REVIEWER: &str = "reviewer";
pub const MEMBER_ROLE_ADMIN: &str = "admin";

/// Notification types emitted by the review workflow
pub const NOTIFY_SUBMISSION_APPROVED: &str = "submission_approved";
pub const NOTIFY_CHANGES_REQUESTED: &str = "changes_requested";

/// Default page size for notification listings
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 50;
/// Maximum page size for notification listings
pub const MAX_NOTIFICATION_LIMIT: u32 = 200;

//! Override set applied to the shared host subsystems

use std::collections::BTreeMap;

/// Prefix of the environment variables exported to the framework process
pub const ENV_PREFIX: &str = "SUITEBOOT_";

/// Timezone every test run observes
pub const TIMEZONE: &str = "UTC";

/// Precision that round-trips any double through serialization
pub const SERIALIZE_PRECISION: u32 = 17;

/// Backend used for one of the host caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Caching disabled, every read misses
    None,
    /// Process-local hash table
    Hash,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::None => "none",
            CacheBackend::Hash => "hash",
        }
    }
}

/// Ordering of a job queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    Fifo,
}

/// Configuration of a single job queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueueConf {
    pub name: String,
    pub order: QueueOrder,
}

/// Backing store for localisation data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalisationStoreKind {
    /// Nothing is persisted; every lookup falls back to the source files
    Null,
}

impl LocalisationStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalisationStoreKind::Null => "null",
        }
    }
}

/// Outbound mail transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Mail is intercepted and reported as not sent
    Disabled,
}

impl MailTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailTransport::Disabled => "disabled",
        }
    }
}

/// A session provider the host should register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProviderConf {
    pub name: String,
    pub priority: u32,
    pub call_user_set_cookies_hook: bool,
}

/// Every override applied before framework code runs
///
/// Built once per run by [`SandboxConfig::isolated`] and handed to the
/// [`Sandbox`](super::Sandbox); nothing in it is derived from host state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub main_cache: CacheBackend,
    pub main_wan_cache: CacheBackend,
    pub message_cache: CacheBackend,
    pub parser_cache: CacheBackend,
    pub session_cache: CacheBackend,
    pub language_converter_cache: CacheBackend,
    pub main_stash: CacheBackend,
    pub job_queues: Vec<JobQueueConf>,
    pub use_database_messages: bool,
    pub localisation_store: LocalisationStoreKind,
    pub timezone: String,
    pub serialize_precision: u32,
    pub development_warnings: bool,
    pub max_nesting_level: u32,
    pub session_providers: Vec<SessionProviderConf>,
    pub mail_transport: MailTransport,
}

impl SandboxConfig {
    /// The isolated, deterministic configuration used for every test run
    pub fn isolated() -> Self {
        SandboxConfig {
            main_cache: CacheBackend::None,
            main_wan_cache: CacheBackend::None,
            message_cache: CacheBackend::Hash,
            parser_cache: CacheBackend::Hash,
            session_cache: CacheBackend::Hash,
            language_converter_cache: CacheBackend::Hash,
            main_stash: CacheBackend::Hash,
            job_queues: vec![JobQueueConf {
                name: "default".to_string(),
                order: QueueOrder::Fifo,
            }],
            use_database_messages: false,
            localisation_store: LocalisationStoreKind::Null,
            timezone: TIMEZONE.to_string(),
            serialize_precision: SERIALIZE_PRECISION,
            // Warnings fail tests
            development_warnings: true,
            max_nesting_level: 1000,
            session_providers: vec![SessionProviderConf {
                name: "cookie".to_string(),
                priority: 30,
                call_user_set_cookies_hook: true,
            }],
            mail_transport: MailTransport::Disabled,
        }
    }

    /// Environment variables that carry this configuration to the framework
    pub fn to_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            env.insert(format!("{}{}", ENV_PREFIX, key), value);
        };

        put("MAIN_CACHE", self.main_cache.as_str().to_string());
        put("MAIN_WAN_CACHE", self.main_wan_cache.as_str().to_string());
        put("MESSAGE_CACHE", self.message_cache.as_str().to_string());
        put("PARSER_CACHE", self.parser_cache.as_str().to_string());
        put("SESSION_CACHE", self.session_cache.as_str().to_string());
        put(
            "LANGUAGE_CONVERTER_CACHE",
            self.language_converter_cache.as_str().to_string(),
        );
        put("MAIN_STASH", self.main_stash.as_str().to_string());
        put(
            "JOB_QUEUES",
            self.job_queues
                .iter()
                .map(|queue| queue.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        put(
            "USE_DATABASE_MESSAGES",
            self.use_database_messages.to_string(),
        );
        put(
            "LOCALISATION_STORE",
            self.localisation_store.as_str().to_string(),
        );
        put("SERIALIZE_PRECISION", self.serialize_precision.to_string());
        put(
            "DEVELOPMENT_WARNINGS",
            self.development_warnings.to_string(),
        );
        put("MAX_NESTING_LEVEL", self.max_nesting_level.to_string());
        put("MAIL", self.mail_transport.as_str().to_string());

        env.insert("TZ".to_string(), self.timezone.clone());
        env
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::isolated()
    }
}

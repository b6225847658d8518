//! Process-local substitutes for the shared host subsystems

use crate::error::Result;
use crate::sandbox::config::{CacheBackend, SandboxConfig};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// Key-value cache port
pub trait ObjectCache {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, value: Vec<u8>);
    /// Remove a key, returning whether it was present
    fn delete(&mut self, key: &str) -> bool;
}

/// Cache that stores nothing
#[derive(Debug, Default)]
pub struct NullCache;

impl ObjectCache for NullCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&mut self, _key: &str, _value: Vec<u8>) {}

    fn delete(&mut self, _key: &str) -> bool {
        false
    }
}

/// In-process hash table cache, always empty when created
#[derive(Debug, Default)]
pub struct HashCache {
    entries: HashMap<String, Vec<u8>>,
}

impl HashCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ObjectCache for HashCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

fn cache_for(backend: CacheBackend) -> Box<dyn ObjectCache> {
    match backend {
        CacheBackend::None => Box::new(NullCache),
        CacheBackend::Hash => Box::new(HashCache::default()),
    }
}

/// A unit of deferred work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_type: String,
    pub params: BTreeMap<String, String>,
}

impl Job {
    pub fn new(job_type: impl Into<String>) -> Self {
        Job {
            job_type: job_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

/// Synchronous in-memory FIFO queue
///
/// There is no worker: jobs run on the caller's thread when
/// [`run_pending`](MemoryJobQueue::run_pending) drains the queue.
#[derive(Debug)]
pub struct MemoryJobQueue {
    name: String,
    jobs: VecDeque<Job>,
}

impl MemoryJobQueue {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryJobQueue {
            name: name.into(),
            jobs: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run every queued job in FIFO order, stopping at the first failure
    ///
    /// Returns the number of jobs that ran successfully.
    pub fn run_pending<F>(&mut self, mut run: F) -> Result<usize>
    where
        F: FnMut(&Job) -> Result<()>,
    {
        let mut ran = 0;
        while let Some(job) = self.jobs.pop_front() {
            run(&job)?;
            ran += 1;
        }
        Ok(ran)
    }
}

/// An outbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery result reported by a [`Mailer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailStatus {
    Sent,
    NotSent,
}

/// Outbound notification port
pub trait Mailer {
    fn send(&self, message: &MailMessage) -> MailStatus;
}

/// Mailer that drops every message
#[derive(Debug, Default)]
pub struct NullMailer {
    suppressed: Cell<usize>,
}

impl NullMailer {
    /// Number of messages dropped so far
    pub fn suppressed(&self) -> usize {
        self.suppressed.get()
    }
}

impl Mailer for NullMailer {
    fn send(&self, message: &MailMessage) -> MailStatus {
        debug!(to = %message.to, subject = %message.subject, "suppressed outbound mail");
        self.suppressed.set(self.suppressed.get() + 1);
        MailStatus::NotSent
    }
}

/// Localisation data port
pub trait LocalisationStore {
    fn get(&self, code: &str, key: &str) -> Option<String>;
    fn set(&mut self, code: &str, key: &str, value: String);
}

/// Store without persistent backing
#[derive(Debug, Default)]
pub struct NullLocalisationStore;

impl LocalisationStore for NullLocalisationStore {
    fn get(&self, _code: &str, _key: &str) -> Option<String> {
        None
    }

    fn set(&mut self, _code: &str, _key: &str, _value: String) {}
}

/// The substitutes injected into every subsystem for one run
pub struct Services {
    pub main_cache: Box<dyn ObjectCache>,
    pub main_wan_cache: Box<dyn ObjectCache>,
    pub message_cache: Box<dyn ObjectCache>,
    pub parser_cache: Box<dyn ObjectCache>,
    pub session_cache: Box<dyn ObjectCache>,
    pub language_converter_cache: Box<dyn ObjectCache>,
    pub main_stash: Box<dyn ObjectCache>,
    pub job_queues: BTreeMap<String, MemoryJobQueue>,
    pub mailer: NullMailer,
    pub localisation: Box<dyn LocalisationStore>,
}

impl Services {
    /// Build fresh substitutes from the configuration alone
    pub fn from_config(config: &SandboxConfig) -> Self {
        let job_queues = config
            .job_queues
            .iter()
            .map(|queue| (queue.name.clone(), MemoryJobQueue::new(&queue.name)))
            .collect();

        Services {
            main_cache: cache_for(config.main_cache),
            main_wan_cache: cache_for(config.main_wan_cache),
            message_cache: cache_for(config.message_cache),
            parser_cache: cache_for(config.parser_cache),
            session_cache: cache_for(config.session_cache),
            language_converter_cache: cache_for(config.language_converter_cache),
            main_stash: cache_for(config.main_stash),
            job_queues,
            mailer: NullMailer::default(),
            localisation: Box::new(NullLocalisationStore),
        }
    }

    /// Queue used for a job type
    ///
    /// Types without a dedicated queue share the "default" queue.
    pub fn job_queue(&mut self, job_type: &str) -> Option<&mut MemoryJobQueue> {
        let name = if self.job_queues.contains_key(job_type) {
            job_type
        } else {
            "default"
        };
        self.job_queues.get_mut(name)
    }
}

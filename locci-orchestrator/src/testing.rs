//! In-process fakes for the engine, bus and resolver traits

use async_trait::async_trait;
use locci_core::domain::build::{BuildRecipe, SourceReference};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::bus::{BusError, BusSession, MessageBus};
use crate::engine::{ContainerEngine, EngineError, ExecOutput};
use crate::service::pipeline::PipelineService;
use crate::stages::{
    ArtifactStore, EventNotifier, ImageBuilder, RegistryPublisher, SourceError, SourceResolver,
    SourceTree,
};

pub const FAKE_DIGEST: &str = "sha256:0123456789abcdef";

/// A small checked-out tree with a package manifest
pub fn source_tree() -> SourceTree {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.jsx"), "export default 1;").unwrap();
    SourceTree::new(dir)
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Default)]
struct EngineLog {
    started: Vec<(String, String)>,
    executed: Vec<String>,
    removed_containers: Vec<String>,
    built_images: Vec<String>,
    pushed: Vec<(String, String)>,
    removed_images: Vec<String>,
}

/// Records engine calls and simulates a build producing a small bundle
#[derive(Default)]
pub struct FakeEngine {
    fail_start: bool,
    fail_command: Option<usize>,
    fail_push: bool,
    exec_delay: Option<Duration>,
    exec_count: AtomicUsize,
    log: Mutex<EngineLog>,
}

impl FakeEngine {
    /// Engine whose `index`-th exec exits with code 2
    ///
    /// Exec calls are counted across the engine's lifetime.
    pub fn failing_command(index: usize) -> Self {
        Self {
            fail_command: Some(index),
            ..Self::default()
        }
    }

    /// Engine that cannot start the builder container
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Engine whose exec calls each take `delay`
    pub fn slow_exec(delay: Duration) -> Self {
        Self {
            exec_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing_push() -> Self {
        Self {
            fail_push: true,
            ..Self::default()
        }
    }

    pub fn started_containers(&self) -> Vec<String> {
        self.log().started.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn started_images(&self) -> Vec<String> {
        self.log().started.iter().map(|(_, i)| i.clone()).collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.log().executed.clone()
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.log().removed_containers.clone()
    }

    pub fn built_images(&self) -> Vec<String> {
        self.log().built_images.clone()
    }

    pub fn pushed(&self) -> Vec<(String, String)> {
        self.log().pushed.clone()
    }

    pub fn removed_images(&self) -> Vec<String> {
        self.log().removed_images.clone()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn start_container(&self, name: &str, image: &str) -> Result<(), EngineError> {
        self.log()
            .started
            .push((name.to_string(), image.to_string()));

        if self.fail_start {
            return Err(EngineError::CommandFailed {
                command: format!("podman run -d --name {} {}", name, image),
                exit_code: 125,
                stderr: format!("Error: {}: image not known", image),
            });
        }
        Ok(())
    }

    async fn copy_into(
        &self,
        _container: &str,
        host_dir: &Path,
        _container_dir: &str,
    ) -> Result<(), EngineError> {
        assert!(host_dir.join("package.json").exists());
        Ok(())
    }

    async fn exec(
        &self,
        _container: &str,
        _workdir: &str,
        argv: &[String],
    ) -> Result<ExecOutput, EngineError> {
        let index = self.exec_count.fetch_add(1, Ordering::SeqCst);
        self.log().executed.push(argv.join(" "));

        if let Some(delay) = self.exec_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_command == Some(index) {
            return Ok(ExecOutput {
                stdout: String::new(),
                stderr: "npm ERR! missing script".to_string(),
                exit_code: 2,
            });
        }

        Ok(ExecOutput {
            stdout: "ok".to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn copy_out(
        &self,
        _container: &str,
        _container_dir: &str,
        host_dir: &Path,
    ) -> Result<(), EngineError> {
        std::fs::create_dir_all(host_dir.join("assets")).unwrap();
        std::fs::write(host_dir.join("index.html"), "<html></html>").unwrap();
        std::fs::write(host_dir.join("assets/app.js"), "console.log(1);").unwrap();
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), EngineError> {
        self.log().removed_containers.push(name.to_string());
        Ok(())
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        containerfile: &Path,
        tag: &str,
    ) -> Result<(), EngineError> {
        assert!(context_dir.join("output/index.html").exists());
        assert!(containerfile.exists());
        self.log().built_images.push(tag.to_string());
        Ok(())
    }

    async fn push_image(
        &self,
        local_tag: &str,
        reference: &str,
    ) -> Result<Option<String>, EngineError> {
        if self.fail_push {
            return Err(EngineError::CommandFailed {
                command: format!("podman push {} {}", local_tag, reference),
                exit_code: 125,
                stderr: "unauthorized".to_string(),
            });
        }

        self.log()
            .pushed
            .push((local_tag.to_string(), reference.to_string()));
        Ok(Some(FAKE_DIGEST.to_string()))
    }

    async fn remove_image(&self, tag: &str) -> Result<(), EngineError> {
        self.log().removed_images.push(tag.to_string());
        Ok(())
    }
}

// =============================================================================
// Bus
// =============================================================================

/// How the fake broker answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBehavior {
    Ack,
    NeverAck,
    Reject,
    RefuseConnect,
}

#[derive(Default)]
struct BusLog {
    declared: Vec<String>,
    published: Vec<(String, String, Vec<u8>)>,
    closed: usize,
}

pub struct FakeBus {
    behavior: BusBehavior,
    log: Arc<Mutex<BusLog>>,
}

impl FakeBus {
    pub fn new(behavior: BusBehavior) -> Self {
        Self {
            behavior,
            log: Arc::default(),
        }
    }

    pub fn published(&self) -> Vec<(String, String, Vec<u8>)> {
        self.log.lock().unwrap().published.clone()
    }

    pub fn declared(&self) -> Vec<String> {
        self.log.lock().unwrap().declared.clone()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn open(&self) -> Result<Box<dyn BusSession>, BusError> {
        if self.behavior == BusBehavior::RefuseConnect {
            return Err(BusError::Connect("connection refused".to_string()));
        }

        Ok(Box::new(FakeSession {
            behavior: self.behavior,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    behavior: BusBehavior,
    log: Arc<Mutex<BusLog>>,
}

#[async_trait]
impl BusSession for FakeSession {
    async fn declare_queue(&mut self, queue: &str) -> Result<(), BusError> {
        self.log.lock().unwrap().declared.push(queue.to_string());
        Ok(())
    }

    async fn publish(
        &mut self,
        queue: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), BusError> {
        match self.behavior {
            BusBehavior::NeverAck => std::future::pending().await,
            BusBehavior::Reject => Err(BusError::Publish {
                queue: queue.to_string(),
                reason: "NOT_FOUND".to_string(),
            }),
            _ => {
                self.log.lock().unwrap().published.push((
                    queue.to_string(),
                    content_type.to_string(),
                    body.to_vec(),
                ));
                Ok(())
            }
        }
    }

    async fn close(&mut self) -> Result<(), BusError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// =============================================================================
// Resolver
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolverMode {
    Ok,
    MissingBranch,
    BrokenGit,
}

pub struct FakeResolver {
    mode: ResolverMode,
    calls: AtomicUsize,
}

impl FakeResolver {
    fn with_mode(mode: ResolverMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ok() -> Self {
        Self::with_mode(ResolverMode::Ok)
    }

    /// The remote has no such branch
    pub fn missing_branch() -> Self {
        Self::with_mode(ResolverMode::MissingBranch)
    }

    /// The git client cannot run on this host
    pub fn broken_git() -> Self {
        Self::with_mode(ResolverMode::BrokenGit)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceResolver for FakeResolver {
    async fn resolve(&self, source: &SourceReference) -> Result<SourceTree, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ResolverMode::Ok => Ok(source_tree()),
            ResolverMode::MissingBranch => Err(SourceError::unavailable(
                source,
                format!("Remote branch {} not found in upstream origin", source.branch),
            )),
            ResolverMode::BrokenGit => Err(SourceError::local(
                source,
                "failed to execute git: No such file or directory",
            )),
        }
    }
}

/// Pipeline wired to fakes with the default naming scheme
pub fn pipeline_service(
    resolver: Arc<FakeResolver>,
    engine: Arc<FakeEngine>,
    bus: Arc<FakeBus>,
    export_root: &Path,
) -> PipelineService {
    PipelineService::new(
        resolver,
        ImageBuilder::new(engine.clone()),
        RegistryPublisher::new(engine, "ttl.sh", "locci-build", "1h"),
        ArtifactStore::new(export_root, "locci"),
        EventNotifier::new(bus, "locci-deploy", Duration::from_secs(5)),
        BuildRecipe::default(),
    )
}

// ─── Engine Resolver ───
// Maps an engine association to an install directory by racing the
// launcher-install registration against the source-build registration.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use super::reg_query::RegQueryStore;
use super::registry::{RegistryError, RegistryStore};
use crate::core::config::EngineRegistryConfig;
use crate::core::error::{UProjectError, UProjectResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Install,
    Source,
}

pub struct EngineResolver<S> {
    store: Arc<S>,
    config: Arc<EngineRegistryConfig>,
}

impl<S> Clone for EngineResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl EngineResolver<RegQueryStore> {
    /// Resolver over the Windows registry, with the per-user config applied.
    pub fn system() -> UProjectResult<Self> {
        let config = EngineRegistryConfig::load_default()?;
        Ok(Self::new(RegQueryStore::new(), config))
    }
}

impl<S> EngineResolver<S>
where
    S: RegistryStore + 'static,
{
    pub fn new(store: S, config: EngineRegistryConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    pub fn from_arc(store: Arc<S>, config: EngineRegistryConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineRegistryConfig {
        &self.config
    }

    /// Resolve `association` to an engine install directory.
    ///
    /// Both registrations are queried concurrently and the first one to
    /// settle decides the outcome, success or failure. A fast failure
    /// therefore hides a slower success. The losing query keeps running in
    /// the background and its result is dropped. There is no timeout.
    ///
    /// Every failure is reported as [`UProjectError::EngineNotFound`].
    #[instrument(skip(self))]
    pub async fn resolve(&self, association: &str) -> UProjectResult<PathBuf> {
        let not_found = || UProjectError::EngineNotFound {
            association: association.to_string(),
        };

        if association.is_empty() {
            debug!("Project has no engine association");
            return Err(not_found());
        }

        let from_install = tokio::spawn(find_from_install(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            association.to_string(),
        ));
        let from_source = tokio::spawn(find_from_source(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            association.to_string(),
        ));

        let (winner, settled) = tokio::select! {
            result = from_install => (Strategy::Install, result),
            result = from_source => (Strategy::Source, result),
        };

        match settled {
            Ok(Ok(dir)) => {
                info!("Engine '{}' resolved via {:?}: {:?}", association, winner, dir);
                Ok(dir)
            }
            Ok(Err(e)) => {
                warn!("Engine '{}' lookup via {:?} failed first: {}", association, winner, e);
                Err(not_found())
            }
            Err(e) => {
                warn!("Engine '{}' lookup via {:?} aborted: {}", association, winner, e);
                Err(not_found())
            }
        }
    }
}

/// Install registration: `<installs_root>\<association>`, read as a stream.
async fn find_from_install<S: RegistryStore>(
    store: Arc<S>,
    config: Arc<EngineRegistryConfig>,
    association: String,
) -> Result<PathBuf, RegistryError> {
    let key = config.install_key(&association);
    let mut events = store.list_stream(&key);

    match events.next().await {
        Some(Ok(entry)) => entry
            .values
            .get(&config.installed_directory_value)
            .filter(|v| !v.value.is_empty())
            .map(|v| PathBuf::from(&v.value))
            .ok_or_else(|| RegistryError::ValueNotFound {
                key: key.clone(),
                value: config.installed_directory_value.clone(),
            }),
        Some(Err(e)) => Err(e),
        None => Err(RegistryError::EmptyStream(key)),
    }
}

/// Source-build registration: a value named `<association>` under `builds_root`.
async fn find_from_source<S: RegistryStore>(
    store: Arc<S>,
    config: Arc<EngineRegistryConfig>,
    association: String,
) -> Result<PathBuf, RegistryError> {
    let key = config.builds_root.as_str();
    let listing = store.list(key).await?;

    let builds = listing
        .get(key)
        .ok_or_else(|| RegistryError::KeyNotFound(key.to_string()))?;

    builds
        .values
        .get(&association)
        .filter(|v| !v.value.is_empty())
        .map(|v| PathBuf::from(&v.value))
        .ok_or_else(|| RegistryError::ValueNotFound {
            key: key.to_string(),
            value: association,
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_util::stream::{self, BoxStream};
    use tokio::sync::oneshot;

    use super::*;
    use crate::core::engine::{MemoryRegistry, RegistryKey, RegistryListing, RegistryValue};
    use crate::core::project::UProject;

    const ENGINE_A: &str = r"C:\Engine\A";
    const ENGINE_B: &str = r"C:\Engine\B";
    const GUID: &str = "{2A5F1B4C-0000-4E5F-9C1D-1234567890AB}";

    type InstallEvent = Result<RegistryKey, RegistryError>;
    type BuildsEvent = Result<RegistryListing, RegistryError>;

    /// Store whose answers are released by the test, one per convention.
    struct GatedStore {
        install: Mutex<Option<oneshot::Receiver<InstallEvent>>>,
        builds: Mutex<Option<oneshot::Receiver<BuildsEvent>>>,
        source_done: Mutex<Option<oneshot::Sender<()>>>,
    }

    struct Gates {
        install: oneshot::Sender<InstallEvent>,
        builds: oneshot::Sender<BuildsEvent>,
        source_done: oneshot::Receiver<()>,
    }

    fn gated() -> (GatedStore, Gates) {
        let (install_tx, install_rx) = oneshot::channel();
        let (builds_tx, builds_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        (
            GatedStore {
                install: Mutex::new(Some(install_rx)),
                builds: Mutex::new(Some(builds_rx)),
                source_done: Mutex::new(Some(done_tx)),
            },
            Gates {
                install: install_tx,
                builds: builds_tx,
                source_done: done_rx,
            },
        )
    }

    fn closed(key: &str) -> RegistryError {
        RegistryError::Query {
            key: key.to_string(),
            message: "gate closed".to_string(),
        }
    }

    #[async_trait]
    impl RegistryStore for GatedStore {
        async fn list(&self, key: &str) -> Result<RegistryListing, RegistryError> {
            let gate = self.builds.lock().unwrap().take().expect("builds listed once");
            let result = gate.await.unwrap_or_else(|_| Err(closed(key)));
            let done = self.source_done.lock().unwrap().take();
            if let Some(done) = done {
                let _ = done.send(());
            }
            result
        }

        fn list_stream(&self, key: &str) -> BoxStream<'_, Result<RegistryKey, RegistryError>> {
            let gate = self.install.lock().unwrap().take().expect("install listed once");
            let key = key.to_string();
            stream::once(async move { gate.await.unwrap_or_else(|_| Err(closed(&key))) }).boxed()
        }
    }

    fn install_entry(dir: &str) -> InstallEvent {
        let config = EngineRegistryConfig::default();
        let mut entry = RegistryKey {
            path: config.install_key("5.3"),
            ..Default::default()
        };
        entry
            .values
            .insert("InstalledDirectory".to_string(), RegistryValue::string(dir));
        Ok(entry)
    }

    fn builds_listing(association: &str, dir: &str) -> BuildsEvent {
        let root = EngineRegistryConfig::default().builds_root;
        let mut entry = RegistryKey {
            path: root.clone(),
            ..Default::default()
        };
        entry
            .values
            .insert(association.to_string(), RegistryValue::string(dir));
        Ok(RegistryListing::from([(root, entry)]))
    }

    fn resolver<S: RegistryStore + 'static>(store: S) -> EngineResolver<S> {
        EngineResolver::new(store, EngineRegistryConfig::default())
    }

    #[tokio::test]
    async fn install_wins_when_it_settles_first() {
        let (store, gates) = gated();
        gates.install.send(install_entry(ENGINE_A)).unwrap();
        let _pending_builds = gates.builds;

        let dir = resolver(store).resolve("5.3").await.unwrap();
        assert_eq!(dir, PathBuf::from(ENGINE_A));
    }

    #[tokio::test]
    async fn source_wins_even_if_install_would_succeed() {
        let (store, gates) = gated();
        gates.builds.send(builds_listing("5.3", ENGINE_B)).unwrap();

        let dir = resolver(store).resolve("5.3").await.unwrap();
        assert_eq!(dir, PathBuf::from(ENGINE_B));

        // The install answer arrives too late to matter.
        let _ = gates.install.send(install_entry(ENGINE_A));
    }

    #[tokio::test]
    async fn first_failure_masks_later_success() {
        let (store, gates) = gated();
        gates
            .install
            .send(Err(RegistryError::KeyNotFound("5.3".into())))
            .unwrap();

        let err = resolver(store).resolve("5.3").await.unwrap_err();
        match err {
            UProjectError::EngineNotFound { association } => assert_eq!(association, "5.3"),
            other => panic!("unexpected error: {other:?}"),
        }

        let _ = gates.builds.send(builds_listing("5.3", ENGINE_B));
    }

    #[tokio::test]
    async fn losing_strategy_runs_to_completion() {
        let (store, gates) = gated();
        gates.install.send(install_entry(ENGINE_A)).unwrap();

        let dir = resolver(store).resolve("5.3").await.unwrap();
        assert_eq!(dir, PathBuf::from(ENGINE_A));

        gates.builds.send(builds_listing("5.3", ENGINE_B)).unwrap();
        gates
            .source_done
            .await
            .expect("detached source lookup finished");
    }

    #[tokio::test]
    async fn install_entry_without_directory_value_fails() {
        let (store, gates) = gated();
        gates.install.send(Ok(RegistryKey::default())).unwrap();
        let _pending_builds = gates.builds;

        let err = resolver(store).resolve("5.3").await.unwrap_err();
        assert!(matches!(err, UProjectError::EngineNotFound { .. }));
    }

    #[tokio::test]
    async fn source_listing_without_association_fails() {
        let (store, gates) = gated();
        gates.builds.send(builds_listing("{OTHER}", ENGINE_B)).unwrap();
        let _pending_install = gates.install;

        let err = resolver(store).resolve(GUID).await.unwrap_err();
        assert!(matches!(err, UProjectError::EngineNotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_engine_is_not_found() {
        let err = resolver(MemoryRegistry::new()).resolve("4.27").await.unwrap_err();
        assert!(matches!(err, UProjectError::EngineNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_association_short_circuits() {
        let err = resolver(MemoryRegistry::new()).resolve("").await.unwrap_err();
        assert!(matches!(err, UProjectError::EngineNotFound { .. }));
    }

    #[tokio::test]
    async fn agreeing_registrations_resolve() {
        let config = EngineRegistryConfig::default();
        let store = MemoryRegistry::new()
            .with_value(&config.install_key("5.3"), "InstalledDirectory", ENGINE_A)
            .with_value(&config.builds_root, "5.3", ENGINE_A);

        let dir = resolver(store).resolve("5.3").await.unwrap();
        assert_eq!(dir, PathBuf::from(ENGINE_A));
    }

    #[tokio::test]
    async fn project_resolves_through_its_association() {
        let config = EngineRegistryConfig::default();
        let store = MemoryRegistry::new()
            .with_value(&config.install_key(GUID), "InstalledDirectory", ENGINE_B)
            .with_value(&config.builds_root, GUID, ENGINE_B);
        let project = UProject::from_slice(
            "/work/Foo/Foo.uproject",
            format!(r#"{{"EngineAssociation":"{GUID}"}}"#).as_bytes(),
        )
        .unwrap();

        let dir = project.engine_directory_with(&resolver(store)).await.unwrap();
        assert_eq!(dir, PathBuf::from(ENGINE_B));
    }

    #[tokio::test]
    async fn project_without_association_has_no_engine() {
        let project = UProject::from_slice("/work/Foo/Foo.uproject", b"{}").unwrap();
        let err = project
            .engine_directory_with(&resolver(MemoryRegistry::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

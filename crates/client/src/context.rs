//! Explicit application context.
//!
//! Every store and service the client needs is created here once and handed
//! out by reference. There are no process-wide singletons: two contexts over
//! two storages are fully independent.

use std::sync::Arc;

use talent_ops_core::route::{GuardDecision, RouteTable};
use talent_ops_core::{PermissionRequirement, ThemeMode};

use crate::auth::AuthApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::ApiClient;
use crate::notify::{Navigator, Notifier, TracingNavigator, TracingNotifier};
use crate::permission::PermissionStore;
use crate::realtime::RealtimeChannel;
use crate::session::SessionStore;
use crate::storage::{ClientStorage, FileStorage};
use crate::theme::ThemeStore;

pub struct AppContext {
    config: ClientConfig,
    session: Arc<SessionStore>,
    permissions: Arc<PermissionStore>,
    api: ApiClient,
    auth: AuthApi,
    realtime: RealtimeChannel,
    theme: ThemeStore,
    routes: RouteTable,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("api_url", &self.config.api_url.as_str())
            .field("session", &self.session)
            .field("permissions", &self.permissions)
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Wire up every component. The session is restored from `storage`
    /// immediately; role and theme wait for [`Self::init`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn ClientStorage>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = Arc::new(SessionStore::restore(Arc::clone(&storage)));
        let permissions = Arc::new(PermissionStore::new(Arc::clone(&storage)));
        let api = ApiClient::new(
            &config,
            Arc::clone(&session),
            Arc::clone(&notifier),
            Arc::clone(&navigator),
        )?;
        let auth = AuthApi::new(api.clone());
        let realtime = RealtimeChannel::new(config.ws_url.clone(), config.reconnect, notifier);
        let theme = ThemeStore::new(storage);

        Ok(Self {
            config,
            session,
            permissions,
            api,
            auth,
            realtime,
            theme,
            routes: RouteTable::app(),
            navigator,
        })
    }

    /// Context over the configured storage file, reporting through the log.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the storage file cannot be opened.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::open(&config.storage_path)?);
        Self::new(
            config,
            storage,
            Arc::new(TracingNotifier),
            Arc::new(TracingNavigator),
        )
    }

    /// Restore the active role and the theme preference.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if storage cannot be read or written.
    pub fn init(&self) -> Result<()> {
        let role = self
            .permissions
            .init(self.config.fallback_role.as_deref())?;
        let theme: ThemeMode = self.theme.init()?;
        tracing::debug!(
            role = role.as_ref().map(|code| code.as_str()),
            theme = %theme,
            logged_in = self.session.is_logged_in(),
            "Client initialized"
        );
        Ok(())
    }

    /// Open the realtime channel with the current session token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Realtime` outside a Tokio runtime.
    pub fn connect_realtime(&self) -> Result<()> {
        self.realtime.connect(self.session.token().as_ref())?;
        Ok(())
    }

    /// Shut down background work.
    pub fn teardown(&self) {
        self.realtime.disconnect();
    }

    /// Run the route guard for `path` with the current session and follow
    /// its decision through the navigator.
    pub fn navigate(&self, path: &str) -> GuardDecision {
        let decision = self.routes.guard(path, self.session.is_logged_in());
        match &decision {
            GuardDecision::Proceed => self.navigator.navigate(path),
            GuardDecision::Redirect(to) => {
                tracing::debug!(from = path, to = %to, "Navigation redirected");
                self.navigator.navigate(to);
            }
        }
        decision
    }

    /// Whether the active role satisfies `requirement`.
    pub fn can(&self, requirement: &PermissionRequirement) -> bool {
        self.permissions.can(requirement)
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub const fn permissions(&self) -> &Arc<PermissionStore> {
        &self.permissions
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    pub const fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub const fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }

    pub const fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use talent_ops_core::{Permission, RoleCode};

    use super::*;
    use crate::notify::{CollectingNavigator, CollectingNotifier};
    use crate::storage::MemoryStorage;

    fn context(fallback: Option<&str>) -> (AppContext, Arc<CollectingNavigator>) {
        let mut config = ClientConfig::for_api("http://127.0.0.1:9/api/v1", "unused.json").unwrap();
        config.fallback_role = fallback.map(str::to_owned);
        let navigator = Arc::new(CollectingNavigator::new());
        let ctx = AppContext::new(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(CollectingNotifier::new()),
            navigator.clone(),
        )
        .unwrap();
        ctx.init().unwrap();
        (ctx, navigator)
    }

    #[test]
    fn test_anonymous_navigation_is_redirected() {
        let (ctx, navigator) = context(None);
        assert_eq!(
            ctx.navigate("/kanban"),
            GuardDecision::Redirect("/login".into())
        );
        assert_eq!(ctx.navigate("/portal"), GuardDecision::Proceed);
        assert_eq!(navigator.visits(), vec!["/login", "/portal"]);
    }

    #[test]
    fn test_can_without_fallback_is_false() {
        let (ctx, _) = context(None);
        assert!(!ctx.can(&PermissionRequirement::One(Permission::DASHBOARD_VIEW)));
    }

    #[test]
    fn test_can_with_fallback_role() {
        let (ctx, _) = context(Some(RoleCode::VIEWER));
        assert!(ctx.can(&PermissionRequirement::One(Permission::DASHBOARD_VIEW)));
        assert!(!ctx.can(&PermissionRequirement::One(Permission::JOB_CREATE)));
    }
}

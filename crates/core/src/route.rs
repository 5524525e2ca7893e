//! Route table and the authentication guard run before every navigation.
//!
//! Routes nest: a child's path is joined onto its parent's and its metadata
//! is merged over the parent's, child fields winning. Paths support `:param`
//! segments and one `:name(.*)*` catch-all.
//!
//! The guard only looks at `requires_auth`. A route's `permission` is
//! resolved and exposed but not enforced here; hiding the entry point is left
//! to element gates.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Permission;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/dashboard";

/// Redirects are followed at most this many times per navigation.
const MAX_REDIRECTS: usize = 8;

/// Per-record metadata. Unset fields inherit from the parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub requires_auth: Option<bool>,
    pub permission: Option<Permission>,
}

impl RouteMeta {
    #[must_use]
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = Some(requires_auth);
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    fn merged_over(&self, parent: &Self) -> Self {
        Self {
            title: self.title.clone().or_else(|| parent.title.clone()),
            requires_auth: self.requires_auth.or(parent.requires_auth),
            permission: self
                .permission
                .clone()
                .or_else(|| parent.permission.clone()),
        }
    }
}

/// One declared route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRecord {
    pub path: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
    pub redirect: Option<String>,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(path: &str, name: &str, meta: RouteMeta) -> Self {
        Self {
            path: path.to_owned(),
            name: Some(name.to_owned()),
            meta,
            ..Self::default()
        }
    }

    /// A layout record that only groups children.
    #[must_use]
    pub fn layout(path: &str, meta: RouteMeta, children: Vec<Self>) -> Self {
        Self {
            path: path.to_owned(),
            meta,
            children,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn redirect(path: &str, to: &str) -> Self {
        Self {
            path: path.to_owned(),
            redirect: Some(to.to_owned()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        raw.strip_prefix(':').map_or_else(
            || Self::Static(raw.to_owned()),
            |param| match param.split_once('(') {
                Some((name, _)) => Self::CatchAll(name.to_owned()),
                None => Self::Param(param.to_owned()),
            },
        )
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    segments: Vec<Segment>,
    name: Option<String>,
    meta: RouteMeta,
    redirect: Option<String>,
}

impl CompiledRoute {
    fn is_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    fn matches(&self, path: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut rest = path;
        for segment in &self.segments {
            match segment {
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), rest.join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    let (first, tail) = rest.split_first()?;
                    if *first != expected.as_str() {
                        return None;
                    }
                    rest = tail;
                }
                Segment::Param(name) => {
                    let (first, tail) = rest.split_first()?;
                    params.insert(name.clone(), (*first).to_owned());
                    rest = tail;
                }
            }
        }
        rest.is_empty().then_some(params)
    }
}

/// Metadata of a resolved route after merging along its ancestry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMeta {
    pub title: Option<String>,
    pub requires_auth: bool,
    /// Declared but never enforced by [`RouteTable::guard`].
    pub permission: Option<Permission>,
}

/// Where a path lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    /// Normalized path after following redirects.
    pub path: String,
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
    pub meta: ResolvedMeta,
}

/// Outcome of the navigation guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// Flattened, matchable route list.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    #[must_use]
    pub fn new(records: &[RouteRecord]) -> Self {
        let mut routes = Vec::new();
        for record in records {
            flatten(record, &[], &RouteMeta::default(), &mut routes);
        }
        // Catch-all routes only apply when nothing else matched.
        routes.sort_by_key(CompiledRoute::is_catch_all);
        Self { routes }
    }

    /// Match `path`, following redirect records.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let mut current = normalize(path);
        for _ in 0..MAX_REDIRECTS {
            let segments: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();
            let (route, params) = self
                .routes
                .iter()
                .find_map(|route| route.matches(&segments).map(|params| (route, params)))?;

            if let Some(target) = &route.redirect {
                current = normalize(target);
                continue;
            }

            return Some(ResolvedRoute {
                path: current,
                name: route.name.clone(),
                params,
                meta: ResolvedMeta {
                    title: route.meta.title.clone(),
                    requires_auth: route.meta.requires_auth.unwrap_or(false),
                    permission: route.meta.permission.clone(),
                },
            });
        }
        None
    }

    /// Decide a navigation to `path`.
    ///
    /// Anonymous users are sent to the login page from any route that needs
    /// authentication; signed-in users are sent home from the login and
    /// register pages. Everything else proceeds.
    #[must_use]
    pub fn guard(&self, path: &str, is_logged_in: bool) -> GuardDecision {
        let resolved = self.resolve(path);
        let target = resolved
            .as_ref()
            .map_or_else(|| normalize(path), |route| route.path.clone());
        let requires_auth = resolved
            .as_ref()
            .is_some_and(|route| route.meta.requires_auth);

        if requires_auth && !is_logged_in {
            GuardDecision::Redirect(LOGIN_PATH.to_owned())
        } else if (target == LOGIN_PATH || target == REGISTER_PATH) && is_logged_in {
            GuardDecision::Redirect(HOME_PATH.to_owned())
        } else {
            GuardDecision::Proceed
        }
    }

    /// The product's route table.
    #[must_use]
    pub fn app() -> Self {
        Self::new(&app_routes())
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::app()
    }
}

fn flatten(
    record: &RouteRecord,
    parent_segments: &[Segment],
    parent_meta: &RouteMeta,
    out: &mut Vec<CompiledRoute>,
) {
    let mut segments = if record.path.starts_with('/') {
        Vec::new()
    } else {
        parent_segments.to_vec()
    };
    segments.extend(
        record
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse),
    );
    let meta = record.meta.merged_over(parent_meta);

    if record.children.is_empty() {
        out.push(CompiledRoute {
            segments,
            name: record.name.clone(),
            meta,
            redirect: record.redirect.clone(),
        });
    } else {
        for child in &record.children {
            flatten(child, &segments, &meta, out);
        }
    }
}

/// Strip query, fragment, and duplicate or trailing slashes.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

#[allow(clippy::too_many_lines)]
fn app_routes() -> Vec<RouteRecord> {
    let public = || RouteMeta::default().requires_auth(false);

    vec![
        RouteRecord::new("/login", "Login", public()),
        RouteRecord::new("/register", "Register", public()),
        RouteRecord::layout(
            "/portal",
            public(),
            vec![
                RouteRecord::new("", "PortalHome", RouteMeta::titled("Home")),
                RouteRecord::new("jobs", "PortalJobs", RouteMeta::titled("Jobs")),
                RouteRecord::new("jobs/:id", "PortalJobDetail", RouteMeta::titled("Job details")),
                RouteRecord::new("companies", "PortalCompanies", RouteMeta::titled("Companies")),
                RouteRecord::new("login", "PortalLogin", RouteMeta::titled("Candidate sign in")),
                RouteRecord::new(
                    "register",
                    "PortalRegister",
                    RouteMeta::titled("Candidate sign up"),
                ),
                RouteRecord::new(
                    "my-applications",
                    "MyApplications",
                    RouteMeta::titled("My applications").requires_auth(true),
                ),
                RouteRecord::new(
                    "my-resume",
                    "MyResume",
                    RouteMeta::titled("My resume").requires_auth(true),
                ),
            ],
        ),
        RouteRecord::new(
            "/data-screen",
            "DataScreen",
            RouteMeta::titled("Data screen").requires_auth(true),
        ),
        RouteRecord::layout(
            "/",
            RouteMeta::default().requires_auth(true),
            vec![
                RouteRecord::redirect("", HOME_PATH),
                RouteRecord::new("dashboard", "Dashboard", RouteMeta::titled("Dashboard")),
                RouteRecord::new("talents", "Talents", RouteMeta::titled("Talent management")),
                RouteRecord::new("talents/:id", "TalentDetail", RouteMeta::titled("Talent details")),
                RouteRecord::new("jobs", "Jobs", RouteMeta::titled("Job management")),
                RouteRecord::new("jobs/:id", "JobDetail", RouteMeta::titled("Job details")),
                RouteRecord::new("resumes", "Resumes", RouteMeta::titled("Resume management")),
                RouteRecord::new("recommend", "Recommend", RouteMeta::titled("Recommendations")),
                RouteRecord::new("kanban", "Kanban", RouteMeta::titled("Recruitment board")),
                RouteRecord::new("calendar", "Calendar", RouteMeta::titled("Interview calendar")),
                RouteRecord::new(
                    "interviews/:id",
                    "InterviewDetail",
                    RouteMeta::titled("Interview details"),
                ),
                RouteRecord::new("messages", "Messages", RouteMeta::titled("Message center")),
                RouteRecord::new("profile", "Profile", RouteMeta::titled("My profile")),
                RouteRecord::new(
                    "roles",
                    "RoleManagement",
                    RouteMeta::titled("Permission management").permission(Permission::ROLE_VIEW),
                ),
                RouteRecord::new("reports", "Reports", RouteMeta::titled("Reports")),
                RouteRecord::new("settings", "Settings", RouteMeta::titled("System settings")),
                RouteRecord::new(
                    "logs",
                    "OperationLogs",
                    RouteMeta::titled("Operation logs").permission(Permission::new("log:view")),
                ),
            ],
        ),
        RouteRecord::new("/:pathMatch(.*)*", "NotFound", public()),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_user_is_sent_to_login() {
        let table = RouteTable::app();
        assert_eq!(
            table.guard("/talents", false),
            GuardDecision::Redirect(LOGIN_PATH.into())
        );
        assert_eq!(
            table.guard("/portal/my-resume", false),
            GuardDecision::Redirect(LOGIN_PATH.into())
        );
        assert_eq!(table.guard("/portal/jobs/12", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_signed_in_user_skips_login_pages() {
        let table = RouteTable::app();
        assert_eq!(
            table.guard("/login", true),
            GuardDecision::Redirect(HOME_PATH.into())
        );
        assert_eq!(
            table.guard("/register?next=/jobs", true),
            GuardDecision::Redirect(HOME_PATH.into())
        );
        assert_eq!(table.guard("/portal/login", true), GuardDecision::Proceed);
        assert_eq!(table.guard("/login", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_child_meta_merges_over_parent() {
        let table = RouteTable::app();
        let route = table.resolve("/jobs/42").unwrap();
        assert_eq!(route.name.as_deref(), Some("JobDetail"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
        assert!(route.meta.requires_auth);
        assert_eq!(route.meta.title.as_deref(), Some("Job details"));

        let portal = table.resolve("/portal/jobs/42").unwrap();
        assert_eq!(portal.name.as_deref(), Some("PortalJobDetail"));
        assert!(!portal.meta.requires_auth);
    }

    #[test]
    fn test_root_redirects_home() {
        let table = RouteTable::app();
        let route = table.resolve("/").unwrap();
        assert_eq!(route.path, HOME_PATH);
        assert_eq!(route.name.as_deref(), Some("Dashboard"));
        assert_eq!(table.guard("/", false), GuardDecision::Redirect(LOGIN_PATH.into()));
    }

    #[test]
    fn test_unknown_path_hits_not_found() {
        let table = RouteTable::app();
        let route = table.resolve("/no/such/page").unwrap();
        assert_eq!(route.name.as_deref(), Some("NotFound"));
        assert_eq!(
            route.params.get("pathMatch").map(String::as_str),
            Some("no/such/page")
        );
        assert_eq!(table.guard("/no/such/page", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_route_permission_is_exposed_not_enforced() {
        let table = RouteTable::app();
        let roles = table.resolve("/roles").unwrap();
        assert_eq!(roles.meta.permission, Some(Permission::ROLE_VIEW));
        assert_eq!(table.guard("/roles", true), GuardDecision::Proceed);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("//jobs/"), "/jobs");
        assert_eq!(normalize("/jobs?page=2#top"), "/jobs");
        assert_eq!(normalize(""), "/");
    }
}

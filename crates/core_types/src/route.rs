#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRoute {
    Home,
    Auth,
    Agents,
    KnowledgeBase,
    Actions,
    Profile,
    NotFound,
}

impl AppRoute {
    pub const DASHBOARD: [AppRoute; 4] = [
        AppRoute::Agents,
        AppRoute::KnowledgeBase,
        AppRoute::Actions,
        AppRoute::Profile,
    ];

    /// Maps a location path to a page, following the legacy redirects.
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => AppRoute::Home,
            "/auth" => AppRoute::Auth,
            "/dashboard" | "/dashboard/agents" | "/chat" => AppRoute::Agents,
            "/dashboard/knowledge-base" | "/knowledge-base" => AppRoute::KnowledgeBase,
            "/dashboard/actions" => AppRoute::Actions,
            "/dashboard/profile" => AppRoute::Profile,
            _ => AppRoute::NotFound,
        }
    }

    /// Same as [`AppRoute::resolve`], but dashboard pages bounce to the auth page
    /// without a session.
    pub fn resolve_guarded(path: &str, signed_in: bool) -> Self {
        let route = Self::resolve(path);
        if route.requires_session() && !signed_in {
            AppRoute::Auth
        } else {
            route
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AppRoute::Home => "/",
            AppRoute::Auth => "/auth",
            AppRoute::Agents => "/dashboard/agents",
            AppRoute::KnowledgeBase => "/dashboard/knowledge-base",
            AppRoute::Actions => "/dashboard/actions",
            AppRoute::Profile => "/dashboard/profile",
            AppRoute::NotFound => "/404",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AppRoute::Home => "Home",
            AppRoute::Auth => "Sign In",
            AppRoute::Agents => "Agents",
            AppRoute::KnowledgeBase => "Knowledge Base",
            AppRoute::Actions => "Actions",
            AppRoute::Profile => "Profile",
            AppRoute::NotFound => "Not Found",
        }
    }

    pub fn requires_session(self) -> bool {
        Self::DASHBOARD.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_dashboard_and_legacy_paths() {
        assert_eq!(AppRoute::resolve("/"), AppRoute::Home);
        assert_eq!(AppRoute::resolve("/dashboard"), AppRoute::Agents);
        assert_eq!(AppRoute::resolve("/dashboard/"), AppRoute::Agents);
        assert_eq!(
            AppRoute::resolve("/knowledge-base"),
            AppRoute::KnowledgeBase
        );
        assert_eq!(AppRoute::resolve("/chat"), AppRoute::Agents);
        assert_eq!(
            AppRoute::resolve("/dashboard/profile?tab=security"),
            AppRoute::Profile
        );
        assert_eq!(AppRoute::resolve("/nope"), AppRoute::NotFound);
    }

    #[test]
    fn dashboard_requires_session() {
        assert_eq!(
            AppRoute::resolve_guarded("/dashboard/actions", false),
            AppRoute::Auth
        );
        assert_eq!(
            AppRoute::resolve_guarded("/dashboard/actions", true),
            AppRoute::Actions
        );
        assert_eq!(AppRoute::resolve_guarded("/", false), AppRoute::Home);
    }

    #[test]
    fn paths_resolve_back_to_their_route() {
        for route in AppRoute::DASHBOARD {
            assert_eq!(AppRoute::resolve(route.path()), route);
        }
    }
}

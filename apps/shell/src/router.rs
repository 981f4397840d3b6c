use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, OnceLock},
};

use thiserror::Error;
use tracing::debug;

use crate::views::{AboutView, HomeView, LiteMindView, LoveAppView, View};

pub type ViewFactory = fn() -> Arc<dyn View>;

pub enum ViewLoader {
    Eager(Arc<dyn View>),
    /// Built on first visit, then reused.
    Deferred(ViewFactory),
}

pub struct Route {
    path: &'static str,
    name: &'static str,
    loader: ViewLoader,
    loaded: OnceLock<Arc<dyn View>>,
}

impl Route {
    pub fn eager(path: &'static str, name: &'static str, view: Arc<dyn View>) -> Self {
        Self {
            path,
            name,
            loader: ViewLoader::Eager(view),
            loaded: OnceLock::new(),
        }
    }

    pub fn deferred(path: &'static str, name: &'static str, factory: ViewFactory) -> Self {
        Self {
            path,
            name,
            loader: ViewLoader::Deferred(factory),
            loaded: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.loader, ViewLoader::Deferred(_))
    }

    pub fn is_loaded(&self) -> bool {
        match self.loader {
            ViewLoader::Eager(_) => true,
            ViewLoader::Deferred(_) => self.loaded.get().is_some(),
        }
    }

    pub fn view(&self) -> Arc<dyn View> {
        match &self.loader {
            ViewLoader::Eager(view) => Arc::clone(view),
            ViewLoader::Deferred(factory) => Arc::clone(self.loaded.get_or_init(|| {
                debug!(path = self.path, name = self.name, "router: loading deferred view");
                factory()
            })),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("deferred", &self.is_deferred())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("route path '{0}' must start with '/'")]
    RelativePath(&'static str),
    #[error("duplicate route path '{0}'")]
    DuplicatePath(&'static str),
    #[error("duplicate route name '{0}'")]
    DuplicateName(&'static str),
}

#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        let mut paths = HashSet::new();
        let mut names = HashSet::new();
        for route in &routes {
            if !route.path.starts_with('/') {
                return Err(RouteTableError::RelativePath(route.path));
            }
            if !paths.insert(route.path) {
                return Err(RouteTableError::DuplicatePath(route.path));
            }
            if !names.insert(route.name) {
                return Err(RouteTableError::DuplicateName(route.name));
            }
        }
        Ok(Self { routes })
    }

    pub fn standard() -> Result<Self, RouteTableError> {
        Self::new(standard_routes())
    }

    /// Matches on the path alone: query, fragment and a trailing slash are ignored.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize_path(path);
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    /// A navigation target is either a path or a route name.
    pub fn lookup(&self, target: &str) -> Option<&Route> {
        self.resolve(target).or_else(|| self.by_name(target))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

pub fn standard_routes() -> Vec<Route> {
    vec![
        Route::eager("/", "home", Arc::new(HomeView)),
        Route::deferred("/about", "about", load_about),
        Route::deferred("/love-app", "loveApp", load_love_app),
        Route::deferred("/lite-mind", "liteMind", load_lite_mind),
    ]
}

fn load_about() -> Arc<dyn View> {
    Arc::new(AboutView)
}

fn load_love_app() -> Arc<dyn View> {
    Arc::new(LoveAppView)
}

fn load_lite_mind() -> Arc<dyn View> {
    Arc::new(LiteMindView)
}

fn normalize_path(path: &str) -> &str {
    let path = path
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;

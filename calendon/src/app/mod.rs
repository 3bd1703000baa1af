//! Application plugins and the main loop driving them.
//!
//! Game logic is supplied as one or more [Plugins](Plugin), collected in a [PluginRegistry]. The
//! [Driver](driver::Driver) calls each plugin's hooks at defined points in its lifecycle:
//! * [Plugin::init()] once, before the main loop starts, in registration order.
//! * [Plugin::tick()] once per generated tick.
//! * [Plugin::draw()] once per frame, between the renderer's frame brackets.
//! * [Plugin::shutdown()] once, after the main loop ends, in reverse registration order.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use calendon::app::{Plugin, PluginRegistry};
//!
//! #[derive(Default)]
//! struct Clock {
//!     elapsed: Duration,
//! }
//!
//! impl Plugin for Clock {
//!     fn name(&self) -> &str { "clock" }
//!
//!     fn tick(&mut self, dt: Duration) {
//!         self.elapsed += dt;
//!     }
//! }
//!
//! let mut plugins = PluginRegistry::new();
//! plugins.register(Clock::default()).unwrap();
//! assert!(plugins.register(Clock::default()).is_err());
//! ```

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use crate::render::{RenderError, Renderer};

pub mod driver;

/// Error a plugin can report from [Plugin::init()].
#[derive(Debug)]
pub enum PluginError {
    /// The plugin failed to set up a render resource.
    Render(RenderError),

    /// Some other error occurred.
    Other(Box<dyn Error + Send + Sync + 'static>),
}

impl PluginError {
    /// Convenience method for creating a [PluginError::Other].
    #[inline]
    pub fn from_error(e: impl Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(e))
    }
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(err) => Display::fmt(err, f),
            Self::Other(err) => Display::fmt(err, f),
        }
    }
}

impl Error for PluginError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::Other(err) => Some(err.as_ref()),
        }
    }
}

impl From<RenderError> for PluginError {
    #[inline]
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl<'a> From<&'a str> for PluginError {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self::Other(value.into())
    }
}

impl From<String> for PluginError {
    #[inline]
    fn from(value: String) -> Self {
        Self::Other(value.into())
    }
}

/// User provided game logic.
///
/// Every hook except [name()](Plugin::name) has a default implementation that does nothing.
pub trait Plugin {
    /// Unique name of this plugin, used in logs and errors.
    fn name(&self) -> &str;

    /// Load whatever resources the plugin needs.
    ///
    /// A failure stops the driver before the main loop starts.
    #[allow(unused_variables)]
    fn init(&mut self, renderer: &mut Renderer) -> Result<(), PluginError> { Ok(()) }

    /// Advance by `dt`.
    #[allow(unused_variables)]
    fn tick(&mut self, dt: Duration) {}

    /// Draw the current state into the frame in progress.
    #[allow(unused_variables)]
    fn draw(&mut self, renderer: &mut Renderer) -> Result<(), RenderError> { Ok(()) }

    fn shutdown(&mut self) {}
}

impl Debug for dyn Plugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// A plugin with the same name is already registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePluginError {
    pub name: String,
}

impl Display for DuplicatePluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plugin already registered: '{}'", self.name)
    }
}

impl Error for DuplicatePluginError {}

/// Ordered collection of uniquely named plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin after all previously registered ones.
    ///
    /// # Errors
    ///
    /// Errors if a plugin with the same [name](Plugin::name) is already registered.
    pub fn register(&mut self, plugin: impl Plugin + 'static) -> Result<(), DuplicatePluginError> {
        self.register_boxed(Box::new(plugin))
    }

    /// Register an already boxed plugin.
    ///
    /// See [register()](Self::register).
    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) -> Result<(), DuplicatePluginError> {
        if self.get(plugin.name()).is_some() {
            return Err(DuplicatePluginError { name: plugin.name().to_owned() })
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Find a plugin by name.
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.iter()
            .find(|plugin| plugin.name() == name)
            .map(|plugin| plugin.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize { self.plugins.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.plugins.is_empty() }

    /// Names of all plugins, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.plugins.iter().map(|plugin| plugin.name())
    }

    #[inline]
    pub(crate) fn plugins_mut(&mut self) -> &mut [Box<dyn Plugin>] {
        &mut self.plugins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str { self.0 }
    }

    #[test]
    fn test_register() {
        let mut registry = PluginRegistry::new();
        assert!(registry.is_empty());
        registry.register(Named("menu")).unwrap();
        registry.register(Named("game")).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["menu", "game"]);
        assert_eq!(registry.get("game").map(|p| p.name()), Some("game"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = PluginRegistry::new();
        registry.register(Named("game")).unwrap();
        assert_eq!(
            registry.register(Named("game")),
            Err(DuplicatePluginError { name: "game".to_owned() }),
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_plugin_error() {
        let err = PluginError::from("no save file");
        assert_eq!(err.to_string(), "no save file");
        assert!(err.source().is_some());

        let err = PluginError::from(RenderError::UnsupportedTextLayout);
        assert_matches!(err, PluginError::Render(RenderError::UnsupportedTextLayout));
    }
}

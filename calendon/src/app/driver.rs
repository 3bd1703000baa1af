//! The main loop.
//!
//! A [Driver] owns the [Renderer] and the registered [Plugins](Plugin), and runs them until the
//! configured tick limit is reached or an [ExitHandle] asks it to stop. Build one with
//! [Driver::builder()].
//!
//! ```no_run
//! use calendon::app::driver::{Driver, DriverConfig};
//! # use calendon::app::Plugin;
//! # use calendon::render::Renderer;
//! # fn make_renderer() -> Renderer { unimplemented!() }
//! # struct Game;
//! # impl Plugin for Game { fn name(&self) -> &str { "game" } }
//!
//! let driver = Driver::builder()
//!     .renderer(make_renderer())
//!     .plugin(Game)
//!     .config(DriverConfig { tick_limit: 600, ..Default::default() })
//!     .build()?;
//! let exit = driver.exit_handle();
//! // Hand `exit` to whatever should be able to stop the game, then:
//! driver.run()?;
//! # Ok::<(), calendon::app::driver::DriverError>(())
//! ```

use parking_lot::{Condvar, Mutex};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::app::{DuplicatePluginError, Plugin, PluginError, PluginRegistry};
use crate::log::TARGET_MAIN;
use crate::render::{RenderError, Renderer};
use crate::util::tick_loop::{TickClock, TickLimit, DEFAULT_MAX_TICK, DEFAULT_MIN_TICK};

/// [Driver] configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Stop after this many completed ticks. 0 runs until exit is requested.
    pub tick_limit: u64,

    /// Shortest tick to generate.
    pub min_tick: Duration,

    /// Ticks longer than this are dropped.
    pub max_tick: Duration,

    /// How long to wait when no tick was generated before trying again.
    pub idle_sleep: Duration,

    #[doc(hidden)]
    pub _ne: crate::NonExhaustive,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_limit: 0,
            min_tick: DEFAULT_MIN_TICK,
            max_tick: DEFAULT_MAX_TICK,
            idle_sleep: Duration::from_millis(1),
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Shared flag asking a [Driver] to stop.
///
/// Cloning yields a handle to the same flag. A driver waiting between ticks wakes up as soon as exit
/// is requested.
#[derive(Debug, Clone, Default)]
pub struct ExitHandle {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ExitHandle {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the driver to stop after its current iteration.
    pub fn request_exit(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn is_exit_requested(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block for up to `timeout`, returning early if exit is requested.
    ///
    /// Yields whether exit has been requested.
    fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut requested = lock.lock();
        if !*requested && !timeout.is_zero() {
            cvar.wait_for(&mut requested, timeout);
        }
        *requested
    }
}

/// Error that can occur while building or running a [Driver].
#[derive(Debug)]
pub enum DriverError {
    /// A required option was not specified.
    MissingOption { name: String },

    DuplicatePlugin(DuplicatePluginError),

    /// A plugin's [init()](Plugin::init) failed.
    PluginInit { name: String, source: PluginError },

    Render(RenderError),
}

impl DriverError {
    fn missing_option(name: impl Into<String>) -> Self {
        Self::MissingOption { name: name.into() }
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOption { name } => write!(f, "Missing required option: '{name}'"),
            Self::DuplicatePlugin(err) => Display::fmt(err, f),
            Self::PluginInit { name, source } =>
                write!(f, "Plugin '{name}' failed to initialize: {source}"),
            Self::Render(err) => Display::fmt(err, f),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DuplicatePlugin(err) => Some(err),
            Self::PluginInit { source, .. } => Some(source),
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RenderError> for DriverError {
    #[inline]
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<DuplicatePluginError> for DriverError {
    #[inline]
    fn from(value: DuplicatePluginError) -> Self {
        Self::DuplicatePlugin(value)
    }
}

/// Runs plugins against a renderer.
#[derive(Debug)]
pub struct Driver {
    renderer: Renderer,
    plugins: PluginRegistry,
    config: DriverConfig,
    exit: ExitHandle,
}

impl Driver {
    #[inline]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &DriverConfig { &self.config }

    #[inline]
    pub fn renderer(&self) -> &Renderer { &self.renderer }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut Renderer { &mut self.renderer }

    #[inline]
    pub fn plugins(&self) -> &PluginRegistry { &self.plugins }

    /// Handle that stops this driver when exit is requested.
    #[inline]
    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    /// Run every plugin to completion, then shut everything down.
    ///
    /// Yields the number of completed ticks.
    ///
    /// # Errors
    ///
    /// Errors if a plugin fails to initialize, or if rendering fails. Plugins that were initialized
    /// and the renderer are shut down either way.
    pub fn run(mut self) -> Result<u64, DriverError> {
        info!(
            target: TARGET_MAIN,
            plugins = self.plugins.len(),
            tick_limit = self.config.tick_limit,
            "Driver starting",
        );

        let mut initialized = 0;
        let result = self.init_plugins(&mut initialized)
            .and_then(|_| self.main_loop());

        for plugin in self.plugins.plugins_mut()[..initialized].iter_mut().rev() {
            debug!(target: TARGET_MAIN, plugin = plugin.name(), "Shutting down plugin");
            plugin.shutdown();
        }
        let shutdown = self.renderer.shutdown();

        match (result, shutdown) {
            (Ok(ticks), Ok(())) => {
                info!(target: TARGET_MAIN, ticks, "Driver stopped");
                Ok(ticks)
            },
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), shutdown) => {
                if let Err(shutdown_err) = shutdown {
                    warn!(target: TARGET_MAIN, error = %shutdown_err, "Renderer shutdown failed");
                }
                error!(target: TARGET_MAIN, error = %err, "Driver stopped");
                Err(err)
            },
        }
    }

    fn init_plugins(&mut self, initialized: &mut usize) -> Result<(), DriverError> {
        for plugin in self.plugins.plugins_mut() {
            plugin.init(&mut self.renderer)
                .map_err(|source| DriverError::PluginInit { name: plugin.name().to_owned(), source })?;
            debug!(target: TARGET_MAIN, plugin = plugin.name(), "Initialized plugin");
            *initialized += 1;
        }
        Ok(())
    }

    fn main_loop(&mut self) -> Result<u64, DriverError> {
        let mut clock = TickClock::with_bounds(Instant::now(), self.config.min_tick, self.config.max_tick);
        let mut limit = TickLimit::new(self.config.tick_limit);

        while !self.exit.is_exit_requested() && !limit.is_reached() {
            match clock.generate(Instant::now()) {
                Some(dt) => {
                    for plugin in self.plugins.plugins_mut() {
                        plugin.tick(dt);
                    }
                    limit.tick_completed();
                },
                None => {
                    if self.exit.wait(self.config.idle_sleep) {
                        break
                    }
                },
            }
            self.draw_frame()?;
        }

        Ok(limit.completed())
    }

    fn draw_frame(&mut self) -> Result<(), DriverError> {
        let renderer = &mut self.renderer;
        renderer.start_frame()?;
        renderer.clear(renderer.config().clear_color);
        for plugin in self.plugins.plugins_mut() {
            plugin.draw(renderer)?;
        }
        renderer.end_frame()?;
        Ok(())
    }
}

/// Builder pattern for [Drivers](Driver).
#[derive(Debug, Default)]
pub struct DriverBuilder {
    renderer: Option<Renderer>,
    plugins: Vec<Box<dyn Plugin>>,
    config: Option<DriverConfig>,
    exit: Option<ExitHandle>,
}

impl DriverBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The renderer plugins draw with.
    ///
    /// This is a required option.
    #[inline]
    pub fn renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Register a plugin, after any previously added ones.
    #[inline]
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Defaults to [DriverConfig::default()].
    #[inline]
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing exit handle, so it can be handed out before the driver is built.
    #[inline]
    pub fn exit_handle(mut self, exit: ExitHandle) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Build the [Driver].
    ///
    /// # Errors
    ///
    /// Errors if no renderer was given, or if two plugins share a name.
    pub fn build(self) -> Result<Driver, DriverError> {
        let renderer = self.renderer
            .ok_or(DriverError::missing_option("renderer"))?;
        let mut plugins = PluginRegistry::new();
        for plugin in self.plugins {
            plugins.register_boxed(plugin)?;
        }

        Ok(Driver {
            renderer,
            plugins,
            config: self.config.unwrap_or_default(),
            exit: self.exit.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use test_log::test as test_log;

    use crate::render::device::tests::{Call, RecordingDevice};
    use crate::render::device::Primitive;
    use crate::render::RendererConfig;
    use crate::resource::source::constant::ConstantAssetSource;

    type Events = Arc<Mutex<Vec<String>>>;

    fn renderer() -> (Renderer, RecordingDevice) {
        let device = RecordingDevice::new(640, 480);
        let renderer = Renderer::new(
            Box::new(device.clone()),
            Box::new(device.clone()),
            ConstantAssetSource::default(),
            RendererConfig::default(),
        ).unwrap();
        (renderer, device)
    }

    fn fast_config(tick_limit: u64) -> DriverConfig {
        DriverConfig {
            tick_limit,
            min_tick: Duration::ZERO,
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        events: Events,
        fail_init: bool,
        draw_unloaded_sprite: bool,
        exit_on_tick: Option<ExitHandle>,
    }

    impl Recorder {
        fn new(name: &'static str, events: &Events) -> Self {
            Self { name, events: events.clone(), ..Default::default() }
        }

        fn log(&self, event: &str) {
            self.events.lock().push(format!("{} {event}", self.name));
        }
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str { self.name }

        fn init(&mut self, _renderer: &mut Renderer) -> Result<(), PluginError> {
            self.log("init");
            if self.fail_init {
                Err("no assets".into())
            } else {
                Ok(())
            }
        }

        fn tick(&mut self, _dt: Duration) {
            self.log("tick");
            if let Some(exit) = &self.exit_on_tick {
                exit.request_exit();
            }
        }

        fn draw(&mut self, renderer: &mut Renderer) -> Result<(), RenderError> {
            self.log("draw");
            if self.draw_unloaded_sprite {
                let sprite = renderer.create_sprite()?;
                renderer.draw_sprite(sprite, glm::Vec2::zeros(), glm::vec2(1.0, 1.0))?;
            }
            Ok(())
        }

        fn shutdown(&mut self) {
            self.log("shutdown");
        }
    }

    #[test]
    fn test_missing_renderer() {
        assert_matches!(
            Driver::builder().build(),
            Err(DriverError::MissingOption { name }) if name == "renderer"
        );
    }

    #[test_log]
    fn test_duplicate_plugins() {
        let events = Events::default();
        let result = Driver::builder()
            .renderer(renderer().0)
            .plugin(Recorder::new("game", &events))
            .plugin(Recorder::new("game", &events))
            .build();
        assert_matches!(result, Err(DriverError::DuplicatePlugin(DuplicatePluginError { name })) if name == "game");
    }

    #[test_log]
    fn test_run_to_tick_limit() {
        let events = Events::default();
        let (renderer, device) = renderer();
        let driver = Driver::builder()
            .renderer(renderer)
            .plugin(Recorder::new("a", &events))
            .plugin(Recorder::new("b", &events))
            .config(fast_config(2))
            .build()
            .unwrap();

        assert_eq!(driver.run().unwrap(), 2);
        assert_eq!(*events.lock(), vec![
            "a init", "b init",
            "a tick", "b tick", "a draw", "b draw",
            "a tick", "b tick", "a draw", "b draw",
            "b shutdown", "a shutdown",
        ]);

        let state = device.state.lock();
        let frames = state.calls.iter().filter(|c| **c == Call::SwapBuffers).count();
        assert_eq!(frames, 2);
        let clears = state.calls.iter().filter(|c| **c == Call::Clear).count();
        assert_eq!(clears, 2);
        assert!(matches!(state.calls.last(), Some(Call::DeleteVertexArray(_))));
    }

    #[test_log]
    fn test_plugin_init_failure() {
        let events = Events::default();
        let (renderer, device) = renderer();
        let driver = Driver::builder()
            .renderer(renderer)
            .plugin(Recorder::new("a", &events))
            .plugin(Recorder { fail_init: true, ..Recorder::new("b", &events) })
            .plugin(Recorder::new("c", &events))
            .config(fast_config(10))
            .build()
            .unwrap();

        assert_matches!(
            driver.run(),
            Err(DriverError::PluginInit { name, source: PluginError::Other(_) }) if name == "b"
        );
        assert_eq!(*events.lock(), vec!["a init", "b init", "a shutdown"]);
        assert!(!device.state.lock().calls.contains(&Call::SwapBuffers));
    }

    #[test_log]
    fn test_exit_requested_by_plugin() {
        let events = Events::default();
        let exit = ExitHandle::new();
        let (renderer, _) = renderer();
        let driver = Driver::builder()
            .renderer(renderer)
            .plugin(Recorder { exit_on_tick: Some(exit.clone()), ..Recorder::new("a", &events) })
            .config(fast_config(0))
            .exit_handle(exit.clone())
            .build()
            .unwrap();

        assert_eq!(driver.run().unwrap(), 1);
        assert!(exit.is_exit_requested());
        assert_eq!(*events.lock(), vec!["a init", "a tick", "a draw", "a shutdown"]);
    }

    #[test_log]
    fn test_exit_before_run() {
        let (renderer, device) = renderer();
        let driver = Driver::builder()
            .renderer(renderer)
            .build()
            .unwrap();
        driver.exit_handle().request_exit();
        assert_eq!(driver.run().unwrap(), 0);
        assert_eq!(device.state.lock().draws(), Vec::<(Primitive, u32, u32)>::new());
    }

    #[test_log]
    fn test_draw_error_stops_driver() {
        let events = Events::default();
        let (renderer, _) = renderer();
        let driver = Driver::builder()
            .renderer(renderer)
            .plugin(Recorder { draw_unloaded_sprite: true, ..Recorder::new("a", &events) })
            .config(fast_config(5))
            .build()
            .unwrap();

        assert_matches!(driver.run(), Err(DriverError::Render(RenderError::SpriteNotLoaded(_))));
        assert_eq!(*events.lock(), vec!["a init", "a tick", "a draw", "a shutdown"]);
    }

    #[rstest]
    #[case::zero(Duration::ZERO)]
    #[case::short(Duration::from_millis(1))]
    fn test_exit_wait(#[case] timeout: Duration) {
        let exit = ExitHandle::new();
        assert!(!exit.wait(timeout));
        exit.clone().request_exit();
        assert!(exit.wait(Duration::from_secs(60)));
    }

    #[test]
    fn test_exit_wakes_waiter() {
        let exit = ExitHandle::new();
        let waiter = exit.clone();
        let thread = std::thread::spawn(move || waiter.wait(Duration::from_secs(60)));
        exit.request_exit();
        assert!(thread.join().unwrap());
    }
}

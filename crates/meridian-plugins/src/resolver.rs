//! Plugin set resolution
//!
//! Turns the caller's plugin definitions plus configuration into the final,
//! ordered plugin list, installing built-in defaults the caller did not
//! provide.

use crate::builtin::{
    CacheControlPlugin, DefaultLandingPagePlugin, DisallowGetMutationsPlugin, InlineTracePlugin,
    SchemaReportingPlugin, UsageReportingPlugin,
};
use crate::plugin::{InternalPluginKind, Plugin, PluginDefinition, Token};
use meridian_config::{Config, Environment};
use meridian_core::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// A resolved plugin and how it got installed
#[derive(Clone)]
pub struct PluginRegistration {
    /// The plugin
    pub plugin: Arc<dyn Plugin>,

    /// `true` when installed as a default rather than by the caller
    pub implicitly_installed: bool,
}

impl PluginRegistration {
    /// Registration for a caller-supplied plugin
    pub fn explicit(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            implicitly_installed: false,
        }
    }

    /// Registration for a default plugin
    pub fn implicit(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            implicitly_installed: true,
        }
    }

    /// Plugin name
    pub fn name(&self) -> &str {
        self.plugin.name()
    }
}

impl fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("plugin", &self.plugin.name())
            .field("implicitly_installed", &self.implicitly_installed)
            .finish()
    }
}

fn has_plugin(registrations: &[PluginRegistration], kind: InternalPluginKind) -> bool {
    registrations
        .iter()
        .any(|r| r.plugin.internal_id(Token).map(|id| id.kind()) == Some(kind))
}

fn install(registrations: &mut Vec<PluginRegistration>, index: usize, plugin: Arc<dyn Plugin>) {
    tracing::debug!(plugin = %plugin.name(), "Installing default plugin");
    registrations.insert(index, PluginRegistration::implicit(plugin));
}

/// Resolve the final ordered plugin list.
///
/// Factories are invoked exactly once. Fails only when schema reporting is
/// enabled without a reporting key.
pub fn resolve_plugins(
    definitions: Vec<PluginDefinition>,
    config: &Config,
) -> Result<Vec<PluginRegistration>> {
    let mut registrations: Vec<PluginRegistration> = definitions
        .into_iter()
        .map(|definition| PluginRegistration::explicit(definition.into_plugin()))
        .collect();

    if !has_plugin(&registrations, InternalPluginKind::CacheControl) {
        let end = registrations.len();
        install(
            &mut registrations,
            end,
            Arc::new(CacheControlPlugin::from_config(&config.cache_control)),
        );
    }

    let reporting = &config.reporting;
    if !has_plugin(&registrations, InternalPluginKind::UsageReporting) && reporting.key.is_some() {
        match &reporting.graph_ref {
            Some(graph_ref) => install(
                &mut registrations,
                0,
                Arc::new(UsageReportingPlugin::new(
                    graph_ref.clone(),
                    reporting.report_interval,
                )),
            ),
            None => tracing::warn!(
                "A reporting key is configured but no graph ref is set; usage reporting is disabled. \
                 Set reporting.graph_ref or MERIDIAN_GRAPH_REF to enable it"
            ),
        }
    }

    if !has_plugin(&registrations, InternalPluginKind::SchemaReporting) && reporting.schema_reporting
    {
        if reporting.key.is_none() {
            return Err(Error::Config(
                "Schema reporting is enabled but no reporting key is configured; \
                 set reporting.key or MERIDIAN_KEY, or disable schema reporting"
                    .to_string(),
            ));
        }
        let end = registrations.len();
        install(
            &mut registrations,
            end,
            Arc::new(SchemaReportingPlugin::new(reporting.graph_ref.clone())),
        );
    }

    if !has_plugin(&registrations, InternalPluginKind::InlineTrace) {
        let end = registrations.len();
        install(
            &mut registrations,
            end,
            Arc::new(InlineTracePlugin::federated_only()),
        );
    }

    if !has_plugin(&registrations, InternalPluginKind::LandingPageDisabled) {
        let page = match config.server.environment {
            Environment::Development => DefaultLandingPagePlugin::local(),
            Environment::Production | Environment::Test => DefaultLandingPagePlugin::production(),
        };
        let page = match &reporting.graph_ref {
            Some(graph_ref) => page.graph_ref(graph_ref.clone()),
            None => page,
        };
        let end = registrations.len();
        install(&mut registrations, end, Arc::new(page));
    }

    // usage reporting keeps the first slot so it wraps every other plugin
    let leads_with_usage = registrations
        .first()
        .and_then(|r| r.plugin.internal_id(Token))
        .map(|id| id.kind())
        == Some(InternalPluginKind::UsageReporting);
    install(
        &mut registrations,
        usize::from(leads_with_usage),
        Arc::new(DisallowGetMutationsPlugin::new()),
    );

    tracing::debug!(
        plugins = ?registrations.iter().map(PluginRegistration::name).collect::<Vec<_>>(),
        "Resolved plugins"
    );

    Ok(registrations)
}

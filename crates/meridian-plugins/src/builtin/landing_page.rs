//! Default landing pages

use crate::context::ServerStartContext;
use crate::error::Result;
use crate::listener::ServerListener;
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use meridian_core::LandingPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Local,
    Production,
}

/// Serves a static landing page at the GraphQL endpoint
#[derive(Debug, Clone)]
pub struct DefaultLandingPagePlugin {
    flavor: Flavor,
    graph_ref: Option<String>,
}

impl DefaultLandingPagePlugin {
    /// Interactive page for local development
    pub fn local() -> Self {
        Self {
            flavor: Flavor::Local,
            graph_ref: None,
        }
    }

    /// Minimal page for deployed servers
    pub fn production() -> Self {
        Self {
            flavor: Flavor::Production,
            graph_ref: None,
        }
    }

    /// Mention a graph reference on the page
    pub fn graph_ref(mut self, graph_ref: impl Into<String>) -> Self {
        self.graph_ref = Some(graph_ref.into());
        self
    }

    fn render(&self) -> LandingPage {
        let graph = self
            .graph_ref
            .as_deref()
            .map(|g| format!("<p>Graph: <code>{}</code></p>", escape(g)))
            .unwrap_or_default();

        let body = match self.flavor {
            Flavor::Local => format!(
                "<h1>Meridian</h1><p>Your server is running locally. Send a query with <code>POST</code> to this URL to explore it.</p>{graph}"
            ),
            Flavor::Production => format!(
                "<h1>Meridian</h1><p>This GraphQL server is running.</p>{graph}"
            ),
        };

        LandingPage::Html(format!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Meridian</title></head><body>{body}</body></html>"
        ))
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Plugin for DefaultLandingPagePlugin {
    fn name(&self) -> &str {
        match self.flavor {
            Flavor::Local => "landing-page-local",
            Flavor::Production => "landing-page-production",
        }
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::LandingPage))
    }

    async fn server_will_start(&self, _ctx: &ServerStartContext) -> Result<Option<ServerListener>> {
        let page = self.render();
        Ok(Some(ServerListener::new().with_landing_page(move || {
            let page = page.clone();
            async move { Ok(page) }
        })))
    }
}

/// Turns the landing page off
#[derive(Debug, Default, Clone, Copy)]
pub struct LandingPageDisabledPlugin;

impl LandingPageDisabledPlugin {
    /// Create the plugin
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for LandingPageDisabledPlugin {
    fn name(&self) -> &str {
        "landing-page-disabled"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::LandingPageDisabled))
    }
}

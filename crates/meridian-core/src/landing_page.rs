//! Landing page artifact

/// What the transport serves to a browser visiting the GraphQL endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingPage {
    /// Inline HTML document
    Html(String),
    /// Redirect to another URL
    Redirect(String),
}

impl LandingPage {
    /// HTML body, if this is an inline page
    pub fn html(&self) -> Option<&str> {
        match self {
            LandingPage::Html(html) => Some(html),
            LandingPage::Redirect(_) => None,
        }
    }
}

//! Per-operation identity and audit data for the patch pipeline

use crate::settings::Settings;
use folio_core_types::{RequestContext, Sensitive};

/// Who is saving, and why
///
/// Provenance fields of saved resources come from here, never from the
/// blueprint.
#[derive(Debug, Clone, Default)]
pub struct SaveContext {
    pub author_username: String,
    pub author_full_absolute_url: String,
    pub author_ip_address: Sensitive<String>,
    pub log_message: String,
    pub request: RequestContext,
}

impl SaveContext {
    /// Context for one incoming request
    ///
    /// `user` is the authenticated username and its profile path, if any.
    pub fn for_request(
        settings: &Settings,
        user: Option<(&str, &str)>,
        remote_addr: &str,
        log_message: &str,
    ) -> Self {
        let mut ctx = SaveContext {
            author_ip_address: Sensitive::new(remote_addr.to_string()),
            log_message: log_message.to_string(),
            ..Default::default()
        };
        if let Some((username, user_path)) = user {
            ctx.author_username = username.to_string();
            if let Some(domain) = settings.site_domain.as_deref().filter(|d| !d.is_empty()) {
                ctx.author_full_absolute_url = format!("http://{}{}", domain, user_path);
            }
        }
        ctx
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    /// Username, or the remote address for anonymous saves
    pub fn author_name(&self) -> &str {
        if self.author_username.is_empty() {
            self.author_ip_address.expose()
        } else {
            &self.author_username
        }
    }
}

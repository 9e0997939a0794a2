use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Uri;

use crate::carousel::{CarouselItem, CarouselItems};
use crate::config::SiteConfig;
use crate::templates::CompiledTemplate;

/// Which route matched and what it captured.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub route: &'static str,
    pub params: HashMap<String, String>,
    pub uri: Uri,
}

impl Dispatch {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Captured segment with its `.html` suffix removed; `None` when the
    /// parameter is absent, lacks the suffix, or is empty without it.
    pub fn page_param(&self, key: &str) -> Option<&str> {
        self.param(key)?
            .strip_suffix(".html")
            .filter(|stem| !stem.is_empty())
    }
}

/// Everything a render function gets for one request.
#[derive(Debug)]
pub struct RequestContext {
    pub dispatch: Dispatch,
    pub template: Arc<CompiledTemplate>,
    pub config: Arc<SiteConfig>,
    pub carousel: Option<CarouselItems>,
}

impl RequestContext {
    pub fn build(
        dispatch: Dispatch,
        template: Arc<CompiledTemplate>,
        config: Arc<SiteConfig>,
        carousel: Option<CarouselItems>,
    ) -> Self {
        Self {
            dispatch,
            template,
            config,
            carousel,
        }
    }

    pub fn carousel(&self) -> &[CarouselItem] {
        self.carousel.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(params: &[(&str, &str)]) -> Dispatch {
        Dispatch {
            route: "/gallery/{gallery}",
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            uri: Uri::from_static("/gallery/paris.html"),
        }
    }

    #[test]
    fn page_param_strips_html_suffix() {
        let d = dispatch(&[("gallery", "paris.html"), ("bare", "paris"), ("empty", ".html")]);
        assert_eq!(d.page_param("gallery"), Some("paris"));
        assert_eq!(d.param("gallery"), Some("paris.html"));
        assert_eq!(d.page_param("bare"), None);
        assert_eq!(d.page_param("empty"), None);
        assert_eq!(d.page_param("missing"), None);
    }
}

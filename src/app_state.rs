use std::sync::Arc;

use crate::carousel::CarouselProvider;
use crate::catalog::GalleryCatalog;
use crate::config::SiteConfig;
use crate::templates::TemplateCache;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub templates: Arc<TemplateCache>,
    pub catalog: Arc<GalleryCatalog>,
    pub carousel: Arc<CarouselProvider>,
    // logging options
    pub log_requests: bool,
}

impl AppState {
    pub fn from_config(config: SiteConfig) -> Self {
        let templates = TemplateCache::new(config.templates_dir());
        let catalog = GalleryCatalog::new(config.galleries_dir(), config.galleries_manifest());
        let carousel = CarouselProvider::new(config.carousel_manifest(), config.carousel_ttl());
        Self {
            log_requests: config.log_requests,
            config: Arc::new(config),
            templates: Arc::new(templates),
            catalog: Arc::new(catalog),
            carousel: Arc::new(carousel),
        }
    }
}

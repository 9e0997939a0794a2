//! Render functions for the site's dynamic pages.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::carousel::CarouselItem;
use crate::catalog::{Gallery, GalleryCatalog};
use crate::context::RequestContext;
use crate::errors::PageError;

/// Page-specific logic bound to a route by the registry.
pub trait RenderPage: Clone + Send + Sync + 'static {
    /// Whether the handler should load carousel items into the context.
    fn needs_carousel(&self) -> bool {
        true
    }

    fn render(
        &self,
        ctx: RequestContext,
        catalog: Arc<GalleryCatalog>,
    ) -> impl Future<Output = Result<String, PageError>> + Send;
}

/// View-model handed to a template: fields common to every page plus the
/// page's own fields at the top level.
#[derive(Debug, Serialize)]
pub struct PageParams<'a, T> {
    /// Name of the page (`home.html` -> `"home"`).
    pub name: &'a str,
    pub title: &'a str,
    pub carousel: &'a [CarouselItem],
    #[serde(flatten)]
    pub page: T,
}

impl<'a, T: Serialize> PageParams<'a, T> {
    pub fn new(name: &'a str, ctx: &'a RequestContext, page: T) -> Self {
        Self {
            name,
            title: &ctx.config.site_title,
            carousel: ctx.carousel(),
            page,
        }
    }

    fn render(&self, ctx: &RequestContext) -> Result<String, PageError> {
        Ok(ctx.template.render(self)?)
    }
}

#[derive(Debug, Serialize)]
pub struct HomeFields {}

#[derive(Debug, Serialize)]
pub struct GalleriesFields {
    pub galleries: Vec<Gallery>,
}

#[derive(Debug, Serialize)]
pub struct GalleryFields {
    pub gallery: String,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageFields {
    pub gallery: String,
    /// Image file name, relative to the gallery directory.
    pub path: String,
}

#[derive(Debug, Clone, Copy)]
pub struct HomePage;

impl RenderPage for HomePage {
    async fn render(
        &self,
        ctx: RequestContext,
        _catalog: Arc<GalleryCatalog>,
    ) -> Result<String, PageError> {
        PageParams::new("home", &ctx, HomeFields {}).render(&ctx)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GalleriesPage;

impl RenderPage for GalleriesPage {
    async fn render(
        &self,
        ctx: RequestContext,
        catalog: Arc<GalleryCatalog>,
    ) -> Result<String, PageError> {
        let galleries = catalog.list_galleries().await;
        PageParams::new("galleries", &ctx, GalleriesFields { galleries }).render(&ctx)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GalleryPage;

impl RenderPage for GalleryPage {
    async fn render(
        &self,
        ctx: RequestContext,
        catalog: Arc<GalleryCatalog>,
    ) -> Result<String, PageError> {
        let gallery = ctx
            .dispatch
            .page_param("gallery")
            .ok_or(PageError::NotFound)?
            .to_string();
        let images = catalog.list_images(&gallery).await;
        PageParams::new("gallery", &ctx, GalleryFields { gallery, images }).render(&ctx)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePage;

impl RenderPage for ImagePage {
    async fn render(
        &self,
        ctx: RequestContext,
        _catalog: Arc<GalleryCatalog>,
    ) -> Result<String, PageError> {
        let gallery = ctx.dispatch.param("gallery").ok_or(PageError::NotFound)?;
        let path = ctx.dispatch.page_param("image").ok_or(PageError::NotFound)?;
        let fields = ImageFields {
            gallery: gallery.to_string(),
            path: path.to_string(),
        };
        PageParams::new("image", &ctx, fields).render(&ctx)
    }
}

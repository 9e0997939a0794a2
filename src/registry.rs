//! Binds routes to (render function, template name) pairs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path as AxPath, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tracing::{debug, error, info};

use crate::app_state::AppState;
use crate::config::TemplatePolicy;
use crate::context::{Dispatch, RequestContext};
use crate::errors::{PageError, TemplateError};
use crate::pages::RenderPage;
use crate::{http_error, http_not_found};

pub struct PageRegistry {
    state: AppState,
    policy: TemplatePolicy,
    router: Router<AppState>,
}

impl PageRegistry {
    pub fn new(state: AppState) -> Self {
        Self {
            policy: state.config.template_policy,
            state,
            router: Router::new(),
        }
    }

    /// Serve `page` on `GET route`, rendering through the template `template`.
    ///
    /// Under the eager policy the template is compiled here and a failure is
    /// returned to the caller; under the lazy policy compilation waits for
    /// the first request.
    pub async fn register<P: RenderPage>(
        mut self,
        route: &'static str,
        page: P,
        template: &str,
    ) -> Result<Self, TemplateError> {
        if self.policy == TemplatePolicy::Eager {
            self.state.templates.resolve(template).await?;
        }
        info!(target: "photo_site", "route {route} -> template {template}");
        let template: Arc<str> = Arc::from(template);
        let handler = move |State(state): State<AppState>,
                            params: Option<AxPath<HashMap<String, String>>>,
                            uri: Uri| {
            let page = page.clone();
            let template = template.clone();
            async move {
                let dispatch = Dispatch {
                    route,
                    params: params.map(|AxPath(p)| p).unwrap_or_default(),
                    uri,
                };
                serve_page(&state, &page, &template, dispatch).await
            }
        };
        self.router = self.router.route(route, get(handler));
        Ok(self)
    }

    pub fn into_router(self) -> Router<AppState> {
        self.router
    }
}

async fn serve_page<P: RenderPage>(
    state: &AppState,
    page: &P,
    template: &str,
    dispatch: Dispatch,
) -> Response {
    let route = dispatch.route;
    let compiled = match state.templates.resolve(template).await {
        Ok(compiled) => {
            debug!(target: "photo_site", "serving template {} for {}", compiled.name(), dispatch.uri);
            compiled
        }
        Err(e) => {
            error!(target: "photo_site", "route {route}: {e}");
            return http_error(StatusCode::INTERNAL_SERVER_ERROR, "Template unavailable");
        }
    };
    let carousel = if page.needs_carousel() {
        Some(state.carousel.load().await)
    } else {
        None
    };
    let ctx = RequestContext::build(dispatch, compiled, state.config.clone(), carousel);
    // Rendered into a buffer first so a failing template never leaves a
    // half-written 200 behind.
    match page.render(ctx, state.catalog.clone()).await {
        Ok(html) => Html(html).into_response(),
        Err(PageError::NotFound) => http_not_found("Page not found"),
        Err(PageError::Template(e)) => {
            error!(target: "photo_site", "route {route}: {e}");
            http_error(StatusCode::INTERNAL_SERVER_ERROR, "Rendering failed")
        }
    }
}

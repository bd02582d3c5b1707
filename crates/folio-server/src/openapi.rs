use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        version = "0.1.0",
        description = "Trigger catalog crawls and follow their progress."
    ),
    paths(
        crate::routes::create_crawl_job,
        crate::routes::list_crawl_jobs,
        crate::routes::get_crawl_job,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateCrawlJobRequest,
        crate::dto::CreateCrawlJobResponse,
        crate::dto::CrawlJobResponse,
        crate::dto::CrawlJobListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "crawl-jobs", description = "Crawl job lifecycle"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "API key. Set via FOLIO_SERVER_API_KEY; unset leaves the API open.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

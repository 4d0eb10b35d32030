use std::fs;
use std::path::Path;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Memdash API",
        version = "0.1.0",
        description = "Self-hosted operational dashboard for memcached instances",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
        contact(
            name = "Memdash Contributors",
            url = "https://github.com/memdash/memdash"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
        (url = "/", description = "Current server")
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::ready,
        crate::api::handlers::get_dashboard,
        crate::api::handlers::list_servers,
        crate::api::handlers::execute_action,
    ),
    components(schemas(
        crate::api::handlers::HealthResponse,
        crate::api::handlers::ReadyResponse,
        crate::api::handlers::ServerCheck,
        crate::api::handlers::ActionPayload,
        crate::domain::models::DashboardState,
        crate::domain::models::ServerDescriptor,
        crate::domain::models::ActiveServer,
        crate::domain::models::CacheEntry,
        crate::domain::models::ValueKind,
        crate::domain::models::ActionResult,
        crate::domain::models::ActionKind,
        crate::domain::models::StatsSnapshot,
        crate::domain::models::StatEntry,
    )),
    tags(
        (name = "Health", description = "Health check and readiness endpoints"),
        (name = "Dashboard", description = "Cache inspection and mutation endpoints")
    )
)]
pub struct ApiDoc;

pub fn generate_openapi_json(
    output_path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let openapi_json = ApiDoc::openapi().to_pretty_json()?;

    if let Some(parent) = output_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path.as_ref(), openapi_json)?;

    println!(
        "OpenAPI specification generated successfully at: {}",
        output_path.as_ref().display()
    );

    Ok(())
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let spec = get_openapi_spec();
        assert_eq!(spec.info.title, "Memdash API");
        assert_eq!(spec.info.version, "0.1.0");
    }

    #[test]
    fn test_openapi_json_output() {
        let temp_dir = std::env::temp_dir();
        let output_path = temp_dir.join("test_memdash_openapi.json");

        let result = generate_openapi_json(&output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());

        std::fs::remove_file(output_path).ok();
    }
}

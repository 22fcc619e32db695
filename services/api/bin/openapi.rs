use taskvoice_api::router::ApiDoc;
use utoipa::OpenApi;

/// Writes the OpenAPI document of the REST surface to `path`.
fn write_document(api_doc: utoipa::openapi::OpenApi, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let document_json = api_doc.to_pretty_json()?;
    std::fs::write(path, document_json)?;
    println!("OpenAPI document written to {path}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    write_document(ApiDoc::openapi(), &path)?;
    Ok(())
}

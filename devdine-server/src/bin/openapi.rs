//! Print the OpenAPI document of devdine-server as JSON.

use anyhow::Result;
use devdine_server::docs::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}

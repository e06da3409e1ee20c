use relief_coord::errors::Result;

#[tokio::main]
async fn main() -> Result<()> {
    relief_coord::start_server().await
}
